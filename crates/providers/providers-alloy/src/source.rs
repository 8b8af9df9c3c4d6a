//! [`ChainSource`] backed by an alloy [`RootProvider`].

use crate::convert::into_block;
use alloy_eips::{BlockId, BlockNumberOrTag};
use alloy_provider::{Provider, RootProvider};
use alloy_transport::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::{debug, trace};
use url::Url;
use vigil_primitives::{Block, BlockNumber};
use vigil_sync::{ChainSource, SourceError};

/// A [`ChainSource`] that talks to an Ethereum JSON-RPC node.
#[derive(Debug, Clone)]
pub struct AlloyChainSource {
    provider: RootProvider,
}

impl AlloyChainSource {
    /// Creates a new [`AlloyChainSource`] from an existing provider.
    pub const fn new(provider: RootProvider) -> Self {
        Self { provider }
    }

    /// Creates a new [`AlloyChainSource`] connected to the node at `url` over HTTP.
    pub fn new_http(url: Url) -> Self {
        Self::new(RootProvider::new_http(url))
    }
}

fn rpc_error(err: RpcError<TransportErrorKind>) -> SourceError {
    SourceError::Rpc(err.to_string())
}

#[async_trait]
impl ChainSource for AlloyChainSource {
    async fn last_block_number(&self) -> Result<BlockNumber, SourceError> {
        let head = self.provider.get_block_number().await.map_err(rpc_error)?;
        trace!(target: "alloy_source", head, "Fetched chain head");
        Ok(head)
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<Block, SourceError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .full()
            .await
            .map_err(rpc_error)?
            .ok_or(SourceError::BlockNotFound(number))?;

        // Receipts are looked up by hash so both halves belong to the same block, even if the
        // node reorgs between the two calls.
        let hash = block.header.hash;
        let receipts = self
            .provider
            .get_block_receipts(BlockId::hash(hash))
            .await
            .map_err(rpc_error)?
            .ok_or(SourceError::ReceiptsNotFound(number))?;

        debug!(
            target: "alloy_source",
            block_number = number,
            %hash,
            receipts = receipts.len(),
            "Fetched block"
        );
        into_block(block, receipts)
    }
}
