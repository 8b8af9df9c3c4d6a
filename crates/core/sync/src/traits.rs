//! Contains the [`ChainSource`] trait consumed by the sync engine.

use async_trait::async_trait;
use thiserror::Error;
use vigil_primitives::{Block, BlockNumber};

/// An error returned by a [`ChainSource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The transport or the node returned an error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node has no block at the requested height.
    #[error("Block {0} not found")]
    BlockNotFound(BlockNumber),

    /// The node returned a block without its receipts.
    #[error("Receipts for block {0} not found")]
    ReceiptsNotFound(BlockNumber),

    /// The node returned data that could not be turned into a [`Block`].
    #[error("Malformed block {number}: {reason}")]
    Malformed {
        /// The requested block number.
        number: BlockNumber,
        /// Description of what was wrong.
        reason: String,
    },
}

/// The live view of the chain that local storage is reconciled against.
///
/// Implementations are shared between the backfill task and the validation loop, so every
/// method may be called concurrently.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Returns the highest block number currently known to the source.
    async fn last_block_number(&self) -> Result<BlockNumber, SourceError>;

    /// Fetches the full block at `number`, including transactions and receipts.
    async fn block_by_number(&self, number: BlockNumber) -> Result<Block, SourceError>;
}
