//! Test doubles for the sync engine.

use crate::{ChainSource, SourceError};
use alloy_primitives::B256;
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::RangeInclusive,
    sync::Mutex,
};
use vigil_primitives::{Block, BlockNumber, BlockRecord, RecordId};
use vigil_storage::{BlockStore, InMemoryBlockStore, StorageError};

/// Deterministic hash for block `number` on fork `fork`.
pub(crate) fn block_hash(number: BlockNumber, fork: u8) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&number.to_be_bytes());
    bytes[31] = fork;
    B256::from(bytes)
}

pub(crate) fn test_block(number: BlockNumber, fork: u8) -> Block {
    let parent_hash = number.checked_sub(1).map_or(B256::ZERO, |parent| block_hash(parent, fork));
    Block::new(number, block_hash(number, fork), parent_hash, 1_600_000_000 + number * 12)
}

#[derive(Debug, Default)]
struct ChainState {
    blocks: BTreeMap<BlockNumber, Block>,
    failing: BTreeSet<BlockNumber>,
    fetched: Vec<BlockNumber>,
}

/// An in-memory chain that can grow, reorg, and fail individual fetches.
#[derive(Debug, Default)]
pub(crate) struct TestChain {
    state: Mutex<ChainState>,
}

impl TestChain {
    /// A chain holding blocks `0..=head` on fork 0. A head of 0 models an unsynced node.
    pub(crate) fn with_head(head: BlockNumber) -> Self {
        let chain = Self::default();
        chain.extend_to(head);
        chain
    }

    pub(crate) fn extend_to(&self, head: BlockNumber) {
        let mut state = self.state.lock().unwrap();
        let next = state.blocks.keys().next_back().map_or(0, |n| n + 1);
        for number in next..=head {
            state.blocks.insert(number, test_block(number, 0));
        }
    }

    /// Replaces the block at `number` with one from `fork` and returns its new hash.
    pub(crate) fn reorg(&self, number: BlockNumber, fork: u8) -> B256 {
        let block = test_block(number, fork);
        let hash = block.hash;
        self.state.lock().unwrap().blocks.insert(number, block);
        hash
    }

    pub(crate) fn fail(&self, number: BlockNumber) {
        self.state.lock().unwrap().failing.insert(number);
    }

    pub(crate) fn heal(&self, number: BlockNumber) {
        self.state.lock().unwrap().failing.remove(&number);
    }

    pub(crate) fn block(&self, number: BlockNumber) -> Block {
        self.state.lock().unwrap().blocks[&number].clone()
    }

    /// Every number passed to `block_by_number`, in call order.
    pub(crate) fn fetched(&self) -> Vec<BlockNumber> {
        self.state.lock().unwrap().fetched.clone()
    }

    pub(crate) fn clear_fetched(&self) {
        self.state.lock().unwrap().fetched.clear();
    }
}

#[async_trait]
impl ChainSource for TestChain {
    async fn last_block_number(&self) -> Result<BlockNumber, SourceError> {
        let state = self.state.lock().unwrap();
        Ok(state.blocks.keys().next_back().copied().unwrap_or_default())
    }

    async fn block_by_number(&self, number: BlockNumber) -> Result<Block, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.fetched.push(number);
        if state.failing.contains(&number) {
            return Err(SourceError::Rpc(format!("injected failure for block {number}")));
        }
        state.blocks.get(&number).cloned().ok_or(SourceError::BlockNotFound(number))
    }
}

/// A [`BlockStore`] that rejects writes for selected block numbers.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    inner: InMemoryBlockStore,
    rejected_writes: Mutex<BTreeSet<BlockNumber>>,
    rejected_reads: Mutex<BTreeSet<BlockNumber>>,
}

impl FlakyStore {
    pub(crate) fn reject_writes(&self, number: BlockNumber) {
        self.rejected_writes.lock().unwrap().insert(number);
    }

    pub(crate) fn reject_reads(&self, number: BlockNumber) {
        self.rejected_reads.lock().unwrap().insert(number);
    }
}

impl BlockStore for FlakyStore {
    fn block_numbers_in_range(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<BTreeSet<BlockNumber>, StorageError> {
        self.inner.block_numbers_in_range(range)
    }

    fn create_or_update_block(&self, block: &Block) -> Result<RecordId, StorageError> {
        if self.rejected_writes.lock().unwrap().contains(&block.number) {
            return Err(StorageError::Database(format!("injected write failure for {}", block.number)));
        }
        self.inner.create_or_update_block(block)
    }

    fn get_record(&self, number: BlockNumber) -> Result<Option<BlockRecord>, StorageError> {
        if self.rejected_reads.lock().unwrap().contains(&number) {
            return Err(StorageError::Database(format!("injected read failure for {number}")));
        }
        self.inner.get_record(number)
    }
}

/// A node that reports a head but never answers a block request.
#[derive(Debug)]
pub(crate) struct StalledChain {
    head: BlockNumber,
}

impl StalledChain {
    pub(crate) const fn with_head(head: BlockNumber) -> Self {
        Self { head }
    }
}

#[async_trait]
impl ChainSource for StalledChain {
    async fn last_block_number(&self) -> Result<BlockNumber, SourceError> {
        Ok(self.head)
    }

    async fn block_by_number(&self, _number: BlockNumber) -> Result<Block, SourceError> {
        std::future::pending().await
    }
}
