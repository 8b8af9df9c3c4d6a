//! An in-process [`BlockStore`] backed by an ordered map.

use crate::{BlockStore, StorageError};
use std::{
    collections::{BTreeMap, BTreeSet},
    ops::RangeInclusive,
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::trace;
use vigil_primitives::{Block, BlockNumber, BlockRecord, RecordId};

/// A [`BlockStore`] that keeps every record in memory.
///
/// All writes take the map's write lock for the whole check-then-write sequence, which makes
/// create-or-update atomic per block number.
#[derive(Debug, Default)]
pub struct InMemoryBlockStore {
    records: RwLock<BTreeMap<BlockNumber, BlockRecord>>,
    next_id: AtomicU64,
}

impl InMemoryBlockStore {
    /// Creates an empty [`InMemoryBlockStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.records.read().map_err(|_| StorageError::LockPoisoned)?.len())
    }

    /// Returns `true` if nothing has been stored yet.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl BlockStore for InMemoryBlockStore {
    fn block_numbers_in_range(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<BTreeSet<BlockNumber>, StorageError> {
        if range.start() > range.end() {
            return Err(StorageError::InvalidRange { start: *range.start(), end: *range.end() });
        }
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.range(range).map(|(number, _)| *number).collect())
    }

    fn create_or_update_block(&self, block: &Block) -> Result<RecordId, StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        if let Some(record) = records.get_mut(&block.number) {
            trace!(
                target: "storage",
                block_number = block.number,
                record_id = %record.id,
                "Updating stored block"
            );
            record.block = block.clone();
            return Ok(record.id);
        }

        let id = RecordId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        trace!(target: "storage", block_number = block.number, record_id = %id, "Inserting block");
        records.insert(block.number, BlockRecord::new(id, block.clone()));
        Ok(id)
    }

    fn get_record(&self, number: BlockNumber) -> Result<Option<BlockRecord>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(&number).cloned())
    }
}
