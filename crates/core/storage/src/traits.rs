use crate::StorageError;
use std::{collections::BTreeSet, fmt::Debug, ops::RangeInclusive};
use vigil_primitives::{Block, BlockNumber, BlockRecord, RecordId};

/// Provides an interface for persisting canonical blocks keyed by block number.
///
/// Implementations must hold at most one record per block number and must make
/// [`create_or_update_block`](Self::create_or_update_block) atomic per number, since the
/// backfill task and the validation loop write to the same store concurrently.
pub trait BlockStore: Debug + Send + Sync {
    /// Returns the set of block numbers within `range` that have a stored record.
    ///
    /// # Returns
    /// * `Ok(BTreeSet<u64>)` with every stored number inside the range.
    /// * `Err(StorageError)` if the range is invalid or the store cannot be read.
    fn block_numbers_in_range(
        &self,
        range: RangeInclusive<BlockNumber>,
    ) -> Result<BTreeSet<BlockNumber>, StorageError>;

    /// Inserts `block` if no record exists for its number, otherwise replaces the stored
    /// payload while keeping the existing [`RecordId`].
    ///
    /// # Returns
    /// * `Ok(RecordId)` identifying the record that now holds `block`.
    /// * `Err(StorageError)` if the write failed. Storage is left unchanged.
    fn create_or_update_block(&self, block: &Block) -> Result<RecordId, StorageError>;

    /// Gets the full stored record for `number`.
    fn get_record(&self, number: BlockNumber) -> Result<Option<BlockRecord>, StorageError>;

    /// Gets the stored block for `number`.
    fn get_block(&self, number: BlockNumber) -> Result<Option<Block>, StorageError> {
        Ok(self.get_record(number)?.map(|record| record.block))
    }

    /// Returns `true` if a record exists for `number`.
    fn block_exists(&self, number: BlockNumber) -> Result<bool, StorageError> {
        Ok(self.block_numbers_in_range(number..=number)?.contains(&number))
    }

    /// Returns, in ascending order, the numbers in `[start, end]` with no stored record.
    ///
    /// Issues a single range query and collects the gaps between consecutive stored numbers.
    fn missing_block_numbers(
        &self,
        start: BlockNumber,
        end: BlockNumber,
    ) -> Result<Vec<BlockNumber>, StorageError> {
        if start > end {
            return Ok(Vec::new());
        }

        let mut missing = Vec::new();
        // `None` once the cursor has moved past `BlockNumber::MAX`.
        let mut next = Some(start);
        for number in self.block_numbers_in_range(start..=end)? {
            if let Some(from) = next {
                missing.extend(from..number);
            }
            next = number.checked_add(1);
        }
        if let Some(from) = next {
            missing.extend(from..=end);
        }
        Ok(missing)
    }
}
