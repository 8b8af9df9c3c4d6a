//! Idempotent backfill of missing blocks.

use crate::{ChainSource, SyncError, metrics::Metrics};
use std::{sync::Arc, time::Instant};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use vigil_primitives::{BlockNumber, RecordId};
use vigil_storage::BlockStore;

/// Backfills every block number in `[start, head]` that the store does not hold yet.
///
/// A pass is best effort: a block that cannot be fetched or written is logged and skipped, and
/// stays missing until the next pass picks it up. Running a pass twice without chain growth
/// is a no-op the second time.
#[derive(Debug)]
pub struct GapFiller<S, DB> {
    /// The chain source blocks are fetched from.
    source: Arc<S>,
    /// The store blocks are written to.
    store: Arc<DB>,
}

impl<S, DB> GapFiller<S, DB>
where
    S: ChainSource,
    DB: BlockStore,
{
    /// Creates a new [`GapFiller`].
    pub const fn new(source: Arc<S>, store: Arc<DB>) -> Self {
        Self { source, store }
    }

    /// Runs one backfill pass from `start` up to the current chain head.
    ///
    /// # Returns
    /// * `Ok(count)` with the number of blocks written during the pass.
    /// * `Err(SyncError)` if the chain head or the set of stored numbers could not be read.
    ///   Failures of individual blocks never abort the pass.
    pub async fn populate_missing_blocks(&self, start: BlockNumber) -> Result<usize, SyncError> {
        self.populate_missing_blocks_until(start, &CancellationToken::new()).await
    }

    /// Same as [`populate_missing_blocks`](Self::populate_missing_blocks), but gives up on the
    /// in-flight request once `cancel` fires and returns the count written so far.
    pub async fn populate_missing_blocks_until(
        &self,
        start: BlockNumber,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let started = Instant::now();
        let head = select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(target: "gap_filler", "Backfill cancelled before reading the chain head");
                return Ok(0);
            }
            head = self.source.last_block_number() => head?,
        };
        let missing = self.missing_blocks(start, head)?;

        if missing.is_empty() {
            debug!(target: "gap_filler", start, head, "No missing blocks");
            Metrics::record_backfill_pass(0, 0, started.elapsed());
            return Ok(0);
        }

        info!(
            target: "gap_filler",
            start,
            head,
            missing = missing.len(),
            "Backfilling missing blocks"
        );

        let (mut filled, mut failed) = (0usize, 0usize);
        for number in missing {
            let result = select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(
                        target: "gap_filler",
                        block_number = number,
                        filled,
                        "Backfill cancelled"
                    );
                    break;
                }
                result = self.fill_block(number) => result,
            };

            match result {
                Ok(record_id) => {
                    trace!(target: "gap_filler", block_number = number, %record_id, "Block stored");
                    filled += 1;
                }
                Err(err) => {
                    warn!(
                        target: "gap_filler",
                        block_number = number,
                        %err,
                        "Failed to backfill block, will retry on the next pass"
                    );
                    failed += 1;
                }
            }
        }

        Metrics::record_backfill_pass(filled, failed, started.elapsed());
        info!(target: "gap_filler", start, head, filled, failed, "Backfill pass complete");
        Ok(filled)
    }

    /// Returns, in ascending order, the block numbers in `[start, head]` with no stored record.
    pub fn missing_blocks(
        &self,
        start: BlockNumber,
        head: BlockNumber,
    ) -> Result<Vec<BlockNumber>, SyncError> {
        Ok(self.store.missing_block_numbers(start, head)?)
    }

    async fn fill_block(&self, number: BlockNumber) -> Result<RecordId, SyncError> {
        let block = self.source.block_by_number(number).await?;
        if block.number != number {
            return Err(SyncError::UnexpectedBlock { requested: number, returned: block.number });
        }
        Ok(self.store.create_or_update_block(&block)?)
    }
}
