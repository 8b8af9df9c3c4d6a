//! Re-validation of the most recent blocks against the chain source.

use crate::{ChainSource, metrics::Metrics};
use std::{ops::RangeInclusive, sync::Arc};
use tracing::{debug, info, warn};
use vigil_primitives::{BlockNumber, ValidationOutcome, ValidationWindow};
use vigil_storage::BlockStore;

/// Re-checks the most recent `window_size` blocks on every pass and overwrites any stored block
/// that is missing or whose hash no longer matches the chain source.
///
/// Blocks older than the window are assumed final and are never re-probed.
#[derive(Debug)]
pub struct WindowValidator<S, DB> {
    source: Arc<S>,
    store: Arc<DB>,
    window_size: u64,
    starting_block: BlockNumber,
}

impl<S, DB> WindowValidator<S, DB>
where
    S: ChainSource,
    DB: BlockStore,
{
    /// Creates a new [`WindowValidator`].
    ///
    /// # Arguments
    /// * `source` - The chain source blocks are re-fetched from.
    /// * `store` - The store that is checked and healed.
    /// * `window_size` - Number of most recent blocks checked per pass.
    /// * `starting_block` - Lowest block number that may be probed.
    pub const fn new(
        source: Arc<S>,
        store: Arc<DB>,
        window_size: u64,
        starting_block: BlockNumber,
    ) -> Self {
        Self { source, store, window_size, starting_block }
    }

    /// Returns the inclusive range probed for the given `head`, or `None` if there is nothing to
    /// probe.
    ///
    /// The lower bound is `max(starting_block, head - window_size + 1)`.
    pub fn window_bounds(&self, head: BlockNumber) -> Option<RangeInclusive<BlockNumber>> {
        if self.window_size == 0 || head < self.starting_block {
            return None;
        }
        let lowest = head.saturating_sub(self.window_size - 1).max(self.starting_block);
        Some(lowest..=head)
    }

    /// Runs one validation pass over the current window.
    ///
    /// Never fails as a whole: every number gets an outcome, and a pass whose head cannot be
    /// read yields an empty window.
    pub async fn validate_blocks(&self) -> ValidationWindow {
        let head = match self.source.last_block_number().await {
            Ok(head) => head,
            Err(err) => {
                warn!(target: "window_validator", %err, "Failed to fetch chain head");
                return ValidationWindow::default();
            }
        };

        let Some(bounds) = self.window_bounds(head) else {
            debug!(target: "window_validator", head, "Empty validation window");
            return ValidationWindow::default();
        };

        let mut window =
            ValidationWindow::with_capacity((bounds.end() - bounds.start() + 1) as usize);
        for number in bounds {
            let outcome = self.validate_block(number).await;
            Metrics::record_validation_outcome(outcome);
            window.push(number, outcome);
        }

        if !window.is_clean() {
            info!(
                target: "window_validator",
                head,
                invalid = window.count(ValidationOutcome::Invalid),
                fetch_errors = window.count(ValidationOutcome::FetchError),
                "Validation window healed or incomplete"
            );
        }
        window
    }

    /// Validates a single block number, overwriting the stored block when it is stale.
    pub async fn validate_block(&self, number: BlockNumber) -> ValidationOutcome {
        let fetched = match self.source.block_by_number(number).await {
            Ok(block) if block.number == number => block,
            Ok(block) => {
                warn!(
                    target: "window_validator",
                    block_number = number,
                    returned = block.number,
                    "Source returned a different block than requested"
                );
                return ValidationOutcome::FetchError;
            }
            Err(err) => {
                warn!(target: "window_validator", block_number = number, %err, "Failed to fetch block");
                return ValidationOutcome::FetchError;
            }
        };

        let stored = match self.store.get_block(number) {
            Ok(stored) => stored,
            Err(err) => {
                warn!(
                    target: "window_validator",
                    block_number = number,
                    %err,
                    "Failed to read stored block"
                );
                return ValidationOutcome::FetchError;
            }
        };

        let previous_hash = match stored {
            Some(stored) if stored.is_same_block(&fetched) => return ValidationOutcome::Validated,
            stale => stale.map(|block| block.hash),
        };

        if let Err(err) = self.store.create_or_update_block(&fetched) {
            warn!(
                target: "window_validator",
                block_number = number,
                %err,
                "Failed to overwrite stale block"
            );
            return ValidationOutcome::FetchError;
        }

        info!(
            target: "window_validator",
            block_number = number,
            ?previous_hash,
            new_hash = %fetched.hash,
            "Replaced missing or stale block"
        );
        ValidationOutcome::Invalid
    }
}
