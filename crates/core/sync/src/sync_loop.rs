//! [`IndexerActor`] that keeps storage reconciled with the chain source.

use crate::{
    ChainSource, GapFiller, IndexerActor, SyncConfig, SyncError, ValidationReporter,
    WindowValidator, metrics::Metrics,
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::{
    select,
    task::{JoinError, JoinHandle},
    time::{Instant, MissedTickBehavior, interval_at, sleep},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vigil_primitives::BlockNumber;
use vigil_storage::BlockStore;

type BackfillHandle = JoinHandle<Result<usize, SyncError>>;

/// What woke the loop up.
enum Wake {
    Shutdown,
    BackfillDone(Result<Result<usize, SyncError>, JoinError>),
    Tick,
}

/// The orchestrator of the sync engine.
///
/// On start it checks that the chain source is usable, then runs until cancelled:
/// - a single [`GapFiller`] pass runs in a background task and is relaunched as soon as it
///   completes, waiting one poll interval first when the previous pass filled nothing;
/// - on every poll tick a [`WindowValidator`] pass runs on the loop itself and its
///   [`ValidationWindow`](vigil_primitives::ValidationWindow) goes to the reporter.
///
/// A validation pass that outlasts the poll interval delays the next tick. Passes never
/// overlap, and at most one backfill pass is in flight.
///
/// Shutdown never waits on the node: every in-flight request is dropped once the cancellation
/// token fires.
#[derive(Debug)]
pub struct SyncLoop<S, DB, R> {
    source: Arc<S>,
    store: Arc<DB>,
    reporter: R,
    config: SyncConfig,
    cancellation: CancellationToken,
}

impl<S, DB, R> SyncLoop<S, DB, R>
where
    S: ChainSource + 'static,
    DB: BlockStore + 'static,
    R: ValidationReporter,
{
    /// Creates a new [`SyncLoop`].
    ///
    /// # Arguments
    ///
    /// * `source` - The live chain the store is reconciled against
    /// * `store` - The shared block store
    /// * `reporter` - Sink for every validation window
    /// * `config` - Starting block, poll interval and validation window size
    /// * `cancellation` - Cancellation token for graceful shutdown
    pub const fn new(
        source: Arc<S>,
        store: Arc<DB>,
        reporter: R,
        config: SyncConfig,
        cancellation: CancellationToken,
    ) -> Self {
        Self { source, store, reporter, config, cancellation }
    }

    /// Checks the startup preconditions against the current chain head.
    pub fn check_preconditions(&self, head: BlockNumber) -> Result<(), SyncError> {
        if head == 0 {
            return Err(SyncError::NodeNotSynced);
        }
        let start = self.config.starting_block_number;
        if start > head {
            return Err(SyncError::StartAheadOfHead { start, head });
        }
        Ok(())
    }

    /// Spawns a backfill pass. When `delay` is set the task waits that long first, giving up
    /// early on cancellation.
    fn spawn_backfill(
        &self,
        gap_filler: &Arc<GapFiller<S, DB>>,
        delay: Option<Duration>,
    ) -> BackfillHandle {
        let gap_filler = Arc::clone(gap_filler);
        let cancel = self.cancellation.child_token();
        let start = self.config.starting_block_number;

        tokio::spawn(async move {
            if let Some(delay) = delay {
                select! {
                    _ = cancel.cancelled() => return Ok(0),
                    _ = sleep(delay) => {}
                }
            }
            gap_filler.populate_missing_blocks_until(start, &cancel).await
        })
    }

    /// Waits for a backfill task whose token has been cancelled.
    async fn stop_backfill(backfill: BackfillHandle) {
        info!(
            target: "sync_loop",
            "Received shutdown signal. Waiting for the backfill task to stop."
        );
        match backfill.await {
            Ok(Ok(filled)) => debug!(target: "sync_loop", filled, "Backfill task stopped"),
            Ok(Err(err)) => warn!(target: "sync_loop", %err, "Backfill task failed"),
            Err(err) => error!(target: "sync_loop", %err, "Backfill task panicked"),
        }
    }

    /// Decides how long the next backfill pass waits before starting.
    ///
    /// A pass that wrote blocks is relaunched at once, since the chain may have grown while it
    /// ran. An idle or failed pass waits one poll interval so it does not spin against the node.
    fn next_backfill_delay(
        &self,
        result: &Result<Result<usize, SyncError>, JoinError>,
    ) -> Option<Duration> {
        match result {
            Ok(Ok(filled)) if *filled > 0 => None,
            _ => Some(self.config.polling_interval),
        }
    }
}

#[async_trait]
impl<S, DB, R> IndexerActor for SyncLoop<S, DB, R>
where
    S: ChainSource + 'static,
    DB: BlockStore + 'static,
    R: ValidationReporter,
{
    type Error = SyncError;

    async fn start(self) -> Result<(), Self::Error> {
        if self.config.polling_interval.is_zero() {
            return Err(SyncError::ZeroPollingInterval);
        }
        Metrics::init();

        let head = select! {
            biased;

            _ = self.cancellation.cancelled() => {
                info!(target: "sync_loop", "Received shutdown signal before the sync loop started");
                return Ok(());
            }
            head = self.source.last_block_number() => head?,
        };
        self.check_preconditions(head)?;

        let start = self.config.starting_block_number;
        info!(
            target: "sync_loop",
            start,
            head,
            interval_secs = self.config.polling_interval.as_secs(),
            window = self.config.validation_window,
            "Starting sync loop"
        );

        let gap_filler = Arc::new(GapFiller::new(Arc::clone(&self.source), Arc::clone(&self.store)));
        let validator = WindowValidator::new(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.config.validation_window,
            start,
        );

        let mut backfill = self.spawn_backfill(&gap_filler, None);

        let period = self.config.polling_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let wake = select! {
                biased;

                _ = self.cancellation.cancelled() => Wake::Shutdown,
                result = &mut backfill => Wake::BackfillDone(result),
                _ = ticker.tick() => Wake::Tick,
            };

            match wake {
                Wake::Shutdown => {
                    Self::stop_backfill(backfill).await;
                    return Ok(());
                }
                Wake::BackfillDone(result) => {
                    match &result {
                        Ok(Ok(filled)) => {
                            debug!(target: "sync_loop", filled, "Backfill pass finished")
                        }
                        Ok(Err(err)) => {
                            warn!(target: "sync_loop", %err, "Backfill pass failed, retrying")
                        }
                        Err(err) => {
                            error!(target: "sync_loop", %err, "Backfill task panicked, restarting")
                        }
                    }
                    let delay = self.next_backfill_delay(&result);
                    backfill = self.spawn_backfill(&gap_filler, delay);
                }
                Wake::Tick => {
                    let window = select! {
                        biased;

                        _ = self.cancellation.cancelled() => {
                            debug!(target: "sync_loop", "Validation pass interrupted by shutdown");
                            Self::stop_backfill(backfill).await;
                            return Ok(());
                        }
                        window = validator.validate_blocks() => window,
                    };
                    self.reporter.report(&window);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StalledChain, TestChain, block_hash};
    use rstest::rstest;
    use tokio::{sync::mpsc, time::timeout};
    use vigil_primitives::{ValidationOutcome, ValidationWindow};
    use vigil_storage::InMemoryBlockStore;

    type TestLoop = SyncLoop<TestChain, InMemoryBlockStore, mpsc::UnboundedSender<ValidationWindow>>;

    fn build(
        chain: &Arc<TestChain>,
        store: &Arc<InMemoryBlockStore>,
        config: SyncConfig,
    ) -> (TestLoop, mpsc::UnboundedReceiver<ValidationWindow>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancellation = CancellationToken::new();
        let sync_loop =
            SyncLoop::new(Arc::clone(chain), Arc::clone(store), tx, config, cancellation.clone());
        (sync_loop, rx, cancellation)
    }

    #[tokio::test]
    async fn test_head_zero_is_fatal() {
        let chain = Arc::new(TestChain::with_head(0));
        let store = Arc::new(InMemoryBlockStore::new());
        let (sync_loop, _rx, _cancel) = build(&chain, &store, SyncConfig::default());

        let err = sync_loop.start().await.unwrap_err();

        assert!(matches!(err, SyncError::NodeNotSynced));
        assert!(err.is_precondition());
        assert!(chain.fetched().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_zero_polling_interval_is_rejected() {
        let chain = Arc::new(TestChain::with_head(10));
        let store = Arc::new(InMemoryBlockStore::new());
        let config = SyncConfig::default().with_polling_interval(Duration::ZERO);
        let (sync_loop, _rx, _cancel) = build(&chain, &store, config);

        let err = sync_loop.start().await.unwrap_err();

        assert!(matches!(err, SyncError::ZeroPollingInterval));
    }

    #[tokio::test]
    async fn test_start_ahead_of_head_is_fatal() {
        let chain = Arc::new(TestChain::with_head(10));
        let store = Arc::new(InMemoryBlockStore::new());
        let config = SyncConfig::default().with_starting_block_number(50);
        let (sync_loop, _rx, _cancel) = build(&chain, &store, config);

        let err = sync_loop.start().await.unwrap_err();

        assert!(matches!(err, SyncError::StartAheadOfHead { start: 50, head: 10 }));
        assert!(chain.fetched().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfills_then_validates_on_tick() {
        let chain = Arc::new(TestChain::with_head(5));
        let store = Arc::new(InMemoryBlockStore::new());
        let config = SyncConfig::default().with_validation_window(3);
        let (sync_loop, mut rx, cancel) = build(&chain, &store, config);

        let handle = tokio::spawn(sync_loop.start());

        let window = rx.recv().await.unwrap();
        assert_eq!(window.range(), Some(3..=5));
        assert!(window.is_clean());
        assert!(store.missing_block_numbers(0, 5).unwrap().is_empty());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reorg_is_healed_on_next_tick() {
        let chain = Arc::new(TestChain::with_head(20));
        let store = Arc::new(InMemoryBlockStore::new());
        let (sync_loop, mut rx, cancel) = build(&chain, &store, SyncConfig::default());

        let handle = tokio::spawn(sync_loop.start());
        assert!(rx.recv().await.unwrap().is_clean());

        let new_hash = chain.reorg(18, 7);
        let window = rx.recv().await.unwrap();

        assert_eq!(window.range(), Some(6..=20));
        assert_eq!(window.outcome(18), Some(ValidationOutcome::Invalid));
        assert_eq!(store.get_block(18).unwrap().unwrap().hash, new_hash);
        assert_ne!(new_hash, block_hash(18, 0));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_backfill_is_relaunched_for_new_blocks() {
        let chain = Arc::new(TestChain::with_head(5));
        let store = Arc::new(InMemoryBlockStore::new());
        let config = SyncConfig::default().with_validation_window(1);
        let (sync_loop, mut rx, cancel) = build(&chain, &store, config);

        let handle = tokio::spawn(sync_loop.start());
        rx.recv().await.unwrap();

        chain.extend_to(40);
        // Two ticks: the idle backfill task wakes up within one interval.
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();

        assert!(store.missing_block_numbers(0, 40).unwrap().is_empty());

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_polling_interval() {
        let chain = Arc::new(TestChain::with_head(3));
        let store = Arc::new(InMemoryBlockStore::new());
        let config = SyncConfig::default().with_polling_interval(Duration::from_secs(7));
        let (sync_loop, mut rx, cancel) = build(&chain, &store, config);

        let started = Instant::now();
        let handle = tokio::spawn(sync_loop.start());

        rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(7));
        rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(14));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_before_first_tick_stops_cleanly() {
        let chain = Arc::new(TestChain::with_head(1_000));
        let store = Arc::new(InMemoryBlockStore::new());
        let (sync_loop, mut rx, cancel) = build(&chain, &store, SyncConfig::default());

        cancel.cancel();
        sync_loop.start().await.unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[rstest]
    #[case::during_backfill(Duration::from_millis(200))]
    #[case::during_validation(Duration::from_secs(8))]
    #[tokio::test(start_paused = true)]
    async fn test_shutdown_does_not_wait_on_a_stalled_node(#[case] cancel_after: Duration) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ValidationWindow>();
        let cancel = CancellationToken::new();
        let sync_loop = SyncLoop::new(
            Arc::new(StalledChain::with_head(10)),
            Arc::new(InMemoryBlockStore::new()),
            tx,
            SyncConfig::default(),
            cancel.clone(),
        );

        let handle = tokio::spawn(sync_loop.start());
        tokio::time::sleep(cancel_after).await;
        cancel.cancel();

        timeout(Duration::from_secs(3), handle).await.unwrap().unwrap().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[rstest]
    #[case::filled_blocks(Ok(3), None)]
    #[case::idle(Ok(0), Some(Duration::from_secs(7)))]
    #[case::failed(Err(SyncError::NodeNotSynced), Some(Duration::from_secs(7)))]
    fn test_idle_or_failed_pass_waits_one_interval(
        #[case] pass: Result<usize, SyncError>,
        #[case] expected: Option<Duration>,
    ) {
        let chain = Arc::new(TestChain::with_head(5));
        let store = Arc::new(InMemoryBlockStore::new());
        let (sync_loop, _rx, _cancel) = build(&chain, &store, SyncConfig::default());

        assert_eq!(sync_loop.next_backfill_delay(&Ok(pass)), expected);
    }
}
