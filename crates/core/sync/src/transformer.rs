//! Periodic execution of [`EventTransformer`]s over the indexed data.

use crate::{IndexerActor, metrics::Metrics};
use async_trait::async_trait;
use std::{fmt, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{
    select,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_storage::StorageError;

/// An error returned by an [`EventTransformer`].
#[derive(Error, Debug)]
pub enum TransformerError {
    /// The transformer failed while decoding or persisting its domain data.
    #[error("Transformer {name} failed: {reason}")]
    Execution {
        /// Name of the failing transformer.
        name: String,
        /// Description of the failure.
        reason: String,
    },

    /// The block store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A job that turns indexed blocks and logs into domain tables.
#[async_trait]
pub trait EventTransformer: Send + Sync {
    /// Name used in logs and metric labels.
    fn name(&self) -> &str;

    /// Runs the transformer once over whatever data it has not processed yet.
    async fn execute(&self) -> Result<(), TransformerError>;
}

/// Summary of a single [`TransformerRunner::execute_all`] round.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformerReport {
    /// Number of transformers that completed.
    pub succeeded: usize,
    /// Number of transformers that returned an error.
    pub failed: usize,
}

/// Executes every registered transformer, in registration order, once per interval.
///
/// A failing transformer is logged and counted. The round continues with the next one.
pub struct TransformerRunner {
    transformers: Vec<Arc<dyn EventTransformer>>,
    interval: Duration,
    cancellation: CancellationToken,
}

impl fmt::Debug for TransformerRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRunner")
            .field("transformers", &self.transformers.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("interval", &self.interval)
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl TransformerRunner {
    /// Creates a runner with no transformers.
    pub const fn new(interval: Duration, cancellation: CancellationToken) -> Self {
        Self { transformers: Vec::new(), interval, cancellation }
    }

    /// Registers a transformer.
    pub fn with_transformer(mut self, transformer: Arc<dyn EventTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Returns the number of registered transformers.
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Returns `true` if no transformer is registered.
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Runs every transformer once.
    pub async fn execute_all(&self) -> TransformerReport {
        let mut report = TransformerReport::default();
        for transformer in &self.transformers {
            let name = transformer.name();
            match transformer.execute().await {
                Ok(()) => {
                    debug!(target: "transformers", transformer = name, "Transformer executed");
                    Metrics::record_transformer_run(name, true);
                    report.succeeded += 1;
                }
                Err(err) => {
                    warn!(target: "transformers", transformer = name, %err, "Transformer failed");
                    Metrics::record_transformer_run(name, false);
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[async_trait]
impl IndexerActor for TransformerRunner {
    type Error = TransformerError;

    async fn start(self) -> Result<(), Self::Error> {
        info!(
            target: "transformers",
            count = self.transformers.len(),
            interval_secs = self.interval.as_secs(),
            "Starting transformer runner"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                biased;

                _ = self.cancellation.cancelled() => {
                    info!(target: "transformers", "Received shutdown signal. Exiting transformer runner.");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    let report = self.execute_all().await;
                    if report.failed > 0 {
                        info!(
                            target: "transformers",
                            succeeded = report.succeeded,
                            failed = report.failed,
                            "Transformer round finished with failures"
                        );
                    }
                }
            }
        }
    }
}
