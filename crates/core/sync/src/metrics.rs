use std::time::Duration;
use vigil_primitives::ValidationOutcome;

#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const BACKFILL_BLOCKS_TOTAL: &'static str = "vigil_backfill_blocks_total";
    pub(crate) const BACKFILL_ERRORS_TOTAL: &'static str = "vigil_backfill_errors_total";
    pub(crate) const BACKFILL_PASSES_TOTAL: &'static str = "vigil_backfill_passes_total";
    pub(crate) const BACKFILL_PASS_DURATION_SECONDS: &'static str =
        "vigil_backfill_pass_duration_seconds";
    pub(crate) const VALIDATION_OUTCOMES_TOTAL: &'static str = "vigil_validation_outcomes_total";
    pub(crate) const TRANSFORMER_RUNS_TOTAL: &'static str = "vigil_transformer_runs_total";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::BACKFILL_BLOCKS_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks written by the gap filler",
        );

        metrics::describe_counter!(
            Self::BACKFILL_ERRORS_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks the gap filler failed to fetch or store",
        );

        metrics::describe_counter!(
            Self::BACKFILL_PASSES_TOTAL,
            metrics::Unit::Count,
            "Total number of completed gap filler passes",
        );

        metrics::describe_histogram!(
            Self::BACKFILL_PASS_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of a gap filler pass",
        );

        metrics::describe_counter!(
            Self::VALIDATION_OUTCOMES_TOTAL,
            metrics::Unit::Count,
            "Total number of validated block numbers, by outcome",
        );

        metrics::describe_counter!(
            Self::TRANSFORMER_RUNS_TOTAL,
            metrics::Unit::Count,
            "Total number of transformer executions, by transformer and result",
        );
    }

    fn zero() {
        metrics::counter!(Self::BACKFILL_BLOCKS_TOTAL).increment(0);
        metrics::counter!(Self::BACKFILL_ERRORS_TOTAL).increment(0);
        metrics::counter!(Self::BACKFILL_PASSES_TOTAL).increment(0);

        for outcome in [
            ValidationOutcome::Validated,
            ValidationOutcome::Invalid,
            ValidationOutcome::FetchError,
        ] {
            metrics::counter!(Self::VALIDATION_OUTCOMES_TOTAL, "outcome" => outcome.as_str())
                .increment(0);
        }
    }

    pub(crate) fn record_backfill_pass(filled: usize, failed: usize, elapsed: Duration) {
        metrics::counter!(Self::BACKFILL_BLOCKS_TOTAL).increment(filled as u64);
        metrics::counter!(Self::BACKFILL_ERRORS_TOTAL).increment(failed as u64);
        metrics::counter!(Self::BACKFILL_PASSES_TOTAL).increment(1);
        metrics::histogram!(Self::BACKFILL_PASS_DURATION_SECONDS).record(elapsed.as_secs_f64());
    }

    pub(crate) fn record_validation_outcome(outcome: ValidationOutcome) {
        metrics::counter!(Self::VALIDATION_OUTCOMES_TOTAL, "outcome" => outcome.as_str())
            .increment(1);
    }

    pub(crate) fn record_transformer_run(name: &str, success: bool) {
        metrics::counter!(
            Self::TRANSFORMER_RUNS_TOTAL,
            "transformer" => name.to_string(),
            "result" => if success { "success" } else { "error" },
        )
        .increment(1);
    }
}
