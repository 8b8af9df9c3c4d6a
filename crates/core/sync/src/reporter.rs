//! Sinks for the [`ValidationWindow`] produced on every poll tick.

use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::{info, warn};
use vigil_primitives::{ValidationOutcome, ValidationWindow};

/// Receives the result of every validation pass.
pub trait ValidationReporter: Send + Sync + 'static {
    /// Reports a freshly computed window.
    fn report(&self, window: &ValidationWindow);
}

/// Writes each window to stdout, one line per block number.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutReporter;

impl ValidationReporter for StdoutReporter {
    fn report(&self, window: &ValidationWindow) {
        if let Err(err) = write_window(&mut io::stdout().lock(), window) {
            warn!(target: "sync_loop", %err, "Failed to write validation window to stdout");
        }
    }
}

/// Renders `window` to `out` and flushes it.
fn write_window<W: Write>(out: &mut W, window: &ValidationWindow) -> io::Result<()> {
    write!(out, "{window}")?;
    out.flush()
}

/// Emits a structured summary of each window as a tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ValidationReporter for TracingReporter {
    fn report(&self, window: &ValidationWindow) {
        let Some(range) = window.range() else {
            info!(target: "sync_loop", "Validation window empty");
            return;
        };
        info!(
            target: "sync_loop",
            first = range.start(),
            last = range.end(),
            validated = window.count(ValidationOutcome::Validated),
            invalid = window.count(ValidationOutcome::Invalid),
            fetch_errors = window.count(ValidationOutcome::FetchError),
            "Validation window checked"
        );
    }
}

/// Forwards every window to a channel. Windows are dropped once the receiver is gone.
impl ValidationReporter for mpsc::UnboundedSender<ValidationWindow> {
    fn report(&self, window: &ValidationWindow) {
        let _ = self.send(window.clone());
    }
}
