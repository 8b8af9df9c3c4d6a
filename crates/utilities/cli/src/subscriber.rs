//! Global tracing subscriber setup.

use crate::CliError;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps a `-v` occurrence count to the default log level.
pub(crate) const fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global `fmt` subscriber.
///
/// When `env_filter` is `None`, the filter is built from `RUST_LOG`, falling back to the level
/// given by `verbosity`.
pub fn init_tracing_subscriber(
    verbosity: u8,
    env_filter: Option<EnvFilter>,
) -> Result<(), CliError> {
    let filter = env_filter.unwrap_or_else(|| {
        EnvFilter::builder()
            .with_default_directive(verbosity_level(verbosity).into())
            .from_env_lossy()
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| CliError::Tracing(err.to_string()))
}
