//! Logging CLI arguments.

use clap::{ArgAction, Parser};

/// Logging arguments shared by every command.
#[derive(Parser, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level. `-v` enables debug logs, `-vv` trace logs. `RUST_LOG` takes precedence.
    #[arg(short = 'v', long = "verbosity", global = true, action = ArgAction::Count)]
    pub v: u8,
}

impl LogArgs {
    /// Installs the global tracing subscriber for these arguments.
    pub fn init_tracing(&self) -> crate::CliResult<()> {
        crate::init_tracing_subscriber(self.v, None)
    }
}
