//! Contains the vigil CLI.

use crate::{commands::SyncCommand, flags::GlobalArgs};
use anyhow::Result;
use clap::{Parser, Subcommand};
use vigil_cli::cli_styles;

/// Subcommands for the CLI.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Backfills and validates blocks against a node.
    #[command(alias = "s")]
    Sync(SyncCommand),
}

/// The vigil indexer CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The subcommand to run.
    #[command(subcommand)]
    pub subcommand: Commands,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        // Initialize the telemetry stack.
        self.global.log_args.init_tracing()?;

        match self.subcommand {
            Commands::Sync(sync) => Self::run_until_complete(sync.run(&self.global)),
        }
    }

    /// Runs the given future to completion on a fresh multi-thread runtime.
    pub fn run_until_complete<F>(fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let rt = Self::tokio_runtime().map_err(|e| anyhow::anyhow!(e))?;
        rt.block_on(fut)
    }

    /// Creates a new default tokio multi-thread [Runtime](tokio::runtime::Runtime) with all
    /// features enabled
    pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sync_with_global_flags() {
        let cli = Cli::try_parse_from([
            "vigil",
            "-vv",
            "sync",
            "--rpc-url",
            "http://localhost:8545",
            "--metrics.enabled",
        ])
        .unwrap();

        assert_eq!(cli.global.log_args.v, 2);
        assert!(cli.global.metrics.enabled);
        let Commands::Sync(sync) = cli.subcommand;
        assert_eq!(sync.rpc_url.unwrap().as_str(), "http://localhost:8545/");
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["vigil"]).is_err());
    }
}
