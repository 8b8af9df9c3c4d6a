//! The `sync` subcommand.

use crate::{config::IndexerConfig, flags::GlobalArgs};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::{path::PathBuf, process, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;
use vigil_providers_alloy::AlloyChainSource;
use vigil_storage::{BlockStore, InMemoryBlockStore};
use vigil_sync::{
    IndexerActor, StdoutReporter, SyncConfig, SyncLoop, TracingReporter, ValidationReporter,
};

/// Indexes blocks from the node and keeps the most recent window reconciled with it.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(about = "Backfills and validates blocks until interrupted")]
pub struct SyncCommand {
    /// Lowest block number to index.
    #[arg(long, short = 's', env = "VIGIL_STARTING_BLOCK_NUMBER")]
    pub starting_block_number: Option<u64>,

    /// HTTP JSON-RPC endpoint of the node.
    #[arg(long, env = "VIGIL_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Seconds between two validation passes.
    #[arg(
        long,
        env = "VIGIL_POLLING_INTERVAL",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub polling_interval: Option<u64>,

    /// Number of most recent blocks re-checked on every validation pass.
    #[arg(long, env = "VIGIL_VALIDATION_WINDOW")]
    pub validation_window: Option<u64>,

    /// Where each validation window is reported.
    #[arg(long, value_enum, default_value_t = ReportSink::Stdout, env = "VIGIL_REPORT")]
    pub report: ReportSink,

    /// Path to a TOML configuration file.
    #[arg(long, short = 'c', env = "VIGIL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory of the on-disk block store. Blocks are kept in memory when unset.
    #[cfg(feature = "rocksdb")]
    #[arg(long, env = "VIGIL_DATADIR")]
    pub datadir: Option<PathBuf>,
}

/// Destination of the per-tick validation windows.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportSink {
    /// Print every window to stdout, one line per block number.
    #[default]
    Stdout,
    /// Emit a one-line summary per window through the log.
    Log,
}

/// Settings of a sync run after merging flags, the config file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSync {
    /// Node endpoint.
    pub rpc_url: Url,
    /// Sync engine settings.
    pub sync: SyncConfig,
    /// Directory of the on-disk block store, if any.
    pub datadir: Option<PathBuf>,
}

impl SyncCommand {
    /// Merges the command line over `file`, which in turn overrides the defaults.
    pub fn resolve(&self, file: IndexerConfig) -> Result<ResolvedSync> {
        let rpc_url = self
            .rpc_url
            .clone()
            .or(file.client.rpc_url)
            .ok_or_else(|| anyhow!("No RPC URL given, pass --rpc-url or set [client] rpc_url"))?;

        let mut sync = file.sync;
        if let Some(number) = self.starting_block_number {
            sync = sync.with_starting_block_number(number);
        }
        if let Some(secs) = self.polling_interval {
            sync = sync.with_polling_interval(Duration::from_secs(secs));
        }
        if let Some(window) = self.validation_window {
            sync = sync.with_validation_window(window);
        }
        if sync.polling_interval.is_zero() {
            return Err(anyhow!("Polling interval must be at least one second"));
        }

        #[cfg(feature = "rocksdb")]
        let datadir = self.datadir.clone().or(file.storage.datadir);
        #[cfg(not(feature = "rocksdb"))]
        let datadir = file.storage.datadir;

        Ok(ResolvedSync { rpc_url, sync, datadir })
    }

    /// Runs the sync loop until Ctrl-C is received.
    pub async fn run(self, global: &GlobalArgs) -> Result<()> {
        let file = match &self.config {
            Some(path) => IndexerConfig::load(path)?,
            None => IndexerConfig::default(),
        };
        let resolved = self.resolve(file)?;

        if let Some(addr) = global.metrics.init_metrics()? {
            info!(target: "vigil", %addr, "Metrics server started");
        }

        let cancellation = CancellationToken::new();
        let signal = cancellation.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(target: "vigil", %err, "Failed to listen for Ctrl-C");
                return;
            }
            info!(
                target: "vigil",
                "Received Ctrl-C, shutting down. Press Ctrl-C again to force exit."
            );
            signal.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(target: "vigil", "Received second Ctrl-C, forcing exit");
                process::exit(130);
            }
        });

        let source = Arc::new(AlloyChainSource::new_http(resolved.rpc_url.clone()));
        info!(target: "vigil", rpc_url = %resolved.rpc_url, "Connecting to node");

        match resolved.datadir {
            #[cfg(feature = "rocksdb")]
            Some(path) => {
                let store = vigil_storage::RocksBlockStore::open(&path)
                    .with_context(|| format!("Failed to open block store at {}", path.display()))?;
                info!(target: "vigil", datadir = %path.display(), "Using on-disk block store");
                run_sync(source, Arc::new(store), self.report, resolved.sync, cancellation).await
            }
            #[cfg(not(feature = "rocksdb"))]
            Some(path) => Err(anyhow!(
                "Block store directory {} requires the `rocksdb` feature",
                path.display()
            )),
            None => {
                info!(target: "vigil", "Using in-memory block store");
                let store = Arc::new(InMemoryBlockStore::new());
                run_sync(source, store, self.report, resolved.sync, cancellation).await
            }
        }
    }
}

async fn run_sync<DB: BlockStore + 'static>(
    source: Arc<AlloyChainSource>,
    store: Arc<DB>,
    report: ReportSink,
    config: SyncConfig,
    cancellation: CancellationToken,
) -> Result<()> {
    match report {
        ReportSink::Stdout => {
            run_with_reporter(source, store, StdoutReporter, config, cancellation).await
        }
        ReportSink::Log => {
            run_with_reporter(source, store, TracingReporter, config, cancellation).await
        }
    }
}

async fn run_with_reporter<DB: BlockStore + 'static, R: ValidationReporter>(
    source: Arc<AlloyChainSource>,
    store: Arc<DB>,
    reporter: R,
    config: SyncConfig,
    cancellation: CancellationToken,
) -> Result<()> {
    SyncLoop::new(source, store, reporter, config, cancellation)
        .start()
        .await
        .context("Sync loop stopped")
}
