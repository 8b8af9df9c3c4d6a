//! TOML configuration file for the indexer.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use url::Url;
use vigil_sync::SyncConfig;

/// The contents of a `vigil.toml` configuration file.
///
/// Every table and key is optional. Values given on the command line take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerConfig {
    /// Connection to the node.
    pub client: ClientConfig,
    /// Sync engine settings.
    pub sync: SyncConfig,
    /// Block store settings.
    pub storage: StorageConfig,
}

/// The `[client]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// HTTP JSON-RPC endpoint of the node.
    pub rpc_url: Option<Url>,
}

/// The `[storage]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory of the on-disk block store. Blocks are kept in memory when unset.
    pub datadir: Option<std::path::PathBuf>,
}

impl IndexerConfig {
    /// Reads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parses a configuration from TOML.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Write, time::Duration};

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = IndexerConfig::parse("").unwrap();
        assert_eq!(config, IndexerConfig::default());
        assert_eq!(config.sync, SyncConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = IndexerConfig::parse(
            r#"
            [client]
            rpc_url = "http://localhost:8545"

            [sync]
            starting_block_number = 1000
            polling_interval_secs = 3
            validation_window = 32

            [storage]
            datadir = "/var/lib/vigil"
            "#,
        )
        .unwrap();

        assert_eq!(config.client.rpc_url.unwrap().as_str(), "http://localhost:8545/");
        assert_eq!(config.sync.starting_block_number, 1000);
        assert_eq!(config.sync.polling_interval, Duration::from_secs(3));
        assert_eq!(config.sync.validation_window, 32);
        assert_eq!(config.storage.datadir.unwrap().to_str(), Some("/var/lib/vigil"));
    }

    #[test]
    fn test_partial_sync_table_keeps_defaults() {
        let config = IndexerConfig::parse("[sync]\nvalidation_window = 4\n").unwrap();
        assert_eq!(config.sync.validation_window, 4);
        assert_eq!(config.sync.polling_interval, Duration::from_secs(7));
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        assert!(IndexerConfig::parse("[database]\nurl = \"postgres://\"\n").is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nrpc_url = \"http://node:8545\"").unwrap();

        let config = IndexerConfig::load(file.path()).unwrap();
        assert_eq!(config.client.rpc_url.unwrap().host_str(), Some("node"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(IndexerConfig::load(Path::new("/nonexistent/vigil.toml")).is_err());
    }
}
