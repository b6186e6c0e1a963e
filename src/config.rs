// Node configuration loaded from JSON

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NodeError;

/// Runtime settings. Every field has a default, so a config file only needs
/// the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Block file name inside `data_dir`
    pub block_file: String,
    /// Most parked orphan blocks
    pub max_orphans: usize,
    pub orphan_ttl_secs: u64,
    /// Most announced items waiting to be requested
    pub max_wanted: usize,
    /// Most transaction ids remembered as seen
    pub max_seen_txs: usize,
    /// Seconds before an unanswered getdata item is requested again
    pub request_timeout_secs: u64,
    /// Largest getdata batch
    pub getdata_batch: usize,
    /// Seconds a block timestamp may run ahead of the local clock
    pub max_future_drift_secs: u32,
    pub maintenance_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            block_file: "blocks.dat".to_string(),
            max_orphans: 750,
            orphan_ttl_secs: 60 * 60,
            max_wanted: 50_000,
            max_seen_txs: 50_000,
            request_timeout_secs: 60,
            getdata_batch: 100,
            max_future_drift_secs: 2 * 60 * 60,
            maintenance_interval_secs: 10,
        }
    }
}

impl Config {
    /// Read a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NodeError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Write the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NodeError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Defaults rooted at another data directory
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Full path of the block file
    pub fn block_path(&self) -> PathBuf {
        self.data_dir.join(&self.block_file)
    }

    pub fn orphan_ttl(&self) -> Duration {
        Duration::from_secs(self.orphan_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.block_path(), PathBuf::from("./data").join("blocks.dat"));
        assert_eq!(config.getdata_batch, 100);
        assert_eq!(config.max_future_drift_secs, 7200);
        assert_eq!(config.max_wanted, 50_000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.json");
        fs::write(&path, r#"{ "max_orphans": 5, "data_dir": "/tmp/chain" }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.max_orphans, 5);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/chain"));
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.json");
        let config = Config {
            getdata_batch: 7,
            ..Config::with_data_dir(dir.path())
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(NodeError::Config(_))));
    }
}
