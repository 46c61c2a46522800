//! Durable-log (write-ahead) configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Configuration for the RocksDB-backed durable log
///
/// Present only when queues should survive in durable storage; its absence
/// from [`crate::EngineConfig`] selects pure in-memory queues.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalConfig {
    /// Directory holding the log (created if missing).
    /// Default: "data/wal"
    pub path: PathBuf,

    /// Store-level compaction TTL for log entries. Entries older than this
    /// become eligible for removal regardless of explicit purges.
    /// Default: 300s
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Upper bound for RocksDB's own write-ahead files, in megabytes.
    /// Default: 20480
    pub wal_size_limit_mb: u64,

    /// Fsync writes instead of fdatasync.
    /// Default: true
    pub use_fsync: bool,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/wal"),
            ttl: Duration::from_secs(300),
            wal_size_limit_mb: 20_480,
            use_fsync: true,
        }
    }
}

impl WalConfig {
    /// Set the log directory
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the entry TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Check the section for unusable values
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("wal.path", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WalConfig::default();
        assert_eq!(config.path, PathBuf::from("data/wal"));
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.wal_size_limit_mb, 20_480);
        assert!(config.use_fsync);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(WalConfig::default().with_path("").validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_section() {
        let config: WalConfig =
            serde_json::from_str(r#"{"path": "/tmp/sp", "ttl": "1h"}"#).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/sp"));
        assert_eq!(config.ttl, Duration::from_secs(3600));
        assert!(config.use_fsync);
    }
}
