//! Composed engine configuration

use serde::Deserialize;

use crate::buffer::BufferConfig;
use crate::drain::DrainConfig;
use crate::error::Result;
use crate::wal::WalConfig;

/// Everything the ingest engine needs, composed from the section configs.
///
/// All sections are optional with sensible defaults. Leaving `wal` unset
/// selects in-memory queues; setting it makes every queue WAL-backed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Partition queue and registry settings
    pub buffer: BufferConfig,

    /// Scheduler and worker pool settings
    pub drain: DrainConfig,

    /// Durable-log settings; `None` means in-memory queues
    pub wal: Option<WalConfig>,
}

impl EngineConfig {
    /// Set the buffer section
    pub fn with_buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }

    /// Set the drain section
    pub fn with_drain(mut self, drain: DrainConfig) -> Self {
        self.drain = drain;
        self
    }

    /// Enable WAL-backed queues
    pub fn with_wal(mut self, wal: WalConfig) -> Self {
        self.wal = Some(wal);
        self
    }

    /// Shorthand for `buffer.with_high_volume_tables`
    pub fn with_high_volume_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buffer = self.buffer.with_high_volume_tables(tables);
        self
    }

    /// Shorthand for `buffer.with_max_shards_per_table`
    pub fn with_max_shards_per_table(mut self, shards: u32) -> Self {
        self.buffer = self.buffer.with_max_shards_per_table(shards);
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.buffer.validate()?;
        self.drain.validate()?;
        if let Some(wal) = &self.wal {
            wal.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.wal.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_cascades_into_sections() {
        let config = EngineConfig::default().with_drain(DrainConfig::default().with_worker_count(0));
        assert!(config.validate().is_err());

        let config = EngineConfig::default().with_wal(WalConfig::default().with_path(""));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_full_document() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "buffer": {"max_row_count": 100, "high_volume_tables": ["hits"], "max_shards_per_table": 4},
                "drain": {"worker_count": 2},
                "wal": {"path": "/tmp/spillway"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.buffer.max_row_count, 100);
        assert_eq!(config.drain.worker_count, 2);
        assert!(config.wal.is_some());
        config.validate().unwrap();
    }
}
