//! Row buffer configuration

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Configuration for partition queues and the buffer registry
///
/// All fields have sensible defaults - you only need to specify what you
/// want to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum rows held by one in-memory partition queue; enqueues past
    /// this are rejected. WAL-backed queues are not bounded by this value.
    /// Default: 10000
    pub max_row_count: usize,

    /// Number of round-robin shards for high-volume tables.
    /// Default: 1 (sharding effectively off)
    pub max_shards_per_table: u32,

    /// Tables whose row streams are sharded across partitions.
    /// Matched case-insensitively against the table name.
    /// Default: empty
    pub high_volume_tables: Vec<String>,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_row_count: 10_000,
            max_shards_per_table: 1,
            high_volume_tables: Vec::new(),
        }
    }
}

impl BufferConfig {
    /// Set the per-queue row cap
    pub fn with_max_row_count(mut self, max_row_count: usize) -> Self {
        self.max_row_count = max_row_count;
        self
    }

    /// Set the shard count for high-volume tables
    pub fn with_max_shards_per_table(mut self, shards: u32) -> Self {
        self.max_shards_per_table = shards;
        self
    }

    /// Set the high-volume table names
    pub fn with_high_volume_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.high_volume_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a table's row stream should be sharded
    pub fn is_high_volume(&self, table: &str) -> bool {
        self.high_volume_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Check the section for unusable values
    pub fn validate(&self) -> Result<()> {
        if self.max_row_count == 0 {
            return Err(ConfigError::invalid(
                "buffer.max_row_count",
                "must be at least 1",
            ));
        }
        if self.max_shards_per_table == 0 {
            return Err(ConfigError::invalid(
                "buffer.max_shards_per_table",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
