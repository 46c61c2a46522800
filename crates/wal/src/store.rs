//! RocksDB-backed durable log

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, DB};
use tracing::{debug, info, trace};

use spillway_config::WalConfig;

use crate::error::StoreError;

/// Append-only key-value log for WAL-mode queues.
///
/// One instance serves every partition queue; keys are namespaced by the
/// queue's log prefix. Safe to share behind an `Arc` - all operations take
/// `&self`.
pub struct DurableLog {
    db: DB,
}

impl DurableLog {
    /// Open (or create) the log under `config.path`.
    ///
    /// RocksDB's own write-ahead files live in a `wal` subdirectory, writes
    /// are optionally fsynced, and entries expire via compaction once older
    /// than `config.ttl`.
    pub fn open(config: &WalConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_wal_dir(config.path.join("wal"));
        opts.set_use_fsync(config.use_fsync);
        opts.set_wal_size_limit_mb(config.wal_size_limit_mb);

        let db = DB::open_with_ttl(&opts, &config.path, config.ttl)?;
        info!(
            path = %config.path.display(),
            ttl_secs = config.ttl.as_secs(),
            fsync = config.use_fsync,
            "opened durable log"
        );
        Ok(Self { db })
    }

    /// Write one entry. The write is durable when this returns `Ok`.
    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if value.is_empty() {
            return Err(StoreError::EmptyValue);
        }
        self.db.put(key.as_bytes(), value.as_bytes())?;
        trace!(key, bytes = value.len(), "durable log write");
        Ok(())
    }

    /// Read one entry, `None` if absent.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|_| StoreError::NonUtf8Value {
                    key: key.to_string(),
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    /// Delete every entry whose key starts with `prefix`; returns how many
    /// were removed.
    ///
    /// Nothing in the drain path calls this; it exists for operational
    /// cleanup of queues whose rows are known to be committed.
    pub fn purge_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        if prefix.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut removed = 0u64;
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, _value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            self.db.delete(&key)?;
            removed += 1;
        }
        debug!(prefix, removed, "purged durable log prefix");
        Ok(removed)
    }

    /// Filesystem location of the log.
    pub fn path(&self) -> &Path {
        self.db.path()
    }
}

impl std::fmt::Debug for DurableLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableLog")
            .field("path", &self.db.path())
            .finish()
    }
}
