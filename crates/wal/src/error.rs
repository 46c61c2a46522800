//! Durable log error types

use thiserror::Error;

/// Errors that can occur against the durable log
#[derive(Debug, Error)]
pub enum StoreError {
    /// Keys must carry table identity and offset; empty is always a bug
    #[error("durable log keys must be non-empty")]
    EmptyKey,

    /// An empty value would be indistinguishable from a missing row
    #[error("durable log values must be non-empty")]
    EmptyValue,

    /// Stored bytes are not the UTF-8 text we wrote
    #[error("value at '{key}' is not valid UTF-8")]
    NonUtf8Value { key: String },

    /// Underlying store failure
    #[error("rocksdb failure: {0}")]
    Rocks(#[from] rocksdb::Error),
}
