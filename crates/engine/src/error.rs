//! Engine error types

use thiserror::Error;

use spillway_config::ConfigError;
use spillway_wal::StoreError;

/// Errors raised while bringing the engine up.
///
/// Once running, the engine never errors outward; ingest problems are
/// reported in acks and drain problems in logs and metrics.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration failed validation
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The durable log could not be opened
    #[error("failed to open durable log: {0}")]
    Store(#[from] StoreError),
}
