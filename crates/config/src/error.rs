//! Configuration error types

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value the component cannot run with
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why the value is unusable
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
