//! Channel error types

use thiserror::Error;

/// Channel faults: the handle (or the attempt to create one) is unusable.
///
/// Distinct from row validation errors, which ride inside a successful
/// append outcome.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// An open or reopen attempt failed
    #[error("failed to open channel for {key}: {reason}")]
    OpenFailed { key: String, reason: String },

    /// The channel broke mid-use (closed by the sink, transport loss)
    #[error("channel '{name}' is unusable: {reason}")]
    Fault { name: String, reason: String },
}

impl ChannelError {
    /// Create an open-failure error
    pub fn open_failed(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a mid-use fault
    pub fn fault(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fault {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
