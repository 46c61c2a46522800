//! Protocol error types
//!
//! Errors that can occur when parsing payloads or offset tokens.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Offset token does not match the `{offset}-{epochMillis}` layout
    #[error("malformed offset token '{token}': {reason}")]
    MalformedToken { token: String, reason: String },

    /// Request body is not valid JSON
    #[error("invalid row payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Request body parsed but is not an object or array of objects
    #[error("row payload must be a JSON object or an array of objects")]
    UnexpectedPayloadShape,
}

impl ProtocolError {
    /// Create a malformed token error
    #[inline]
    pub fn malformed_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Check whether this error came from parsing a producer payload
    /// (as opposed to an internal token round-trip)
    pub fn is_payload_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPayload(_) | Self::UnexpectedPayloadShape
        )
    }
}
