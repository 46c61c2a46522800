//! Offset tokens
//!
//! An offset token binds a row's position in its partition queue to the
//! epoch (process start instant, millis) of the process that sent it. The
//! sink echoes the latest committed token back; comparing epochs detects a
//! channel taken over by a newer process, comparing offsets tells how far
//! the sink has caught up.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Wire format: `"{offset}-{epochMillis}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetToken {
    offset: u64,
    epoch_millis: u64,
}

impl OffsetToken {
    /// Create a token for a row offset under the given process epoch
    #[inline]
    #[must_use]
    pub const fn new(offset: u64, epoch_millis: u64) -> Self {
        Self {
            offset,
            epoch_millis,
        }
    }

    /// Zero-based row offset within the partition
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.offset
    }

    /// Epoch millis of the process that produced this token
    #[inline]
    #[must_use]
    pub const fn epoch_millis(self) -> u64 {
        self.epoch_millis
    }
}

impl fmt::Display for OffsetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.offset, self.epoch_millis)
    }
}

impl FromStr for OffsetToken {
    type Err = ProtocolError;

    /// Parse a token, rejecting anything that is not exactly
    /// `<u64>-<u64>`. Malformed tokens are an error, never a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (offset_part, epoch_part) = s
            .split_once('-')
            .ok_or_else(|| ProtocolError::malformed_token(s, "missing '-' separator"))?;
        let offset = offset_part
            .parse::<u64>()
            .map_err(|e| ProtocolError::malformed_token(s, format!("offset: {e}")))?;
        let epoch_millis = epoch_part
            .parse::<u64>()
            .map_err(|e| ProtocolError::malformed_token(s, format!("epoch: {e}")))?;
        Ok(Self {
            offset,
            epoch_millis,
        })
    }
}
