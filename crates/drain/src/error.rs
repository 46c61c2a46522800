//! Drain error types

use thiserror::Error;

use spillway_channel::ChannelError;
use spillway_protocol::ProtocolError;

/// Errors that end a drain before its commit wait completes.
///
/// Channel faults hit mid-append are handled inline by the worker; this
/// type covers the remaining failure paths (acquiring the channel,
/// polling the sink, decoding what it reports).
#[derive(Debug, Error)]
pub enum DrainTaskError {
    /// The sink channel could not be acquired or polled
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A token coming back from the sink did not parse
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
