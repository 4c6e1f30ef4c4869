//! Client error types.

use chatsync_core::{ConnectionError, ConnectionStatus};
use chatsync_proto::ProtocolError;
use thiserror::Error;

use crate::config::ConnectionMode;

/// Errors returned by [`crate::Client::handle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Send refused because the session is not connected. Nothing was
    /// appended to the log.
    #[error("not connected (status {status:?})")]
    NotConnected {
        /// Status when the send was attempted
        status: ConnectionStatus,
    },

    /// Configured transport cannot connect
    #[error("connection mode {0} is not supported")]
    UnsupportedMode(ConnectionMode),

    /// Connection state machine rejected an event
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Outgoing payload could not be encoded
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// Returns true if retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotConnected { .. } => true,
            Self::Connection(err) => err.is_transient(),
            Self::UnsupportedMode(_) | Self::Protocol(_) => false,
        }
    }
}
