//! Error types for the broker connection.
//!
//! Connection errors describe what went wrong at the session layer. Transport
//! failures are converted into [`ConnectionError::Transport`] at the socket
//! boundary and never leak `std::io::Error` into session logic.

use std::{io, time::Duration};

use chatsync_proto::{Command, ProtocolError};
use thiserror::Error;

use crate::connection::ConnectionStatus;

/// Errors raised by the connection state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Transition not valid in the current status
    #[error("invalid state transition: cannot {operation} while {status:?}")]
    InvalidState {
        /// Status when the transition was attempted
        status: ConnectionStatus,
        /// Transition that was attempted
        operation: String,
    },

    /// Broker sent a frame that makes no sense in the current status
    #[error("unexpected {command} frame while {status:?}")]
    UnexpectedFrame {
        /// Status when the frame arrived
        status: ConnectionStatus,
        /// Command of the offending frame
        command: Command,
    },

    /// Outbound frame refused because the session is not connected
    #[error("not connected (status {status:?})")]
    NotConnected {
        /// Status when the frame was offered
        status: ConnectionStatus,
    },

    /// `CONNECTED` did not arrive in time
    #[error("handshake timeout after {elapsed:?}")]
    HandshakeTimeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Broker went silent for longer than the negotiated heart-beat allows
    #[error("no heart-beat from broker for {elapsed:?}")]
    HeartBeatTimeout {
        /// Time since the last inbound traffic
        elapsed: Duration,
    },

    /// Frame-level protocol error
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying socket error
    #[error("transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// Returns true if the session may recover by reconnecting.
    ///
    /// Timeouts and socket failures are transient. State and protocol
    /// violations indicate a bug or an incompatible broker.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::HandshakeTimeout { .. } | Self::HeartBeatTimeout { .. } | Self::Transport(_)
        )
    }
}

impl From<ProtocolError> for ConnectionError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
