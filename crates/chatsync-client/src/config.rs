//! Session configuration supplied by the room initializer.

use std::fmt;

use chatsync_proto::{RoomAddress, UserId};

/// Realtime transport chosen for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionMode {
    /// STOMP over WebSocket
    #[default]
    Stomp,
    /// Socket.IO. Accepted in configuration but never connects.
    SocketIo,
}

impl ConnectionMode {
    /// Parse the mode name used by the login form (`stomp`, `socketio`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "stomp" => Some(Self::Stomp),
            "socketio" | "socket.io" | "socket-io" => Some(Self::SocketIo),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stomp => f.write_str("stomp"),
            Self::SocketIo => f.write_str("socketio"),
        }
    }
}

/// Immutable inputs of one room visit.
///
/// Built once before the session starts and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Room the session is bound to
    pub room: RoomAddress,
    /// Authenticated local user
    pub user_id: UserId,
    /// Nickname stamped on outgoing messages
    pub nickname: String,
    /// Credential forwarded as the `Authorization` connect header
    pub auth_token: Option<String>,
    /// Transport to use
    pub mode: ConnectionMode,
}

impl SessionConfig {
    /// STOMP session for `user_id` in `room` with no credential.
    pub fn new(room: RoomAddress, user_id: UserId, nickname: impl Into<String>) -> Self {
        Self {
            room,
            user_id,
            nickname: nickname.into(),
            auth_token: None,
            mode: ConnectionMode::Stomp,
        }
    }

    /// Attach the auth credential.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Select the transport.
    #[must_use]
    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }
}
