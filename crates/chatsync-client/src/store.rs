//! Session store: connection state and the room's message log.
//!
//! The log is append/patch-only. Entries are never reordered or removed
//! individually; the only wholesale operations are seeding history and
//! clearing on teardown. Order reflects arrival, not timestamps.

use chatsync_core::ConnectionStatus;
use chatsync_proto::{HeartBeat, MessageId};
use tracing::debug;

use crate::message::ChatMessage;

/// Identifies the live broker session while connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    /// Broker session id from `CONNECTED`
    pub session: Option<String>,
    /// Negotiated heart-beat intervals
    pub heart_beat: HeartBeat,
    /// Id of the room topic subscription
    pub subscription: String,
}

/// Connection state as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session
    #[default]
    Disconnected,
    /// Attempt in progress
    Connecting,
    /// Session established and subscribed
    Connected(ConnectionHandle),
    /// Last attempt failed, retry pending
    Error,
}

impl ConnectionState {
    /// Status without the handle.
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Self::Disconnected => ConnectionStatus::Disconnected,
            Self::Connecting => ConnectionStatus::Connecting,
            Self::Connected(_) => ConnectionStatus::Connected,
            Self::Error => ConnectionStatus::Error,
        }
    }

    /// Handle of the live session.
    pub fn handle(&self) -> Option<&ConnectionHandle> {
        match self {
            Self::Connected(handle) => Some(handle),
            _ => None,
        }
    }

    /// Input may be enabled.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// Connection state and message log of one room view.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    connection: ConnectionState,
    messages: Vec<ChatMessage>,
    revision: u64,
}

impl SessionStore {
    /// Empty, disconnected store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the connection state wholesale.
    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
        self.bump();
    }

    /// Append to the tail of the log. No deduplication happens here.
    pub fn append_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.bump();
    }

    /// Replace the content of the message with id `id`, in place.
    ///
    /// Returns `false`, leaving the log untouched, when no message matches.
    pub fn patch_message(&mut self, id: &MessageId, content: impl Into<String>) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id.as_ref() == Some(id)) else {
            debug!(%id, "patch target not in log");
            return false;
        };

        message.content = content.into();
        self.bump();
        true
    }

    /// Replace the whole log, used to seed history.
    pub fn reset_messages(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
        self.bump();
    }

    /// Teardown: disconnected with an empty log.
    pub fn clear(&mut self) {
        self.connection = ConnectionState::Disconnected;
        self.messages.clear();
        self.bump();
    }

    /// Current connection state
    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// The log, in arrival order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Message with server id `id`.
    pub fn get(&self, id: &MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id.as_ref() == Some(id))
    }

    /// Number of log entries
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Log has no entries
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}
