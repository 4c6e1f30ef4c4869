//! Client events and actions.

use chatsync_core::ConnectionStatus;
use chatsync_proto::{ChatPayload, Frame, MessageId};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Opening and closing the socket when asked, and reporting the outcome
/// - Decoding transport messages into frames or heart-beats
/// - Driving time forward via ticks
/// - Forwarding user intents (send, exit)
///
/// Generic over `I` (Instant type) so simulations can use virtual time.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Start connecting to the broker.
    Activate,

    /// Socket requested by [`ClientAction::OpenSocket`] is open.
    SocketOpened,

    /// Socket closed, or failed to open.
    SocketClosed {
        /// Transport-level reason
        reason: String,
    },

    /// Frame received from the broker.
    FrameReceived(Frame),

    /// Bare EOL heart-beat received from the broker.
    HeartBeatReceived,

    /// Time tick for heart-beats, timeouts and reconnects.
    Tick {
        /// Current time from the environment
        now: I,
    },

    /// History loaded by the room initializer, oldest first.
    SeedHistory(Vec<ChatPayload>),

    /// User wants to send a message.
    SendMessage {
        /// Message text
        content: String,
    },

    /// User left the room view.
    Deactivate,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a socket to the broker.
    OpenSocket,

    /// Send a frame to the broker.
    Send(Frame),

    /// Send a bare EOL heart-beat.
    SendHeartBeat,

    /// Close the socket.
    CloseSocket {
        /// Reason for closing
        reason: String,
    },

    /// Connection status changed. The store already reflects it.
    StatusChanged(ConnectionStatus),

    /// A message was appended to the log.
    MessageAppended,

    /// A message's content was edited in place.
    MessagePatched {
        /// Edited message
        id: MessageId,
    },

    /// The log was replaced by seeded history.
    HistorySeeded {
        /// Entries now in the log
        count: usize,
    },

    /// Broker reported an error. Informational only.
    BrokerError {
        /// Broker's `message` header
        message: String,
        /// Broker's error body
        detail: String,
    },
}
