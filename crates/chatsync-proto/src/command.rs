//! STOMP commands.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// STOMP 1.2 frame commands used by the chat session.
///
/// Transactions and acknowledgements (`BEGIN`, `ACK`, ...) are not part of the
/// chat flow and decode as [`ProtocolError::UnknownCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake
    Connect,
    /// Client handshake (STOMP 1.2 alias of `CONNECT`)
    Stomp,
    /// Server handshake reply
    Connected,
    /// Publish to a destination
    Send,
    /// Register interest in a destination
    Subscribe,
    /// Drop a subscription
    Unsubscribe,
    /// Graceful client shutdown
    Disconnect,
    /// Server delivery on a subscription
    Message,
    /// Server acknowledgement of a `receipt` header
    Receipt,
    /// Server-reported failure
    Error,
}

impl Command {
    /// Wire representation of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parse a command line.
    pub fn parse(line: &str) -> Result<Self> {
        match line {
            "CONNECT" => Ok(Self::Connect),
            "STOMP" => Ok(Self::Stomp),
            "CONNECTED" => Ok(Self::Connected),
            "SEND" => Ok(Self::Send),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "DISCONNECT" => Ok(Self::Disconnect),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// Whether header names and values are escaped for this command.
    ///
    /// STOMP 1.2 exempts the handshake frames from escaping.
    pub fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Stomp | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
