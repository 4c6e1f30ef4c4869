//! Wire protocol for chatsync.
//!
//! The broker speaks STOMP 1.2 carried in WebSocket text messages. This crate
//! owns everything that touches bytes on the wire and nothing else:
//!
//! - [`Frame`] and [`Command`]: STOMP frame encoding and decoding
//! - [`HeartBeat`]: `heart-beat` header parsing and negotiation
//! - [`ChatPayload`]: the JSON body of chat `SEND`/`MESSAGE` frames
//! - [`RoomAddress`]: topic and destination naming for a chat room
//!
//! Connection lifecycle lives in `chatsync-core`; chat semantics live in
//! `chatsync-client`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod address;
mod command;
pub mod errors;
mod frame;
mod header;
pub mod payloads;

pub use address::RoomAddress;
pub use command::Command;
pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::HeartBeat;
pub use payloads::{ChatPayload, MessageId, MessageType, UserId};
