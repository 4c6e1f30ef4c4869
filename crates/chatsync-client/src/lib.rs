//! Room session client for chatsync.
//!
//! Action-based client state machine for one chat room view. It owns the
//! session store, drives the broker connection through its lifecycle and
//! reconciles inbound room traffic with optimistic local sends.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO pattern as [`chatsync_core`]. It
//! receives events ([`ClientEvent`]), processes them through pure state
//! machine logic, and returns actions ([`ClientAction`]) for the caller to
//! execute.
//!
//! # Components
//!
//! - [`Client`]: Room session state machine
//! - [`SessionStore`]: Connection state and message log
//! - [`reconcile`]: Decides how inbound payloads affect the log
//! - [`SessionConfig`]: Room, user and transport selection
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedSocket`]: STOMP frames over a WebSocket
//! - [`transport::connect`]: Open a socket to the broker

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod event;
mod message;
pub mod reconcile;
mod store;

#[cfg(feature = "transport")]
pub mod transport;

pub use chatsync_core::{ConnectionConfig, ConnectionStatus, env::Environment};
pub use chatsync_proto::{ChatPayload, MessageId, RoomAddress, UserId};
pub use client::Client;
pub use config::{ConnectionMode, SessionConfig};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
pub use message::ChatMessage;
pub use reconcile::{Decision, DropReason};
pub use store::{ConnectionHandle, ConnectionState, SessionStore};
