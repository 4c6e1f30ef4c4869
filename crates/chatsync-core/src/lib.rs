//! Session layer for chatsync.
//!
//! Holds the broker connection state machine and the environment abstraction
//! everything above it runs on. Nothing in this crate performs I/O: the
//! [`Connection`] consumes events stamped with the caller's notion of time and
//! returns [`ConnectionAction`]s for a driver to execute.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;

pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionStatus};
pub use env::{Environment, SystemEnv};
pub use error::ConnectionError;
