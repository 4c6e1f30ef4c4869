//! Terminal UI for chatsync
//!
//! A thin shell over [`chatsync_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`chatsync_app::Runtime`].
//!
//! This crate handles argument parsing, terminal rendering and the broker
//! socket.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod terminal;
pub mod ui;

pub use chatsync_app::{App, AppAction, AppEvent, Bridge, Driver, KeyInput, Runtime};
pub use cli::{Args, CliError};
pub use terminal::{TerminalDriver, TerminalError};
