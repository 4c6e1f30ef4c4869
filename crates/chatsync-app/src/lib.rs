//! Application layer for chatsync
//!
//! Pure state machines and generic runtime for the chat room view, enabling
//! deterministic simulation testing with the same code that runs in the
//! terminal client.
//!
//! # Components
//!
//! - [`App`]: UI state machine (composer, input gating, scrolling)
//! - [`Bridge`]: Session bridge (translates App actions to Client events)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`group_by_date`]: Date dividers for the message log

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use bridge::{Bridge, Outgoing};
pub use driver::{Driver, SocketEvent};
pub use event::AppEvent;
pub use input::KeyInput;
pub use runtime::Runtime;
pub use state::{
    DateGroup, StoreChange, StoreView, group_by_date, message_date, message_time,
};
