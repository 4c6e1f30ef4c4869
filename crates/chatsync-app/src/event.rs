//! Application input events.
//!
//! This module defines [`AppEvent`], the inputs that drive the [`crate::App`]
//! state machine.
//!
//! Events originate from two distinct sources:
//! - User interactions (keyboard, resize) and system ticks.
//! - Session notifications translated from the underlying client.

use crate::{KeyInput, StoreChange, StoreView};

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Keyboard input.
    Key(KeyInput),

    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Session store replaced wholesale. Carries a fresh view of it.
    StoreChanged(StoreView),

    /// Session store changed incrementally.
    StoreUpdated {
        /// Store revision after the changes
        revision: u64,
        /// Changes in the order they happened
        changes: Vec<StoreChange>,
    },

    /// The session refused a message. Its text goes back to the composer.
    SendRefused {
        /// The text that was not sent
        content: String,
        /// Why it was refused
        message: String,
    },

    /// Something went wrong. Shown in the status line only.
    Error {
        /// Error description.
        message: String,
    },
}
