//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the interactive
//! state of the room view completely decoupled from I/O and the session
//! protocol.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Edits the composer line and gates it on the connection status.
//! - Holds the latest [`StoreView`] for rendering.
//! - Stores terminal dimensions and scroll position.

use chatsync_client::ChatMessage;
use chatsync_core::ConnectionStatus;

use crate::{AppAction, AppEvent, DateGroup, KeyInput, StoreView, group_by_date};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Header line, typically the room address.
    title: String,
    /// Latest copy of the session store.
    view: StoreView,
    /// Composer text.
    composer: String,
    /// Cursor position in the composer, in characters.
    cursor: usize,
    /// Messages scrolled back from the newest.
    scroll: usize,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a new App showing an empty, disconnected room.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            view: StoreView::default(),
            composer: String::new(),
            cursor: 0,
            scroll: 0,
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::StoreChanged(view) => {
                let was = self.view.status;
                self.view = view;
                self.store_moved(was)
            },
            AppEvent::StoreUpdated { revision, changes } => {
                let was = self.view.status;
                self.view.apply(revision, changes);
                self.store_moved(was)
            },
            AppEvent::SendRefused { content, message } => {
                // Keep anything typed since
                if self.composer.is_empty() {
                    self.cursor = content.chars().count();
                    self.composer = content;
                }
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    fn store_moved(&mut self, was: ConnectionStatus) -> Vec<AppAction> {
        if self.view.status == ConnectionStatus::Connected && was != ConnectionStatus::Connected {
            self.status_message = None;
        }
        self.scroll = self.scroll.min(self.view.messages.len());
        vec![AppAction::Render]
    }

    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Esc => return self.exit(),
            KeyInput::Up => {
                self.scroll = (self.scroll + 1).min(self.view.messages.len());
                return vec![AppAction::Render];
            },
            KeyInput::Down => {
                self.scroll = self.scroll.saturating_sub(1);
                return vec![AppAction::Render];
            },
            _ => {},
        }

        if !self.is_input_enabled() {
            return vec![];
        }

        match key {
            KeyInput::Char(c) => {
                let at = self.byte_offset();
                self.composer.insert(at, c);
                self.cursor += 1;
            },
            KeyInput::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset();
                    self.composer.remove(at);
                }
            },
            KeyInput::Delete => {
                if self.cursor < self.composer_len() {
                    let at = self.byte_offset();
                    self.composer.remove(at);
                }
            },
            KeyInput::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyInput::Right => self.cursor = (self.cursor + 1).min(self.composer_len()),
            KeyInput::Home => self.cursor = 0,
            KeyInput::End => self.cursor = self.composer_len(),
            KeyInput::Enter => return self.submit(),
            KeyInput::Esc | KeyInput::Up | KeyInput::Down => {},
        }

        vec![AppAction::Render]
    }

    /// Send the composer contents. Blank text stays in the composer.
    fn submit(&mut self) -> Vec<AppAction> {
        if self.composer.trim().is_empty() {
            return vec![];
        }

        let content = std::mem::take(&mut self.composer);
        self.cursor = 0;
        self.scroll = 0;
        self.send_message(content)
    }

    /// Send a message to the room.
    pub fn send_message(&self, content: impl Into<String>) -> Vec<AppAction> {
        vec![AppAction::SendMessage { content: content.into() }, AppAction::Render]
    }

    /// Leave the room and quit.
    pub fn exit(&self) -> Vec<AppAction> {
        vec![AppAction::ExitRoom, AppAction::Quit]
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    fn composer_len(&self) -> usize {
        self.composer.chars().count()
    }

    fn byte_offset(&self) -> usize {
        self.composer.char_indices().nth(self.cursor).map_or(self.composer.len(), |(at, _)| at)
    }

    /// Header line
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Latest store view
    pub fn view(&self) -> &StoreView {
        &self.view
    }

    /// Connection status from the latest view
    pub fn status(&self) -> ConnectionStatus {
        self.view.status
    }

    /// The log from the latest view
    pub fn messages(&self) -> &[ChatMessage] {
        &self.view.messages
    }

    /// The log split into date runs.
    pub fn date_groups(&self) -> Vec<DateGroup<'_>> {
        group_by_date(&self.view.messages)
    }

    /// Typing and sending are only possible while connected.
    pub fn is_input_enabled(&self) -> bool {
        self.view.status == ConnectionStatus::Connected
    }

    /// Composer text
    pub fn composer(&self) -> &str {
        &self.composer
    }

    /// Cursor position in the composer, in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Messages scrolled back from the newest
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}
