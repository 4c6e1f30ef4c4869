//! Observable application state types.
//!
//! These structures serve as the view model for the room. They contain the
//! subset of session state necessary for rendering without exposing the
//! client or the connection state machine.

use chatsync_client::{ChatMessage, MessageId, SessionStore};
use chatsync_core::ConnectionStatus;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Read-only copy of the session store taken after a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreView {
    /// Connection status
    pub status: ConnectionStatus,
    /// The log, in arrival order
    pub messages: Vec<ChatMessage>,
    /// Store revision the view was taken at
    pub revision: u64,
}

impl StoreView {
    /// Snapshot `store`.
    pub fn of(store: &SessionStore) -> Self {
        Self {
            status: store.connection().status(),
            messages: store.messages().to_vec(),
            revision: store.revision(),
        }
    }

    /// Bring the view up to `revision` by replaying `changes` in order.
    pub fn apply(&mut self, revision: u64, changes: Vec<StoreChange>) {
        for change in changes {
            match change {
                StoreChange::Status(status) => self.status = status,
                StoreChange::Appended(message) => self.messages.push(message),
                StoreChange::Patched { id, content } => {
                    if let Some(message) =
                        self.messages.iter_mut().find(|m| m.id.as_ref() == Some(&id))
                    {
                        message.content = content;
                    }
                },
            }
        }
        self.revision = revision;
    }
}

/// One incremental change to the session store.
///
/// Appends and edits travel as changes so the view never copies the whole
/// log for a single message. Wholesale replacements (history, teardown) are
/// published as a fresh [`StoreView`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// Connection status moved
    Status(ConnectionStatus),
    /// A message was added at the tail
    Appended(ChatMessage),
    /// A message's content was replaced in place
    Patched {
        /// Message edited
        id: MessageId,
        /// Its new content
        content: String,
    },
}

impl Default for StoreView {
    fn default() -> Self {
        Self { status: ConnectionStatus::Disconnected, messages: Vec::new(), revision: 0 }
    }
}

/// Run of consecutive messages sharing a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateGroup<'a> {
    /// Date of every message in the run. `None` if the timestamp could not be
    /// read.
    pub date: Option<NaiveDate>,
    /// The run, in log order
    pub messages: &'a [ChatMessage],
}

/// Split `messages` into runs of the same calendar date.
///
/// Only consecutive messages are grouped. The log is never resorted, so a
/// date can appear in more than one group if arrivals interleave.
pub fn group_by_date(messages: &[ChatMessage]) -> Vec<DateGroup<'_>> {
    let mut groups = Vec::new();
    let mut start = 0;

    for i in 1..=messages.len() {
        let boundary = i == messages.len()
            || message_date(&messages[i].timestamp) != message_date(&messages[start].timestamp);

        if boundary {
            groups.push(DateGroup {
                date: message_date(&messages[start].timestamp),
                messages: &messages[start..i],
            });
            start = i;
        }
    }

    groups
}

/// Calendar date of an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (date taken in the timestamp's own offset), a naive local
/// date-time as the history endpoint returns, or a bare date.
pub fn message_date(timestamp: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d").ok()
}

/// `HH:MM` part of an ISO-8601 timestamp, for display.
pub fn message_time(timestamp: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.format("%H:%M").to_string());
    }
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.format("%H:%M").to_string())
}
