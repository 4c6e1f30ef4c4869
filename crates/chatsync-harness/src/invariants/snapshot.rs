//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the room at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use chatsync_client::{ChatMessage, Client, ConnectionStatus, Environment, MessageId, UserId};

/// Snapshot of every participant in a simulated room.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-client state snapshots.
    pub clients: Vec<ClientSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no clients).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single client.
    pub fn single(client: ClientSnapshot) -> Self {
        Self { clients: vec![client] }
    }

    /// Create a snapshot from multiple clients.
    pub fn from_clients(clients: Vec<ClientSnapshot>) -> Self {
        Self { clients }
    }

    /// Add a client snapshot.
    pub fn add_client(&mut self, client: ClientSnapshot) {
        self.clients.push(client);
    }
}

/// Snapshot of a single client's observable state.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    /// Participant index in the simulation.
    pub id: usize,
    /// Local user the client attributes messages against.
    pub user_id: UserId,
    /// Connection status shown to the user.
    pub status: ConnectionStatus,
    /// Client left the room.
    pub torn_down: bool,
    /// The message log.
    pub messages: Vec<ChatMessage>,
    /// The log at the previous snapshot, if one was taken since the log was
    /// last replaced.
    pub previous: Option<Vec<ChatMessage>>,
}

impl ClientSnapshot {
    /// Snapshot of a disconnected client with an empty log.
    pub fn new(id: usize, user_id: impl Into<UserId>) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            status: ConnectionStatus::Disconnected,
            torn_down: false,
            messages: Vec::new(),
            previous: None,
        }
    }

    /// Capture a live client.
    pub fn of<E: Environment>(id: usize, client: &Client<E>) -> Self {
        Self {
            id,
            user_id: client.user_id().clone(),
            status: client.status(),
            torn_down: client.is_torn_down(),
            messages: client.store().messages().to_vec(),
            previous: None,
        }
    }

    /// Set connection status.
    #[must_use]
    pub fn with_status(mut self, status: ConnectionStatus) -> Self {
        self.status = status;
        self
    }

    /// Add log entries.
    #[must_use]
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Record the log seen at the previous snapshot.
    #[must_use]
    pub fn with_previous(mut self, previous: Vec<ChatMessage>) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Mark the client as torn down.
    #[must_use]
    pub fn torn_down(mut self) -> Self {
        self.torn_down = true;
        self
    }

    /// Server ids in log order, skipping optimistic entries.
    pub fn server_ids(&self) -> impl Iterator<Item = &MessageId> {
        self.messages.iter().filter_map(|m| m.id.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot() {
        let snapshot = SystemSnapshot::empty();
        assert!(snapshot.clients.is_empty());
    }

    #[test]
    fn server_ids_skip_pending_entries() {
        let mut confirmed = ChatMessage::outgoing(UserId::from(2), "b", "hi", "t");
        confirmed.id = Some(MessageId::from(9));
        let pending = ChatMessage::outgoing(UserId::from(1), "a", "yo", "t");

        let client = ClientSnapshot::new(0, 1u64).with_messages([confirmed, pending]);

        assert_eq!(client.server_ids().collect::<Vec<_>>(), vec![&MessageId::from(9)]);
        assert_eq!(client.status, ConnectionStatus::Disconnected);
    }
}
