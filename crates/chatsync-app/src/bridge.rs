//! Session-to-application translation layer.
//!
//! The [`Bridge`] wraps the room session [`chatsync_client::Client`] and adapts
//! it to the application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`]s into client events.
//! - Accumulates [`Outgoing`] socket work for the driver to perform in the
//!   next I/O cycle.
//! - Turns client results into [`crate::AppEvent`]s. Appends, edits and
//!   status moves are published as [`StoreChange`]s; wholesale replacements
//!   (history, teardown) as a fresh [`StoreView`].
//! - Manages time ticks generically to support both real-time execution and
//!   deterministic simulation.

use chatsync_client::{
    ChatPayload, Client, ClientAction, ClientError, ClientEvent, ConnectionConfig,
    ConnectionStatus, Environment, SessionConfig,
};
use chatsync_proto::Frame;
use tracing::debug;

use crate::{AppAction, AppEvent, StoreChange, StoreView};

/// Socket work requested by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Open a socket to the broker. Report the outcome back through
    /// [`Bridge::socket_opened`] or [`Bridge::socket_closed`].
    Open,
    /// Write a frame.
    Frame(Frame),
    /// Write a bare EOL heart-beat.
    HeartBeat,
    /// Close the socket.
    Close {
        /// Why the session is closing it
        reason: String,
    },
}

/// Bridge between App and the room session client.
///
/// Generic over Environment to support both production and simulation.
/// The Instant type is determined by the Environment's associated type.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    outgoing: Vec<Outgoing>,
    /// Store revision last published to the App
    published: u64,
    /// Status last published to the App
    published_status: ConnectionStatus,
    /// Length of the log as last published to the App
    mirrored: usize,
    /// Changes since the last publish
    changes: Vec<StoreChange>,
    /// The log was replaced; publish a full view
    resync: bool,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge for the room described by `config`.
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self::from_client(Client::new(env, config))
    }

    /// Create a new Bridge with custom connection timing.
    pub fn with_connection_config(env: E, config: SessionConfig, timing: ConnectionConfig) -> Self {
        Self::from_client(Client::with_connection_config(env, config, timing))
    }

    fn from_client(client: Client<E>) -> Self {
        let store = client.store();
        let published = store.revision();
        let published_status = store.connection().status();
        let mirrored = store.len();
        Self {
            client,
            outgoing: Vec::new(),
            published,
            published_status,
            mirrored,
            changes: Vec::new(),
            resync: false,
        }
    }

    /// The wrapped client.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Start the session.
    pub fn activate(&mut self) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Activate)
    }

    /// Replace the log with history loaded out of band.
    pub fn seed_history(&mut self, history: Vec<ChatPayload>) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::SeedHistory(history))
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        match action {
            AppAction::SendMessage { content } => {
                let unsent = content.clone();
                match self.client.handle(ClientEvent::SendMessage { content }) {
                    Ok(actions) => self.handle_client_result(Ok(actions)),
                    Err(e) => {
                        let message = e.to_string();
                        let mut events = vec![AppEvent::SendRefused { content: unsent, message }];
                        events.extend(self.handle_client_result(Ok(Vec::new())));
                        events
                    },
                }
            },
            AppAction::ExitRoom => self.dispatch(ClientEvent::Deactivate),
            AppAction::Render | AppAction::Quit => vec![],
        }
    }

    /// The socket requested by [`Outgoing::Open`] is open.
    pub fn socket_opened(&mut self) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::SocketOpened)
    }

    /// The socket closed or could not be opened.
    pub fn socket_closed(&mut self, reason: impl Into<String>) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::SocketClosed { reason: reason.into() })
    }

    /// Handle a frame from the broker.
    pub fn handle_frame(&mut self, frame: Frame) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::FrameReceived(frame))
    }

    /// Handle a heart-beat from the broker.
    pub fn heartbeat_received(&mut self) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::HeartBeatReceived)
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        self.dispatch(ClientEvent::Tick { now })
    }

    /// Take pending socket work.
    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    fn dispatch(&mut self, event: ClientEvent<E::Instant>) -> Vec<AppEvent> {
        let result = self.client.handle(event);
        self.handle_client_result(result)
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        let mut events = match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(e) => vec![AppEvent::Error { message: e.to_string() }],
        };

        if let Some(event) = self.publish() {
            events.push(event);
        }

        events
    }

    /// Store event for everything that changed since the last publish.
    fn publish(&mut self) -> Option<AppEvent> {
        let store = self.client.store();
        let changes = std::mem::take(&mut self.changes);
        let resync = std::mem::take(&mut self.resync) || store.len() != self.mirrored;

        let revision = store.revision();
        if revision == self.published {
            return None;
        }
        self.published = revision;

        if resync {
            self.mirrored = store.len();
            self.published_status = store.connection().status();
            return Some(AppEvent::StoreChanged(StoreView::of(store)));
        }

        let mut update = Vec::with_capacity(changes.len() + 1);
        let status = store.connection().status();
        if status != self.published_status {
            self.published_status = status;
            update.push(StoreChange::Status(status));
        }
        update.extend(changes);

        Some(AppEvent::StoreUpdated { revision, changes: update })
    }

    /// Record a log change reported by the client.
    fn track(&mut self, action: &ClientAction) {
        let store = self.client.store();

        match action {
            ClientAction::MessageAppended => match store.messages().get(self.mirrored) {
                Some(message) => {
                    self.changes.push(StoreChange::Appended(message.clone()));
                    self.mirrored += 1;
                },
                None => self.resync = true,
            },
            ClientAction::MessagePatched { id } => match store.get(id) {
                Some(message) => self.changes.push(StoreChange::Patched {
                    id: id.clone(),
                    content: message.content.clone(),
                }),
                None => self.resync = true,
            },
            ClientAction::HistorySeeded { .. } => self.resync = true,
            _ => {},
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::OpenSocket => self.outgoing.push(Outgoing::Open),
                ClientAction::Send(frame) => self.outgoing.push(Outgoing::Frame(frame)),
                ClientAction::SendHeartBeat => self.outgoing.push(Outgoing::HeartBeat),
                ClientAction::CloseSocket { reason } => {
                    self.outgoing.push(Outgoing::Close { reason });
                },
                ClientAction::BrokerError { message, .. } => {
                    events.push(AppEvent::Error { message });
                },
                ClientAction::StatusChanged(status) => debug!(?status, "session status"),
                ClientAction::MessageAppended
                | ClientAction::MessagePatched { .. }
                | ClientAction::HistorySeeded { .. } => self.track(&action),
            }
        }

        events
    }
}
