//! Room session client.
//!
//! The `Client` owns one room view: its configuration, the broker connection
//! state machine, the topic subscription and the [`SessionStore`]. It turns
//! connection lifecycle into store updates and routes inbound chat frames
//! through the reconciliation engine.

use chatsync_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionError, ConnectionStatus,
    env::Environment,
};
use chatsync_proto::{ChatPayload, Frame, UserId};
use chrono::SecondsFormat;
use tracing::{debug, info, warn};

use crate::{
    config::{ConnectionMode, SessionConfig},
    error::ClientError,
    event::{ClientAction, ClientEvent},
    message::ChatMessage,
    reconcile::{Decision, decode_inbound},
    store::{ConnectionHandle, ConnectionState, SessionStore},
};

/// Client for one room view.
pub struct Client<E: Environment> {
    /// Environment for time and timestamps
    env: E,

    /// Immutable session inputs
    config: SessionConfig,

    /// Broker connection state machine
    connection: Connection<E::Instant>,

    /// Connection state and message log
    store: SessionStore,

    /// Live topic subscription. Cleared on every status change away from
    /// connected.
    subscription: Option<String>,

    /// Subscriptions created so far, for id generation
    subscriptions_created: u64,

    /// Set by `Deactivate`; inbound frames are ignored while set
    torn_down: bool,
}

impl<E: Environment> Client<E> {
    /// Create a client with default connection timing.
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self::with_connection_config(env, config, ConnectionConfig::default())
    }

    /// Create a client with custom connection timing.
    ///
    /// The `Authorization` connect header always comes from
    /// [`SessionConfig::auth_token`].
    pub fn with_connection_config(
        env: E,
        config: SessionConfig,
        mut connection_config: ConnectionConfig,
    ) -> Self {
        connection_config.authorization = config.auth_token.clone();
        let connection = Connection::new(env.now(), connection_config);

        Self {
            env,
            config,
            connection,
            store: SessionStore::new(),
            subscription: None,
            subscriptions_created: 0,
            torn_down: false,
        }
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Local user
    pub fn user_id(&self) -> &UserId {
        &self.config.user_id
    }

    /// Store, read-only
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Connection status
    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Live subscription id, if subscribed
    pub fn subscription(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    /// Whether the room view has been torn down.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Underlying connection state machine
    pub fn connection(&self) -> &Connection<E::Instant> {
        &self.connection
    }

    /// Process an event and return actions for the caller.
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Activate => self.handle_activate(),
            ClientEvent::SocketOpened => {
                let actions = self.connection.socket_opened(self.env.now())?;
                self.map_actions(actions)
            },
            ClientEvent::SocketClosed { reason } => {
                let actions = self.connection.socket_closed(self.env.now(), &reason);
                self.map_actions(actions)
            },
            ClientEvent::FrameReceived(frame) => self.handle_frame(frame),
            ClientEvent::HeartBeatReceived => {
                self.connection.heartbeat_received(self.env.now());
                Ok(Vec::new())
            },
            ClientEvent::Tick { now } => {
                let actions = self.connection.tick(now);
                self.map_actions(actions)
            },
            ClientEvent::SeedHistory(history) => Ok(self.handle_seed_history(history)),
            ClientEvent::SendMessage { content } => self.handle_send_message(content),
            ClientEvent::Deactivate => self.handle_deactivate(),
        }
    }

    fn handle_activate(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if self.config.mode != ConnectionMode::Stomp {
            return Err(ClientError::UnsupportedMode(self.config.mode));
        }

        info!(room = %self.config.room, user = %self.config.user_id, "activating session");
        self.torn_down = false;

        let actions = self.connection.activate(self.env.now());
        self.map_actions(actions)
    }

    fn handle_frame(&mut self, frame: Frame) -> Result<Vec<ClientAction>, ClientError> {
        if self.torn_down {
            debug!(command = %frame.command, "dropping frame after teardown");
            return Ok(Vec::new());
        }

        let actions = self.connection.handle_frame(frame, self.env.now())?;
        self.map_actions(actions)
    }

    fn handle_seed_history(&mut self, history: Vec<ChatPayload>) -> Vec<ClientAction> {
        let user = &self.config.user_id;
        let total = history.len();

        let messages: Vec<ChatMessage> = history
            .into_iter()
            .filter_map(|payload| ChatMessage::from_payload(payload, user))
            .collect();

        if messages.len() != total {
            debug!(skipped = total - messages.len(), "history entries without author");
        }

        let count = messages.len();
        self.store.reset_messages(messages);
        vec![ClientAction::HistorySeeded { count }]
    }

    /// Publish, then append optimistically. A refused publish leaves the
    /// store untouched.
    fn handle_send_message(&mut self, content: String) -> Result<Vec<ClientAction>, ClientError> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = self.env.wall_clock().to_rfc3339_opts(SecondsFormat::Millis, true);
        let message = ChatMessage::outgoing(
            self.config.user_id.clone(),
            self.config.nickname.clone(),
            content,
            timestamp,
        );

        let body = message.to_payload().to_json()?;
        let frame = Frame::send(&self.config.room.publish_destination(), body);

        let action = match self.connection.outbound(frame, self.env.now()) {
            Ok(action) => action,
            Err(ConnectionError::NotConnected { status }) => {
                debug!(?status, "send refused while not connected");
                return Err(ClientError::NotConnected { status });
            },
            Err(err) => return Err(err.into()),
        };

        self.store.append_message(message);

        let mut actions = self.map_actions(vec![action])?;
        actions.push(ClientAction::MessageAppended);
        Ok(actions)
    }

    /// Unsubscribe, disconnect, clear the log. Safe to repeat.
    fn handle_deactivate(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let now = self.env.now();
        let mut connection_actions = Vec::new();

        if let Some(id) = self.subscription.take() {
            if let Ok(action) = self.connection.outbound(Frame::unsubscribe(&id), now) {
                connection_actions.push(action);
            }
        }

        connection_actions.extend(self.connection.deactivate(now));
        self.torn_down = true;

        let actions = self.map_actions(connection_actions)?;
        self.store.clear();
        Ok(actions)
    }

    fn map_actions(
        &mut self,
        actions: Vec<ConnectionAction>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let mut out = Vec::with_capacity(actions.len());

        for action in actions {
            match action {
                ConnectionAction::OpenSocket => out.push(ClientAction::OpenSocket),
                ConnectionAction::SendFrame(frame) => out.push(ClientAction::Send(frame)),
                ConnectionAction::SendHeartBeat => out.push(ClientAction::SendHeartBeat),
                ConnectionAction::CloseSocket { reason } => {
                    out.push(ClientAction::CloseSocket { reason });
                },
                ConnectionAction::StatusChanged(status) => self.on_status(status, &mut out)?,
                ConnectionAction::Deliver(frame) => self.on_message(&frame, &mut out),
                ConnectionAction::BrokerError { message, detail } => {
                    warn!(%message, %detail, "broker error");
                    out.push(ClientAction::BrokerError { message, detail });
                },
            }
        }

        Ok(out)
    }

    fn on_status(
        &mut self,
        status: ConnectionStatus,
        out: &mut Vec<ClientAction>,
    ) -> Result<(), ClientError> {
        if status != ConnectionStatus::Connected {
            self.subscription = None;
            let state = match status {
                ConnectionStatus::Connecting => ConnectionState::Connecting,
                ConnectionStatus::Error => ConnectionState::Error,
                _ => ConnectionState::Disconnected,
            };
            self.store.set_connection(state);
            out.push(ClientAction::StatusChanged(status));
            return Ok(());
        }

        let id = format!("sub-{}", self.subscriptions_created);
        self.subscriptions_created += 1;

        let topic = self.config.room.topic();
        let subscribe = self.connection.outbound(Frame::subscribe(&id, &topic), self.env.now())?;

        self.store.set_connection(ConnectionState::Connected(ConnectionHandle {
            session: self.connection.session().map(str::to_string),
            heart_beat: self.connection.heart_beat(),
            subscription: id.clone(),
        }));
        self.subscription = Some(id);

        info!(%topic, "subscribed to room");
        out.push(ClientAction::StatusChanged(status));
        if let ConnectionAction::SendFrame(frame) = subscribe {
            out.push(ClientAction::Send(frame));
        }
        Ok(())
    }

    fn on_message(&mut self, frame: &Frame, out: &mut Vec<ClientAction>) {
        let subscription = frame.header("subscription");
        if subscription.is_none() || subscription != self.subscription.as_deref() {
            debug!(?subscription, "MESSAGE for unknown subscription");
            return;
        }

        let decision = decode_inbound(&frame.body, &self.config.user_id);
        let action = match &decision {
            Decision::Append(_) => Some(ClientAction::MessageAppended),
            Decision::Patch { id, .. } => Some(ClientAction::MessagePatched { id: id.clone() }),
            Decision::SuppressEcho | Decision::Drop(_) => None,
        };

        if decision.apply(&mut self.store) {
            out.extend(action);
        }
    }
}
