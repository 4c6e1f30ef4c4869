//! A chat room of session clients wired to one [`SimBroker`].
//!
//! Drives [`Client`] state machines directly, without the application layer.
//! Socket work requested by a client is performed against the broker on the
//! spot; broker output is delivered by [`SimRoom::settle`] in per-session FIFO
//! order. Time only moves through [`SimRoom::advance`].

use std::{collections::VecDeque, time::Duration};

use chatsync_app::SocketEvent;
use chatsync_client::{
    ChatMessage, ChatPayload, Client, ClientAction, ClientError, ClientEvent, ConnectionConfig,
    Environment, MessageId, RoomAddress, SessionConfig, UserId,
};
use tracing::{debug, warn};

use crate::{
    SimEnv, SimInstant,
    invariants::{ClientSnapshot, InvariantRegistry, SystemSnapshot},
    sim_broker::{SessionId, SimBroker},
};

/// Granularity of [`SimRoom::advance`].
pub const TICK: Duration = Duration::from_millis(250);

/// Upper bound on deliveries per [`SimRoom::settle`], in case two parties
/// keep answering each other forever.
const MAX_SETTLE_DELIVERIES: usize = 100_000;

struct Participant {
    client: Client<SimEnv>,
    session: Option<SessionId>,
    /// Log at the last snapshot, for append-only checks
    baseline: Option<Vec<ChatMessage>>,
    errors: Vec<ClientError>,
    heart_beats_sent: usize,
}

/// Simulated chat room.
pub struct SimRoom {
    env: SimEnv,
    room: RoomAddress,
    broker: SimBroker,
    timing: ConnectionConfig,
    participants: Vec<Participant>,
    network_up: bool,
    broker_heart_beat: Option<Duration>,
    last_broker_heart_beat: Duration,
}

impl SimRoom {
    /// Room `room` served by a default broker.
    pub fn new(env: SimEnv, room: RoomAddress) -> Self {
        Self {
            env,
            room,
            broker: SimBroker::new(),
            timing: ConnectionConfig::default(),
            participants: Vec::new(),
            network_up: true,
            broker_heart_beat: None,
            last_broker_heart_beat: Duration::ZERO,
        }
    }

    /// Serve the room from `broker`.
    #[must_use]
    pub fn with_broker(mut self, broker: SimBroker) -> Self {
        self.broker = broker;
        self
    }

    /// Connection timing for clients that join afterwards.
    #[must_use]
    pub fn with_timing(mut self, timing: ConnectionConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Have the broker heart-beat every connected session at `interval`
    /// while time advances.
    #[must_use]
    pub fn with_broker_heart_beats(mut self, interval: Duration) -> Self {
        self.broker_heart_beat = Some(interval);
        self
    }

    /// Join `user` and run the handshake to completion.
    ///
    /// Returns the participant index.
    pub fn join(&mut self, user: impl Into<UserId>, nickname: &str) -> Result<usize, ClientError> {
        let config = SessionConfig::new(self.room.clone(), user.into(), nickname);
        self.join_with(config)
    }

    /// Join with an explicit session configuration.
    pub fn join_with(&mut self, config: SessionConfig) -> Result<usize, ClientError> {
        let client = Client::with_connection_config(self.env.clone(), config, self.timing.clone());
        self.participants.push(Participant {
            client,
            session: None,
            baseline: None,
            errors: Vec::new(),
            heart_beats_sent: 0,
        });

        let index = self.participants.len() - 1;
        self.dispatch(index, ClientEvent::Activate)?;
        self.settle();
        Ok(index)
    }

    /// Local user of participant `index` sends `content`.
    ///
    /// The echo is not delivered until [`SimRoom::settle`].
    pub fn send(&mut self, index: usize, content: &str) -> Result<(), ClientError> {
        self.dispatch(index, ClientEvent::SendMessage { content: content.to_string() })
    }

    /// Participant `index` leaves the room.
    pub fn leave(&mut self, index: usize) -> Result<(), ClientError> {
        self.dispatch(index, ClientEvent::Deactivate)
    }

    /// Replace participant `index`'s log with `history`.
    pub fn seed(&mut self, index: usize, history: Vec<ChatPayload>) -> Result<(), ClientError> {
        self.dispatch(index, ClientEvent::SeedHistory(history))?;
        self.participants[index].baseline = None;
        Ok(())
    }

    /// Publish `payload` as a participant outside the simulation.
    pub fn publish(&mut self, payload: ChatPayload) -> Option<MessageId> {
        self.broker.publish(&self.room, payload)
    }

    /// The broker drops participant `index`'s socket.
    pub fn drop_socket(&mut self, index: usize, reason: &str) {
        if let Some(session) = self.participants[index].session {
            self.broker.drop_session(session, reason);
        }
    }

    /// While down, every socket the clients try to open is refused.
    pub fn set_network(&mut self, up: bool) {
        self.network_up = up;
    }

    /// Deliver queued broker output until nothing is left.
    ///
    /// Returns the number of socket events delivered.
    pub fn settle(&mut self) -> usize {
        let mut delivered = 0;

        loop {
            let mut progressed = false;

            for index in 0..self.participants.len() {
                while let Some(event) = self.next_event(index) {
                    progressed = true;
                    delivered += 1;
                    self.deliver(index, event);

                    if delivered >= MAX_SETTLE_DELIVERIES {
                        warn!(delivered, "room did not settle");
                        return delivered;
                    }
                }
            }

            if !progressed {
                return delivered;
            }
        }
    }

    /// Move time forward in [`TICK`] steps, ticking every client and
    /// settling after each step.
    pub fn advance(&mut self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            let step = remaining.min(TICK);
            remaining -= step;
            self.env.advance(step);

            if let Some(interval) = self.broker_heart_beat {
                let elapsed = self.env.elapsed();
                if elapsed - self.last_broker_heart_beat >= interval {
                    self.last_broker_heart_beat = elapsed;
                    self.broker.heart_beat_all();
                }
            }

            self.tick();
        }
    }

    /// Tick every client at the current time and settle.
    pub fn tick(&mut self) {
        let now = self.env.now();
        for index in 0..self.participants.len() {
            if let Err(e) = self.dispatch(index, ClientEvent::Tick { now }) {
                self.participants[index].errors.push(e);
            }
        }
        self.settle();
    }

    /// Capture every client and advance the append-only baselines.
    pub fn snapshot(&mut self) -> SystemSnapshot {
        let mut snapshot = SystemSnapshot::empty();

        for (index, participant) in self.participants.iter_mut().enumerate() {
            let mut client = ClientSnapshot::of(index, &participant.client);
            client.previous = participant.baseline.take();

            participant.baseline =
                if client.torn_down { None } else { Some(client.messages.clone()) };
            snapshot.add_client(client);
        }

        snapshot
    }

    /// Snapshot the room and assert `registry` holds.
    pub fn check_invariants(&mut self, registry: &InvariantRegistry, context: &str) {
        let snapshot = self.snapshot();
        registry.assert_all(&snapshot, context);
    }

    /// Participant `index`'s session client.
    pub fn client(&self, index: usize) -> &Client<SimEnv> {
        &self.participants[index].client
    }

    /// Participant `index`'s log.
    pub fn messages(&self, index: usize) -> &[ChatMessage] {
        self.participants[index].client.store().messages()
    }

    /// Broker session currently held by participant `index`.
    pub fn session(&self, index: usize) -> Option<SessionId> {
        self.participants[index].session
    }

    /// Errors participant `index` reported while handling broker output.
    pub fn errors(&self, index: usize) -> &[ClientError] {
        &self.participants[index].errors
    }

    /// Heart-beats participant `index` has written.
    pub fn heart_beats_sent(&self, index: usize) -> usize {
        self.participants[index].heart_beats_sent
    }

    /// The broker
    pub fn broker(&self) -> &SimBroker {
        &self.broker
    }

    /// The broker, for failure injection
    pub fn broker_mut(&mut self) -> &mut SimBroker {
        &mut self.broker
    }

    /// The shared environment
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Address of the room
    pub fn room(&self) -> &RoomAddress {
        &self.room
    }

    /// Number of participants, including those who left
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// No one has joined
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    fn next_event(&mut self, index: usize) -> Option<SocketEvent> {
        let session = self.participants[index].session?;
        self.broker.poll(session)
    }

    fn deliver(&mut self, index: usize, event: SocketEvent) {
        let event = match event {
            SocketEvent::Frame(frame) => ClientEvent::FrameReceived(frame),
            SocketEvent::HeartBeat => ClientEvent::HeartBeatReceived,
            SocketEvent::Closed { reason } => {
                self.participants[index].session = None;
                ClientEvent::SocketClosed { reason }
            },
        };

        if let Err(e) = self.dispatch(index, event) {
            debug!(index, error = %e, "client rejected broker output");
            self.participants[index].errors.push(e);
        }
    }

    /// Feed `event` to participant `index` and perform the socket work it
    /// asks for. Errors of follow-up events are recorded, not returned.
    fn dispatch(
        &mut self,
        index: usize,
        event: ClientEvent<SimInstant>,
    ) -> Result<(), ClientError> {
        let actions = self.participants[index].client.handle(event)?;
        let mut pending = VecDeque::new();
        self.perform(index, actions, &mut pending);

        while let Some(event) = pending.pop_front() {
            match self.participants[index].client.handle(event) {
                Ok(actions) => self.perform(index, actions, &mut pending),
                Err(e) => self.participants[index].errors.push(e),
            }
        }

        Ok(())
    }

    fn perform(
        &mut self,
        index: usize,
        actions: Vec<ClientAction>,
        pending: &mut VecDeque<ClientEvent<SimInstant>>,
    ) {
        for action in actions {
            let participant = &mut self.participants[index];

            match action {
                ClientAction::OpenSocket => {
                    if self.network_up {
                        participant.session = Some(self.broker.open());
                        pending.push_back(ClientEvent::SocketOpened);
                    } else {
                        pending.push_back(ClientEvent::SocketClosed {
                            reason: "connection refused".to_string(),
                        });
                    }
                },
                ClientAction::Send(frame) => match participant.session {
                    Some(session) => self.broker.receive(session, frame),
                    None => warn!(index, command = %frame.command, "send without a socket"),
                },
                ClientAction::SendHeartBeat => participant.heart_beats_sent += 1,
                ClientAction::CloseSocket { reason } => {
                    if let Some(session) = participant.session.take() {
                        debug!(index, %reason, "client closed socket");
                        self.broker.client_closed(session);
                    }
                },
                ClientAction::StatusChanged(_)
                | ClientAction::BrokerError { .. }
                | ClientAction::MessageAppended
                | ClientAction::MessagePatched { .. }
                | ClientAction::HistorySeeded { .. } => {},
            }
        }
    }
}
