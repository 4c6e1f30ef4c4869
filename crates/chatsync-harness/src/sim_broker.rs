//! In-memory STOMP broker.
//!
//! Plays the server side of a chat room without sockets: accepts the
//! handshake, tracks subscriptions, assigns ids to published messages and
//! fans every delivery out to all subscribers of the destination, including
//! the publisher. Output for each session is queued as [`SocketEvent`]s that
//! the test harness feeds back to the client.
//!
//! Failure injection covers what a real broker does to a session: rejected
//! handshakes, `ERROR` frames on a live session, dropped sockets and
//! heart-beats (or their absence).

use std::collections::{BTreeMap, HashMap, VecDeque};

use chatsync_app::SocketEvent;
use chatsync_proto::{ChatPayload, Command, Frame, HeartBeat, MessageId, MessageType, RoomAddress};
use tracing::{debug, trace, warn};

/// Index of a socket session on the broker.
pub type SessionId = usize;

#[derive(Debug, Default)]
struct BrokerSession {
    open: bool,
    connected: bool,
    /// Subscription id → destination
    subscriptions: BTreeMap<String, String>,
    outbox: VecDeque<SocketEvent>,
    received: Vec<Frame>,
}

/// In-memory STOMP broker serving any number of chat rooms.
#[derive(Debug)]
pub struct SimBroker {
    sessions: Vec<BrokerSession>,
    heart_beat: HeartBeat,
    required_token: Option<String>,
    rejections: VecDeque<String>,
    next_message_id: u64,
    next_delivery: u64,
    /// Topic → published payloads, edits applied
    logs: HashMap<String, Vec<ChatPayload>>,
    transcript: Vec<String>,
}

impl Default for SimBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBroker {
    /// Broker that accepts any credential and offers no heart-beats.
    pub fn new() -> Self {
        Self {
            sessions: Vec::new(),
            heart_beat: HeartBeat::DISABLED,
            required_token: None,
            rejections: VecDeque::new(),
            next_message_id: 1,
            next_delivery: 0,
            logs: HashMap::new(),
            transcript: Vec::new(),
        }
    }

    /// Heart-beat timing offered in `CONNECTED`.
    #[must_use]
    pub fn with_heart_beat(mut self, heart_beat: HeartBeat) -> Self {
        self.heart_beat = heart_beat;
        self
    }

    /// Reject handshakes whose `Authorization` header differs from `token`.
    #[must_use]
    pub fn with_required_token(mut self, token: impl Into<String>) -> Self {
        self.required_token = Some(token.into());
        self
    }

    /// First id handed out to a published message.
    #[must_use]
    pub fn with_first_message_id(mut self, id: u64) -> Self {
        self.next_message_id = id;
        self
    }

    /// Accept a new socket.
    pub fn open(&mut self) -> SessionId {
        self.sessions.push(BrokerSession { open: true, ..BrokerSession::default() });
        self.sessions.len() - 1
    }

    /// Socket is open from the broker's side.
    pub fn is_open(&self, session: SessionId) -> bool {
        self.sessions.get(session).is_some_and(|s| s.open)
    }

    /// Handshake completed and socket still open.
    pub fn is_connected(&self, session: SessionId) -> bool {
        self.sessions.get(session).is_some_and(|s| s.open && s.connected)
    }

    /// The client closed its socket.
    pub fn client_closed(&mut self, session: SessionId) {
        if let Some(s) = self.sessions.get_mut(session) {
            s.open = false;
            s.connected = false;
            s.subscriptions.clear();
            s.outbox.clear();
        }
    }

    /// Drop a socket from the broker's side. The client sees it close.
    pub fn drop_session(&mut self, session: SessionId, reason: &str) {
        let Some(s) = self.sessions.get_mut(session) else {
            return;
        };
        if !s.open {
            return;
        }

        debug!(session, reason, "broker dropped session");
        s.open = false;
        s.connected = false;
        s.subscriptions.clear();
        s.outbox.push_back(SocketEvent::Closed { reason: reason.to_string() });
    }

    /// Answer the next handshake with `ERROR` carrying `message`.
    pub fn reject_next_connect(&mut self, message: impl Into<String>) {
        self.rejections.push_back(message.into());
    }

    /// Send an `ERROR` frame on a live session without closing it.
    pub fn inject_error(&mut self, session: SessionId, message: &str, detail: &str) {
        let frame = Frame::new(Command::Error)
            .with_header("message", message)
            .with_body(detail.as_bytes().to_vec());
        self.push(session, frame);
    }

    /// Queue a bare EOL heart-beat for `session`.
    pub fn heart_beat(&mut self, session: SessionId) {
        if let Some(s) = self.sessions.get_mut(session).filter(|s| s.open) {
            s.outbox.push_back(SocketEvent::HeartBeat);
        }
    }

    /// Queue a heart-beat on every connected session.
    pub fn heart_beat_all(&mut self) {
        for session in 0..self.sessions.len() {
            if self.is_connected(session) {
                self.heart_beat(session);
            }
        }
    }

    /// Next queued event for `session`.
    pub fn poll(&mut self, session: SessionId) -> Option<SocketEvent> {
        self.sessions.get_mut(session)?.outbox.pop_front()
    }

    /// Frames the broker received on `session`, in order.
    pub fn received(&self, session: SessionId) -> &[Frame] {
        self.sessions.get(session).map(|s| s.received.as_slice()).unwrap_or_default()
    }

    /// Number of sessions subscribed to `topic`.
    pub fn subscribers(&self, topic: &str) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.open && s.subscriptions.values().any(|d| d == topic))
            .count()
    }

    /// Messages published to `topic`, edits applied.
    pub fn history(&self, topic: &str) -> &[ChatPayload] {
        self.logs.get(topic).map(Vec::as_slice).unwrap_or_default()
    }

    /// One line per frame in and out, for snapshot assertions.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Publish `payload` to `room` as if another participant sent it.
    ///
    /// Returns the id assigned to a new message.
    pub fn publish(&mut self, room: &RoomAddress, payload: ChatPayload) -> Option<MessageId> {
        self.route(&room.topic(), payload)
    }

    /// Handle a frame written by the client on `session`.
    pub fn receive(&mut self, session: SessionId, frame: Frame) {
        let Some(s) = self.sessions.get_mut(session) else {
            warn!(session, "frame for unknown session");
            return;
        };
        if !s.open {
            trace!(session, command = %frame.command, "frame after close");
            return;
        }

        s.received.push(frame.clone());
        self.transcript.push(format!("{session} > {}", frame.command));

        match frame.command {
            Command::Connect | Command::Stomp => self.on_connect(session, &frame),
            Command::Subscribe => self.on_subscribe(session, &frame),
            Command::Unsubscribe => {
                if let (Some(s), Some(id)) = (self.sessions.get_mut(session), frame.header("id")) {
                    s.subscriptions.remove(id);
                }
            },
            Command::Send => self.on_send(session, &frame),
            Command::Disconnect => {
                if let Some(receipt) = frame.header("receipt") {
                    let reply = Frame::new(Command::Receipt).with_header("receipt-id", receipt);
                    self.push(session, reply);
                }
                if let Some(s) = self.sessions.get_mut(session) {
                    s.connected = false;
                    s.subscriptions.clear();
                }
            },
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                self.reject(session, "unexpected client frame");
            },
        }
    }

    fn on_connect(&mut self, session: SessionId, frame: &Frame) {
        if let Some(message) = self.rejections.pop_front() {
            self.reject(session, &message);
            return;
        }

        let authorized = self
            .required_token
            .as_deref()
            .is_none_or(|token| frame.header("Authorization") == Some(token));
        if !authorized {
            self.reject(session, "unauthorized");
            return;
        }

        if let Some(s) = self.sessions.get_mut(session) {
            s.connected = true;
        }

        let reply = Frame::new(Command::Connected)
            .with_header("version", "1.2")
            .with_header("heart-beat", self.heart_beat.to_header_value())
            .with_header("session", format!("session-{session}"))
            .with_header("server", "sim-broker");
        self.push(session, reply);
    }

    fn on_subscribe(&mut self, session: SessionId, frame: &Frame) {
        let (Some(id), Some(destination)) = (frame.header("id"), frame.header("destination"))
        else {
            self.reject(session, "SUBSCRIBE requires id and destination");
            return;
        };

        if let Some(s) = self.sessions.get_mut(session).filter(|s| s.connected) {
            s.subscriptions.insert(id.to_string(), destination.to_string());
        }
    }

    fn on_send(&mut self, session: SessionId, frame: &Frame) {
        let Some(destination) = frame.header("destination") else {
            self.reject(session, "SEND requires a destination");
            return;
        };

        let topic = match destination.strip_prefix(RoomAddress::APP_PREFIX) {
            Some(rest) => format!("{}{rest}", RoomAddress::TOPIC_PREFIX),
            None => destination.to_string(),
        };

        match ChatPayload::from_json(&frame.body) {
            Ok(payload) => {
                self.route(&topic, payload);
            },
            Err(e) => {
                warn!(session, error = %e, "malformed chat payload");
                self.inject_error(session, "malformed payload", &e.to_string());
            },
        }
    }

    /// Record a publication and fan it out. Returns the id of a new message.
    fn route(&mut self, topic: &str, mut payload: ChatPayload) -> Option<MessageId> {
        if payload.message_type == MessageType::Create && payload.id.is_none() {
            payload.id = Some(MessageId::from(self.next_message_id));
            self.next_message_id += 1;
        }

        let log = self.logs.entry(topic.to_string()).or_default();
        let assigned = match payload.message_type {
            MessageType::Create => {
                log.push(payload.clone());
                payload.id.clone()
            },
            MessageType::Update => {
                let target = payload.message_id.as_ref();
                if let Some(entry) = log.iter_mut().find(|p| p.id.as_ref() == target) {
                    entry.content.clone_from(&payload.content);
                }
                None
            },
        };

        let body = match payload.to_json() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "cannot re-encode payload");
                return assigned;
            },
        };

        let targets: Vec<(SessionId, String)> = self
            .sessions
            .iter()
            .enumerate()
            .filter(|(_, s)| s.open && s.connected)
            .flat_map(move |(index, s)| {
                s.subscriptions
                    .iter()
                    .filter(move |(_, destination)| destination.as_str() == topic)
                    .map(move |(id, _)| (index, id.clone()))
            })
            .collect();

        for (session, subscription) in targets {
            let delivery = self.next_delivery;
            self.next_delivery += 1;

            let frame = Frame::new(Command::Message)
                .with_header("subscription", subscription)
                .with_header("destination", topic)
                .with_header("message-id", format!("delivery-{delivery}"))
                .with_header("content-type", "application/json")
                .with_body(body.clone());
            self.push(session, frame);
        }

        assigned
    }

    /// Answer with `ERROR` and drop the session, as brokers do.
    fn reject(&mut self, session: SessionId, message: &str) {
        debug!(session, message, "rejecting session");
        let frame = Frame::new(Command::Error).with_header("message", message);
        self.push(session, frame);

        if let Some(s) = self.sessions.get_mut(session) {
            s.open = false;
            s.connected = false;
            s.subscriptions.clear();
        }
    }

    fn push(&mut self, session: SessionId, frame: Frame) {
        if let Some(s) = self.sessions.get_mut(session) {
            self.transcript.push(format!("{session} < {}", frame.command));
            s.outbox.push_back(SocketEvent::Frame(frame));
        }
    }
}
