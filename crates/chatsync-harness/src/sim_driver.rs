//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`chatsync_app::Runtime`] orchestration code runs in both production and
//! simulation: input comes from a scripted queue, the socket is a session on
//! a shared [`SimBroker`], and time is the [`SimEnv`] virtual clock.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chatsync_app::{App, AppEvent, Driver, KeyInput, SocketEvent};
use chatsync_client::Environment;
use chatsync_proto::Frame;

use crate::{
    SimEnv, SimInstant,
    sim_broker::{SessionId, SimBroker},
};

/// A broker shared by every driver in one simulated room.
pub type SharedBroker = Arc<Mutex<SimBroker>>;

/// Wrap a broker for sharing between drivers.
pub fn shared_broker(broker: SimBroker) -> SharedBroker {
    Arc::new(Mutex::new(broker))
}

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] trait so the same [`chatsync_app::Runtime`]
/// orchestration code runs in both production TUI and simulation tests.
pub struct SimDriver {
    env: SimEnv,
    broker: SharedBroker,
    session: Option<SessionId>,
    pending_events: VecDeque<AppEvent>,
    network_up: bool,
    renders: usize,
    last_frame: Vec<String>,
    stopped: bool,
}

impl SimDriver {
    /// Driver whose socket is a session on `broker`.
    pub fn new(env: SimEnv, broker: SharedBroker) -> Self {
        Self {
            env,
            broker,
            session: None,
            pending_events: VecDeque::new(),
            network_up: true,
            renders: 0,
            last_frame: Vec::new(),
            stopped: false,
        }
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&mut self, event: AppEvent) {
        self.pending_events.push_back(event);
    }

    /// Inject a key press.
    pub fn inject_key(&mut self, key: KeyInput) {
        self.inject_event(AppEvent::Key(key));
    }

    /// Inject `text` one character at a time, followed by Enter.
    pub fn type_line(&mut self, text: &str) {
        for c in text.chars() {
            self.inject_key(KeyInput::Char(c));
        }
        self.inject_key(KeyInput::Enter);
    }

    /// Inject a tick event.
    pub fn inject_tick(&mut self) {
        self.inject_event(AppEvent::Tick);
    }

    /// Check if there are input events waiting.
    pub fn has_pending(&self) -> bool {
        !self.pending_events.is_empty()
    }

    /// While down, `open` fails.
    pub fn set_network(&mut self, up: bool) {
        self.network_up = up;
    }

    /// Broker session held by this driver.
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// The shared broker.
    pub fn broker(&self) -> MutexGuard<'_, SimBroker> {
        self.broker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// Message lines of the last render, as `nickname: content`.
    pub fn last_frame(&self) -> &[String] {
        &self.last_frame
    }

    /// `stop` was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Hand the broker session back. Delivery is synchronous, so nothing is
    /// left queued.
    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.broker().client_closed(session);
        }
    }

    fn require_session(&self) -> Result<SessionId, SimDriverError> {
        self.session.ok_or_else(|| SimDriverError("socket not open".to_string()))
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        Ok(self.pending_events.pop_front())
    }

    async fn open(&mut self) -> Result<(), Self::Error> {
        if !self.network_up {
            return Err(SimDriverError("connection refused".to_string()));
        }

        let session = self.broker().open();
        self.session = Some(session);
        Ok(())
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), Self::Error> {
        let session = self.require_session()?;
        self.broker().receive(session, frame);
        Ok(())
    }

    async fn send_heartbeat(&mut self) -> Result<(), Self::Error> {
        self.require_session().map(|_| ())
    }

    async fn recv(&mut self) -> Option<SocketEvent> {
        let session = self.session?;
        let event = self.broker().poll(session)?;

        if matches!(event, SocketEvent::Closed { .. }) {
            self.session = None;
        }
        Some(event)
    }

    async fn close(&mut self) {
        self.release();
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.renders += 1;
        self.last_frame = app
            .messages()
            .iter()
            .map(|m| format!("{}: {}", m.user_nickname, m.content))
            .collect();
        Ok(())
    }

    fn stop(&mut self) {
        self.release();
        self.stopped = true;
    }
}
