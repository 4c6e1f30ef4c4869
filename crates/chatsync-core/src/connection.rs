//! Broker connection state machine.
//!
//! Manages the STOMP session lifecycle: socket open, `CONNECT`/`CONNECTED`
//! handshake, heart-beats, silent-disconnect detection, fixed-delay
//! reconnects and graceful shutdown. Uses the action pattern: methods take
//! time as input and return actions for the driver to execute. No I/O happens
//! here.
//!
//! # State Machine
//!
//! ```text
//!                  activate                 CONNECTED
//! ┌──────────────┐ ───────> ┌────────────┐ ─────────> ┌───────────┐
//! │ Disconnected │          │ Connecting │            │ Connected │
//! └──────────────┘ <─────── └────────────┘            └───────────┘
//!    ^      │     deactivate   │      ^                     │
//!    │      │                  │ ERROR / timeout / close    │ close / silence
//!    │      │                  v      │ retry after delay   │
//!    │      │               ┌───────┐ │                     │
//!    │      └──────────────>│ Error │─┘                     │
//!    │                      └───────┘                       │
//!    └──────────────────── retry after delay <──────────────┘
//! ```
//!
//! While active, every fall out of `Connecting` or `Connected` schedules a new
//! attempt `reconnect_delay` later; [`Connection::tick`] starts it when due.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use chatsync_proto::{Command, Frame, HeartBeat};
use tracing::{debug, info, warn};

use crate::error::ConnectionError;

/// Delay between a failed or lost connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Heart-beat interval offered in both directions.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(4);

/// Time allowed from opening the socket to receiving `CONNECTED`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Inbound silence tolerated, as a multiple of the negotiated interval.
const HEARTBEAT_GRACE_FACTOR: u32 = 2;

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a new socket to the broker
    OpenSocket,

    /// Encode and write this frame
    SendFrame(Frame),

    /// Write a bare EOL heart-beat
    SendHeartBeat,

    /// Close the socket
    CloseSocket {
        /// Reason for closing
        reason: String,
    },

    /// Observable status changed
    StatusChanged(ConnectionStatus),

    /// `MESSAGE` frame for the layer above
    Deliver(Frame),

    /// Broker reported an `ERROR` frame
    BrokerError {
        /// Value of the `message` header
        message: String,
        /// Frame body
        detail: String,
    },
}

/// Observable connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// No session and no attempt in progress
    Disconnected,
    /// Socket opening or handshake in flight
    Connecting,
    /// Handshake completed, frames flow
    Connected,
    /// Last attempt failed
    Error,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Virtual host sent in `CONNECT`
    pub host: String,
    /// Credential forwarded verbatim as the `Authorization` connect header
    pub authorization: Option<String>,
    /// Heart-beat intervals we offer
    pub heart_beat: HeartBeat,
    /// Fixed delay before reconnecting
    pub reconnect_delay: Duration,
    /// Timeout for completing the handshake
    pub handshake_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            authorization: None,
            heart_beat: HeartBeat::new(DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HEARTBEAT_INTERVAL),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// Broker connection state machine.
///
/// Pure: no I/O, no stored environment. Generic over `Instant` so the
/// harness can drive it with virtual time.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    status: ConnectionStatus,
    config: ConnectionConfig,
    /// Between `activate` and `deactivate`
    active: bool,
    /// Driver reported the socket open and has not reported it closed
    socket_open: bool,
    /// Start of the current attempt
    attempt_started: Option<I>,
    /// When the pending reconnect was scheduled
    retry_from: Option<I>,
    last_received: I,
    last_sent: I,
    negotiated: HeartBeat,
    session: Option<String>,
    server: Option<String>,
    attempts: u64,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create an inactive connection in [`ConnectionStatus::Disconnected`].
    pub fn new(now: I, config: ConnectionConfig) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            config,
            active: false,
            socket_open: false,
            attempt_started: None,
            retry_from: None,
            last_received: now,
            last_sent: now,
            negotiated: HeartBeat::DISABLED,
            session: None,
            server: None,
            attempts: 0,
        }
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether the connection has been activated and not yet deactivated.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Heart-beat intervals agreed with the broker. Disabled until connected.
    #[must_use]
    pub fn heart_beat(&self) -> HeartBeat {
        self.negotiated
    }

    /// Session id from the broker's `CONNECTED` frame, if it sent one.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// `server` header from the broker's `CONNECTED` frame.
    #[must_use]
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Number of connection attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Start connecting.
    ///
    /// Idempotent while connecting or connected. From `Disconnected` or
    /// `Error` it starts a new attempt immediately, cancelling any pending
    /// reconnect.
    pub fn activate(&mut self, now: I) -> Vec<ConnectionAction> {
        self.active = true;

        match self.status {
            ConnectionStatus::Connecting | ConnectionStatus::Connected => Vec::new(),
            ConnectionStatus::Disconnected | ConnectionStatus::Error => self.begin_attempt(now),
        }
    }

    /// Socket is open: send `CONNECT`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` unless an attempt is waiting for its
    ///   socket
    pub fn socket_opened(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if !self.active || self.status != ConnectionStatus::Connecting || self.socket_open {
            return Err(ConnectionError::InvalidState {
                status: self.status,
                operation: "socket_opened".to_string(),
            });
        }

        self.socket_open = true;
        self.last_received = now;
        self.last_sent = now;

        let connect = Frame::connect(
            &self.config.host,
            self.config.heart_beat,
            self.config.authorization.as_deref(),
        );

        debug!(host = %self.config.host, "socket open, sending CONNECT");
        Ok(vec![ConnectionAction::SendFrame(connect)])
    }

    /// Process an inbound frame.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::UnexpectedFrame` if the command is not valid in the
    ///   current status
    /// - `ConnectionError::Protocol` if `CONNECTED` carries a malformed
    ///   `heart-beat` header
    pub fn handle_frame(
        &mut self,
        frame: Frame,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        self.last_received = now;

        match (self.status, frame.command) {
            (ConnectionStatus::Connecting, Command::Connected) if self.socket_open => {
                let offered = match frame.header("heart-beat") {
                    Some(value) => HeartBeat::parse(value)?,
                    None => HeartBeat::DISABLED,
                };

                self.negotiated = HeartBeat::negotiate(self.config.heart_beat, offered);
                self.session = frame.header("session").map(str::to_string);
                self.server = frame.header("server").map(str::to_string);
                self.attempt_started = None;
                self.last_sent = now;

                info!(
                    session = ?self.session,
                    outgoing = ?self.negotiated.outgoing,
                    incoming = ?self.negotiated.incoming,
                    "connected to broker"
                );
                Ok(self.set_status(ConnectionStatus::Connected).into_iter().collect())
            },

            (ConnectionStatus::Connecting, Command::Error) if self.socket_open => {
                let (message, detail) = broker_error(&frame);
                warn!(%message, "broker rejected handshake");

                let mut actions = vec![ConnectionAction::BrokerError {
                    message: message.clone(),
                    detail,
                }];
                actions.extend(self.fail(now, ConnectionStatus::Error, message));
                Ok(actions)
            },

            (ConnectionStatus::Connected, Command::Error) => {
                let (message, detail) = broker_error(&frame);
                warn!(%message, "broker reported error");
                Ok(vec![ConnectionAction::BrokerError { message, detail }])
            },

            (ConnectionStatus::Connected, Command::Message) => {
                Ok(vec![ConnectionAction::Deliver(frame)])
            },

            (ConnectionStatus::Connected, Command::Receipt) => {
                debug!(receipt = ?frame.header("receipt-id"), "receipt");
                Ok(Vec::new())
            },

            (status, command) => Err(ConnectionError::UnexpectedFrame { status, command }),
        }
    }

    /// Inbound heart-beat (a bare EOL) arrived.
    pub fn heartbeat_received(&mut self, now: I) {
        self.last_received = now;
    }

    /// Driver reports the socket closed or failed to open.
    ///
    /// No-op when no attempt or session is live, which covers the close that
    /// follows our own [`ConnectionAction::CloseSocket`].
    pub fn socket_closed(&mut self, now: I, reason: &str) -> Vec<ConnectionAction> {
        match self.status {
            ConnectionStatus::Connecting => {
                warn!(%reason, "connection attempt failed");
                self.fail(now, ConnectionStatus::Error, reason.to_string())
                    .into_iter()
                    .filter(|action| !matches!(action, ConnectionAction::CloseSocket { .. }))
                    .collect()
            },
            ConnectionStatus::Connected => {
                warn!(%reason, "connection lost");
                self.fail(now, ConnectionStatus::Disconnected, reason.to_string())
                    .into_iter()
                    .filter(|action| !matches!(action, ConnectionAction::CloseSocket { .. }))
                    .collect()
            },
            ConnectionStatus::Disconnected | ConnectionStatus::Error => {
                self.socket_open = false;
                Vec::new()
            },
        }
    }

    /// Periodic maintenance: heart-beats, timeouts and scheduled reconnects.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.status {
            ConnectionStatus::Connecting => {
                let Some(started) = self.attempt_started else {
                    return Vec::new();
                };

                let elapsed = now - started;
                if elapsed < self.config.handshake_timeout {
                    return Vec::new();
                }

                let err = ConnectionError::HandshakeTimeout { elapsed };
                warn!(%err, "giving up on handshake");
                self.fail(now, ConnectionStatus::Error, err.to_string())
            },

            ConnectionStatus::Connected => {
                let incoming = self.negotiated.incoming;
                if !incoming.is_zero() {
                    let silent = now - self.last_received;
                    if silent > incoming * HEARTBEAT_GRACE_FACTOR {
                        let err = ConnectionError::HeartBeatTimeout { elapsed: silent };
                        warn!(%err, "broker went silent");
                        return self.fail(now, ConnectionStatus::Disconnected, err.to_string());
                    }
                }

                let outgoing = self.negotiated.outgoing;
                if !outgoing.is_zero() && now - self.last_sent >= outgoing {
                    self.last_sent = now;
                    return vec![ConnectionAction::SendHeartBeat];
                }

                Vec::new()
            },

            ConnectionStatus::Disconnected | ConnectionStatus::Error => {
                let due = match self.retry_from {
                    Some(scheduled) => {
                        self.active && now - scheduled >= self.config.reconnect_delay
                    },
                    None => false,
                };

                if due {
                    info!(attempt = self.attempts + 1, "reconnecting");
                    self.begin_attempt(now)
                } else {
                    Vec::new()
                }
            },
        }
    }

    /// Gate an outbound frame on the session being connected.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::NotConnected` unless connected
    pub fn outbound(&mut self, frame: Frame, now: I) -> Result<ConnectionAction, ConnectionError> {
        if self.status != ConnectionStatus::Connected {
            return Err(ConnectionError::NotConnected { status: self.status });
        }

        self.last_sent = now;
        Ok(ConnectionAction::SendFrame(frame))
    }

    /// Stop the session and cancel any pending reconnect.
    ///
    /// Idempotent. When connected, sends `DISCONNECT` before closing.
    pub fn deactivate(&mut self, _now: I) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();

        if self.status == ConnectionStatus::Connected {
            let receipt = format!("disconnect-{}", self.attempts);
            actions.push(ConnectionAction::SendFrame(Frame::disconnect(Some(&receipt))));
        }

        if self.socket_open || self.status == ConnectionStatus::Connecting {
            let reason = "client deactivated".to_string();
            actions.push(ConnectionAction::CloseSocket { reason });
        }

        if self.active {
            info!("deactivating connection");
        }

        self.active = false;
        self.socket_open = false;
        self.retry_from = None;
        self.attempt_started = None;
        actions.extend(self.set_status(ConnectionStatus::Disconnected));
        actions
    }

    fn begin_attempt(&mut self, now: I) -> Vec<ConnectionAction> {
        self.attempts += 1;
        self.retry_from = None;
        self.attempt_started = Some(now);
        self.socket_open = false;

        let mut actions: Vec<_> =
            self.set_status(ConnectionStatus::Connecting).into_iter().collect();
        actions.push(ConnectionAction::OpenSocket);
        actions
    }

    /// Drop the live attempt or session and schedule a retry if still active.
    fn fail(&mut self, now: I, status: ConnectionStatus, reason: String) -> Vec<ConnectionAction> {
        let mut actions = vec![ConnectionAction::CloseSocket { reason }];

        self.socket_open = false;
        self.attempt_started = None;
        self.negotiated = HeartBeat::DISABLED;
        self.session = None;
        self.retry_from = if self.active { Some(now) } else { None };

        actions.extend(self.set_status(status));
        actions
    }

    fn set_status(&mut self, status: ConnectionStatus) -> Option<ConnectionAction> {
        if self.status == status {
            return None;
        }

        debug!(from = ?self.status, to = ?status, "connection status");
        self.status = status;
        Some(ConnectionAction::StatusChanged(status))
    }
}

fn broker_error(frame: &Frame) -> (String, String) {
    let message = frame.header("message").unwrap_or("broker error").to_string();
    let detail = String::from_utf8_lossy(&frame.body).into_owned();
    (message, detail)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn connected_frame(heart_beat: &str) -> Frame {
        Frame::new(Command::Connected)
            .with_header("version", "1.2")
            .with_header("heart-beat", heart_beat)
            .with_header("session", "sess-1")
    }

    fn connected(t0: Instant) -> Connection {
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        conn.activate(t0);
        conn.socket_opened(t0).unwrap();
        conn.handle_frame(connected_frame("4000,4000"), t0).unwrap();
        conn
    }

    #[test]
    fn connection_lifecycle() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        assert_eq!(conn.status(), ConnectionStatus::Disconnected);

        let actions = conn.activate(t0);
        assert_eq!(actions, vec![
            ConnectionAction::StatusChanged(ConnectionStatus::Connecting),
            ConnectionAction::OpenSocket,
        ]);

        let actions = conn.socket_opened(t0).unwrap();
        let ConnectionAction::SendFrame(connect) = &actions[0] else {
            panic!("expected CONNECT, got {actions:?}");
        };
        assert_eq!(connect.command, Command::Connect);
        assert_eq!(connect.header("accept-version"), Some("1.2"));
        assert_eq!(connect.header("heart-beat"), Some("4000,4000"));

        let actions = conn.handle_frame(connected_frame("4000,4000"), t0).unwrap();
        assert_eq!(actions, vec![ConnectionAction::StatusChanged(ConnectionStatus::Connected)]);
        assert_eq!(conn.session(), Some("sess-1"));
        assert_eq!(conn.heart_beat().outgoing, Duration::from_secs(4));

        let actions = conn.deactivate(t0);
        assert!(matches!(
            &actions[0],
            ConnectionAction::SendFrame(f) if f.command == Command::Disconnect
        ));
        assert!(matches!(actions[1], ConnectionAction::CloseSocket { .. }));
        assert_eq!(actions[2], ConnectionAction::StatusChanged(ConnectionStatus::Disconnected));
        assert!(!conn.is_active());
    }

    #[test]
    fn authorization_header_forwarded() {
        let t0 = Instant::now();
        let config = ConnectionConfig {
            authorization: Some("Bearer token".to_string()),
            ..ConnectionConfig::default()
        };
        let mut conn = Connection::new(t0, config);
        conn.activate(t0);

        let actions = conn.socket_opened(t0).unwrap();
        let ConnectionAction::SendFrame(connect) = &actions[0] else { panic!() };
        assert_eq!(connect.header("Authorization"), Some("Bearer token"));
    }

    #[test]
    fn activate_is_idempotent() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        conn.activate(t0);
        assert!(conn.activate(t0).is_empty());

        let mut conn = connected(t0);
        assert!(conn.activate(t0).is_empty());
        assert_eq!(conn.attempts(), 1);
    }

    #[test]
    fn socket_opened_requires_attempt() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        assert!(matches!(conn.socket_opened(t0), Err(ConnectionError::InvalidState { .. })));
    }

    #[test]
    fn outbound_gated_on_connected() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        let frame = Frame::send("/app/chat/1/1", "{}");

        assert_eq!(
            conn.outbound(frame.clone(), t0),
            Err(ConnectionError::NotConnected { status: ConnectionStatus::Disconnected })
        );

        conn.activate(t0);
        assert!(conn.outbound(frame.clone(), t0).is_err());

        let mut conn = connected(t0);
        assert_eq!(conn.outbound(frame.clone(), t0), Ok(ConnectionAction::SendFrame(frame)));
    }

    #[test]
    fn message_delivered_only_when_connected() {
        let t0 = Instant::now();
        let message = Frame::new(Command::Message).with_header("subscription", "sub-0");

        let mut conn = Connection::new(t0, ConnectionConfig::default());
        assert!(matches!(
            conn.handle_frame(message.clone(), t0),
            Err(ConnectionError::UnexpectedFrame { .. })
        ));

        let mut conn = connected(t0);
        let actions = conn.handle_frame(message.clone(), t0).unwrap();
        assert_eq!(actions, vec![ConnectionAction::Deliver(message)]);
    }

    #[test]
    fn handshake_error_schedules_retry() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        conn.activate(t0);
        conn.socket_opened(t0).unwrap();

        let error = Frame::new(Command::Error)
            .with_header("message", "bad credentials")
            .with_body("denied");
        let actions = conn.handle_frame(error, t0).unwrap();

        assert_eq!(actions[0], ConnectionAction::BrokerError {
            message: "bad credentials".to_string(),
            detail: "denied".to_string(),
        });
        assert!(matches!(actions[1], ConnectionAction::CloseSocket { .. }));
        assert_eq!(actions[2], ConnectionAction::StatusChanged(ConnectionStatus::Error));

        // Our own close comes back from the driver.
        assert!(conn.socket_closed(t0, "closed").is_empty());

        assert!(conn.tick(t0 + Duration::from_secs(4)).is_empty());
        let actions = conn.tick(t0 + Duration::from_secs(5));
        assert_eq!(actions, vec![
            ConnectionAction::StatusChanged(ConnectionStatus::Connecting),
            ConnectionAction::OpenSocket,
        ]);
        assert_eq!(conn.attempts(), 2);
    }

    #[test]
    fn broker_error_while_connected_keeps_session() {
        let t0 = Instant::now();
        let mut conn = connected(t0);

        let actions = conn.handle_frame(Frame::new(Command::Error), t0).unwrap();
        assert_eq!(actions, vec![ConnectionAction::BrokerError {
            message: "broker error".to_string(),
            detail: String::new(),
        }]);
        assert_eq!(conn.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn lost_connection_reconnects_after_delay() {
        let t0 = Instant::now();
        let mut conn = connected(t0);

        let actions = conn.socket_closed(t0, "reset");
        assert_eq!(actions, vec![ConnectionAction::StatusChanged(ConnectionStatus::Disconnected)]);

        let actions = conn.tick(t0 + DEFAULT_RECONNECT_DELAY);
        assert!(actions.contains(&ConnectionAction::OpenSocket));
    }

    #[test]
    fn failed_open_becomes_error() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        conn.activate(t0);

        let actions = conn.socket_closed(t0, "refused");
        assert_eq!(actions, vec![ConnectionAction::StatusChanged(ConnectionStatus::Error)]);
    }

    #[test]
    fn heartbeats_sent_on_interval() {
        let t0 = Instant::now();
        let mut conn = connected(t0);

        assert!(conn.tick(t0 + Duration::from_secs(3)).is_empty());
        conn.heartbeat_received(t0 + Duration::from_secs(3));
        assert_eq!(conn.tick(t0 + Duration::from_secs(4)), vec![ConnectionAction::SendHeartBeat]);
        assert!(conn.tick(t0 + Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn silent_broker_detected() {
        let t0 = Instant::now();
        let mut conn = connected(t0);

        // Within the grace period the only traffic is our own heart-beat.
        assert_eq!(conn.tick(t0 + Duration::from_secs(8)), vec![ConnectionAction::SendHeartBeat]);

        let actions = conn.tick(t0 + Duration::from_millis(8001));
        assert!(matches!(actions[0], ConnectionAction::CloseSocket { .. }));
        assert_eq!(actions[1], ConnectionAction::StatusChanged(ConnectionStatus::Disconnected));
    }

    #[test]
    fn heartbeats_disabled_when_broker_declines() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        conn.activate(t0);
        conn.socket_opened(t0).unwrap();
        conn.handle_frame(connected_frame("0,0"), t0).unwrap();

        assert!(conn.tick(t0 + Duration::from_secs(60)).is_empty());
        assert_eq!(conn.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn handshake_timeout() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        conn.activate(t0);
        conn.socket_opened(t0).unwrap();

        assert!(conn.tick(t0 + Duration::from_secs(29)).is_empty());
        let actions = conn.tick(t0 + DEFAULT_HANDSHAKE_TIMEOUT);
        assert!(matches!(
            &actions[0],
            ConnectionAction::CloseSocket { reason } if reason.contains("handshake timeout")
        ));
        assert_eq!(conn.status(), ConnectionStatus::Error);
    }

    #[test]
    fn deactivate_cancels_reconnect() {
        let t0 = Instant::now();
        let mut conn = connected(t0);
        conn.socket_closed(t0, "reset");

        conn.deactivate(t0);
        assert!(conn.tick(t0 + Duration::from_secs(60)).is_empty());
        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn deactivate_is_idempotent() {
        let t0 = Instant::now();
        let mut conn = connected(t0);

        assert!(!conn.deactivate(t0).is_empty());
        assert!(conn.deactivate(t0).is_empty());
    }

    #[test]
    fn deactivate_while_connecting_closes_socket() {
        let t0 = Instant::now();
        let mut conn = Connection::new(t0, ConnectionConfig::default());
        conn.activate(t0);

        let actions = conn.deactivate(t0);
        assert_eq!(actions, vec![
            ConnectionAction::CloseSocket { reason: "client deactivated".to_string() },
            ConnectionAction::StatusChanged(ConnectionStatus::Disconnected),
        ]);
    }
}
