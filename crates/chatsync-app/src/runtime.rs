//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Session bridge to the room client
//! - [`Driver`]: Platform-specific I/O

use std::{ops::Sub, time::Duration};

use chatsync_client::{ChatPayload, Environment, SessionConfig};
use tracing::warn;

use crate::{App, AppAction, AppEvent, Bridge, Driver, Outgoing, SocketEvent};

/// Socket events drained per cycle, so input stays responsive under load.
const MAX_SOCKET_EVENTS_PER_CYCLE: usize = 64;

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and timestamps
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
    D::Instant: Sub<Output = Duration>,
{
    /// Create a new runtime for the room described by `config`.
    pub fn new(driver: D, env: E, config: SessionConfig) -> Self {
        let app = App::new(config.room.to_string());
        let bridge = Bridge::new(env, config);
        Self { driver, app, bridge }
    }

    /// Create a runtime from parts.
    pub fn from_parts(driver: D, app: App, bridge: Bridge<E>) -> Self {
        Self { driver, app, bridge }
    }

    /// Seed the log with history loaded before connecting.
    pub fn seed_history(&mut self, history: Vec<ChatPayload>) {
        for event in self.bridge.seed_history(history) {
            // Rendering happens once the loop starts
            let _ = self.app.handle(event);
        }
    }

    /// Run the main event loop until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an input or rendering error.
    /// Socket failures are reported to the session, not returned.
    pub async fn run(mut self) -> Result<(), D::Error> {
        let result = self.run_loop().await;
        self.driver.stop();
        result
    }

    async fn run_loop(&mut self) -> Result<(), D::Error> {
        if self.start().await? {
            return Ok(());
        }

        while !self.step().await? {}
        Ok(())
    }

    /// Render the initial state and activate the session.
    ///
    /// Returns `true` if the application should quit.
    pub async fn start(&mut self) -> Result<bool, D::Error> {
        self.driver.render(&self.app)?;

        let mut events = self.bridge.activate();
        events.extend(self.flush_outgoing().await);
        self.process_bridge_events(events).await
    }

    /// Process one cycle of the event loop:
    /// 1. Polls for an input event from the driver
    /// 2. Drains pending socket events into the session
    /// 3. Ticks the session
    ///
    /// Returns `true` if the application should quit.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        if let Some(event) = self.driver.poll_event().await? {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }

        for _ in 0..MAX_SOCKET_EVENTS_PER_CYCLE {
            let Some(socket_event) = self.driver.recv().await else {
                break;
            };

            let mut events = match socket_event {
                SocketEvent::Frame(frame) => self.bridge.handle_frame(frame),
                SocketEvent::HeartBeat => self.bridge.heartbeat_received(),
                SocketEvent::Closed { reason } => self.bridge.socket_closed(reason),
            };
            events.extend(self.flush_outgoing().await);

            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        let now = self.driver.now();
        let mut events = self.bridge.handle_tick(now);
        events.extend(self.flush_outgoing().await);
        self.process_bridge_events(events).await
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),

                    // Session operations go through the bridge
                    AppAction::SendMessage { .. } | AppAction::ExitRoom => {
                        let mut events = self.bridge.process_app_action(action);
                        events.extend(self.flush_outgoing().await);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }
        Ok(false)
    }

    /// Process events from Bridge back to App.
    async fn process_bridge_events(&mut self, events: Vec<AppEvent>) -> Result<bool, D::Error> {
        let mut actions = Vec::new();
        for event in events {
            actions.extend(self.app.handle(event));
        }
        self.process_actions(actions).await
    }

    /// Perform all pending socket work. Socket failures become session events.
    async fn flush_outgoing(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();

        loop {
            let work = self.bridge.take_outgoing();
            if work.is_empty() {
                break;
            }

            for outgoing in work {
                let failure = match outgoing {
                    Outgoing::Open => match self.driver.open().await {
                        Ok(()) => {
                            events.extend(self.bridge.socket_opened());
                            None
                        },
                        Err(e) => Some(e.to_string()),
                    },
                    Outgoing::Frame(frame) => {
                        self.driver.send_frame(frame).await.err().map(|e| e.to_string())
                    },
                    Outgoing::HeartBeat => {
                        self.driver.send_heartbeat().await.err().map(|e| e.to_string())
                    },
                    Outgoing::Close { .. } => {
                        self.driver.close().await;
                        None
                    },
                };

                if let Some(reason) = failure {
                    warn!(%reason, "socket failure");
                    self.driver.close().await;
                    events.extend(self.bridge.socket_closed(reason));
                }
            }
        }

        events
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
