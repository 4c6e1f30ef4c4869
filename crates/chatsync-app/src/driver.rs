//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use chatsync_proto::Frame;

use crate::{App, AppEvent};

/// What the driver observed on the broker socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A decoded frame
    Frame(Frame),
    /// A bare EOL heart-beat
    HeartBeat,
    /// The socket is gone
    Closed {
        /// Why it closed
        reason: String,
    },
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal client and in simulation.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, a WebSocket for the broker
/// - **Simulation**: scripted input and an in-memory broker on virtual time
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll for the next input event.
    ///
    /// Returns `None` if no events are ready.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<AppEvent>, Self::Error>> + Send;

    /// Open a socket to the broker.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be opened. The runtime reports it
    /// to the session as a closed socket.
    fn open(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send a frame to the broker.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is closed or the send fails.
    fn send_frame(&mut self, frame: Frame) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Send a bare EOL heart-beat.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is closed or the send fails.
    fn send_heartbeat(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next socket event without waiting.
    ///
    /// Returns `None` if nothing is pending or no socket is open.
    fn recv(&mut self) -> impl Future<Output = Option<SocketEvent>> + Send;

    /// Close the socket, if one is open.
    ///
    /// Frames already handed to [`Driver::send_frame`] reach the broker
    /// before the socket closes.
    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop the connection and clean up resources. Unlike [`Driver::close`]
    /// this does not wait for queued frames.
    fn stop(&mut self);
}
