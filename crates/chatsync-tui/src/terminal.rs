//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. The broker socket is a
//! WebSocket run by [`chatsync_client::transport`].

use std::{
    io::{self, Stdout, stdout},
    time::{Duration, Instant},
};

use chatsync_app::{App, AppEvent, Driver, KeyInput, SocketEvent};
use chatsync_client::transport::{self, ConnectedSocket, Inbound, Outbound, TransportError};
use chatsync_proto::Frame;
use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

use crate::ui;

/// How long to wait for a key before ticking. Socket traffic is drained
/// between polls, so this also bounds delivery latency.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No socket is open.
    #[error("socket not open")]
    NotConnected,

    /// Socket task is gone.
    #[error("channel send error")]
    ChannelSend,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui), and the broker
/// WebSocket.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    socket: Option<ConnectedSocket>,
    url: String,
}

impl TerminalDriver {
    /// Enter raw mode and the alternate screen. Sockets go to `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(Self { terminal, event_stream: EventStream::new(), socket: None, url: url.into() })
    }

    fn socket(&self) -> Result<&ConnectedSocket, TerminalError> {
        self.socket.as_ref().ok_or(TerminalError::NotConnected)
    }

    async fn write(&mut self, outbound: Outbound) -> Result<(), TerminalError> {
        let to_server = self.socket()?.to_server.clone();
        to_server.send(outbound).await.map_err(|_| TerminalError::ChannelSend)
    }
}

/// Convert a crossterm key press to `KeyInput`. Ctrl-C leaves like Esc.
pub fn convert_key(key: KeyEvent) -> Option<KeyInput> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(KeyInput::Esc);
    }

    match key.code {
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Delete => Some(KeyInput::Delete),
        KeyCode::Esc => Some(KeyInput::Esc),
        KeyCode::Left => Some(KeyInput::Left),
        KeyCode::Right => Some(KeyInput::Right),
        KeyCode::Up => Some(KeyInput::Up),
        KeyCode::Down => Some(KeyInput::Down),
        KeyCode::Home => Some(KeyInput::Home),
        KeyCode::End => Some(KeyInput::End),
        _ => None,
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<AppEvent>, Self::Error> {
        tokio::select! {
            biased;

            maybe_event = self.event_stream.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    Ok(convert_key(key).map(AppEvent::Key))
                },
                Some(Ok(Event::Resize(cols, rows))) => Ok(Some(AppEvent::Resize(cols, rows))),
                Some(Err(e)) => Err(TerminalError::Io(e)),
                _ => Ok(None),
            },

            () = tokio::time::sleep(POLL_INTERVAL) => Ok(Some(AppEvent::Tick)),
        }
    }

    async fn open(&mut self) -> Result<(), Self::Error> {
        self.close().await;
        self.socket = Some(transport::connect(&self.url).await?);
        Ok(())
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), Self::Error> {
        self.write(Outbound::Frame(frame)).await
    }

    async fn send_heartbeat(&mut self) -> Result<(), Self::Error> {
        self.write(Outbound::HeartBeat).await
    }

    async fn recv(&mut self) -> Option<SocketEvent> {
        let socket = self.socket.as_mut()?;

        let event = match socket.from_server.try_recv() {
            Ok(Inbound::Frame(frame)) => SocketEvent::Frame(frame),
            Ok(Inbound::HeartBeat) => SocketEvent::HeartBeat,
            Ok(Inbound::Closed { reason }) => {
                self.socket = None;
                SocketEvent::Closed { reason }
            },
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                self.socket = None;
                SocketEvent::Closed { reason: "socket task ended".to_string() }
            },
        };
        Some(event)
    }

    async fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            debug!("closing socket");
            socket.shutdown().await;
        }
    }

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| ui::render(frame, app))?;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.stop();
        }
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_keys_map_through() {
        let plain = |code| convert_key(press(code, KeyModifiers::NONE));

        assert_eq!(plain(KeyCode::Char('q')), Some(KeyInput::Char('q')));
        assert_eq!(plain(KeyCode::Enter), Some(KeyInput::Enter));
        assert_eq!(plain(KeyCode::F(1)), None);
    }

    #[test]
    fn shifted_characters_are_text() {
        let key = press(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(convert_key(key), Some(KeyInput::Char('A')));
    }

    #[test]
    fn ctrl_c_leaves_and_other_chords_are_ignored() {
        let ctrl = |c| convert_key(press(KeyCode::Char(c), KeyModifiers::CONTROL));

        assert_eq!(ctrl('c'), Some(KeyInput::Esc));
        assert_eq!(ctrl('x'), None);
    }
}
