//! WebSocket transport for the client.
//!
//! Provides [`ConnectedSocket`], which carries STOMP frames over a WebSocket.
//! This is a thin layer that just sends and receives frames. Protocol logic
//! remains in the Sans-IO [`crate::Client`].

use std::time::Duration;

use chatsync_proto::Frame;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Broker endpoint used when none is configured.
pub const DEFAULT_URL: &str = "ws://localhost:8080/ws-stomp/websocket";

/// How long [`ConnectedSocket::shutdown`] waits for queued frames.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// What the caller sends down the socket.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A complete frame
    Frame(Frame),
    /// A bare EOL heart-beat
    HeartBeat,
}

/// What arrives from the socket.
#[derive(Debug, Clone)]
pub enum Inbound {
    /// A decoded frame
    Frame(Frame),
    /// A bare EOL heart-beat
    HeartBeat,
    /// The socket is gone. Nothing follows.
    Closed {
        /// Why it closed
        reason: String,
    },
}

/// Handle to an open broker socket.
///
/// Frames are sent and received via the channels while an internal task
/// handles the WebSocket I/O. Once every sender is dropped the task writes
/// out what is still queued and closes the WebSocket.
pub struct ConnectedSocket {
    /// Send to the broker.
    pub to_server: mpsc::Sender<Outbound>,
    /// Receive from the broker.
    pub from_server: mpsc::Receiver<Inbound>,
    /// The socket task.
    task: JoinHandle<()>,
}

impl ConnectedSocket {
    /// Close the socket after every queued frame is written.
    ///
    /// Gives up after a short bound and aborts the task instead. Returns
    /// whether the queue was flushed.
    pub async fn shutdown(self) -> bool {
        let Self { to_server, from_server, mut task } = self;
        drop(to_server);

        // Inbound traffic is still accepted until the task ends
        let flushed = tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut task).await.is_ok();
        if !flushed {
            warn!(timeout = ?SHUTDOWN_TIMEOUT, "socket did not close in time");
            task.abort();
        }
        drop(from_server);
        flushed
    }

    /// Stop the socket task at once. Queued frames are lost and no
    /// [`Inbound::Closed`] is reported.
    pub fn stop(&self) {
        self.task.abort();
    }
}

/// Open a WebSocket to the broker at `url`.
pub async fn connect(url: &str) -> Result<ConnectedSocket, TransportError> {
    let (ws, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(format!("{url}: {e}")))?;

    debug!(%url, "websocket open");

    let (to_server_tx, to_server_rx) = mpsc::channel::<Outbound>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<Inbound>(32);

    let task = tokio::spawn(run_socket(ws, to_server_rx, from_server_tx));

    Ok(ConnectedSocket { to_server: to_server_tx, from_server: from_server_rx, task })
}

type WebSocket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Bridge between the channels and the socket until either side ends.
async fn run_socket(
    ws: WebSocket,
    mut to_server: mpsc::Receiver<Outbound>,
    from_server: mpsc::Sender<Inbound>,
) {
    let (mut sink, mut stream) = ws.split();

    let reason = loop {
        tokio::select! {
            outbound = to_server.recv() => {
                let Some(outbound) = outbound else {
                    debug!("closing websocket");
                    let _ = sink.close().await;
                    return;
                };

                let message = match encode(&outbound) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(%e, "dropping unencodable frame");
                        continue;
                    },
                };

                if let Err(e) = sink.send(message).await {
                    break TransportError::Stream(format!("write failed: {e}")).to_string();
                }
            },

            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if !forward(text.as_bytes(), &from_server).await {
                        return;
                    }
                },
                Some(Ok(Message::Binary(data))) => {
                    if !forward(&data, &from_server).await {
                        return;
                    }
                },
                Some(Ok(Message::Close(close))) => {
                    break close.map_or_else(
                        || "closed by broker".to_string(),
                        |c| format!("closed by broker: {} {}", c.code, c.reason),
                    );
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    break TransportError::Stream(format!("read failed: {e}")).to_string();
                },
                None => break "stream ended".to_string(),
            },
        }
    };

    debug!(%reason, "websocket closed");
    let _ = from_server.send(Inbound::Closed { reason }).await;
}

fn encode(outbound: &Outbound) -> Result<Message, TransportError> {
    match outbound {
        Outbound::HeartBeat => Ok(Message::Text("\n".into())),
        Outbound::Frame(frame) => {
            let bytes = frame.to_bytes().map_err(|e| TransportError::Protocol(e.to_string()))?;
            match String::from_utf8(bytes.to_vec()) {
                Ok(text) => Ok(Message::Text(text.into())),
                Err(e) => Ok(Message::Binary(e.into_bytes().into())),
            }
        },
    }
}

/// Decode one socket message and pass it on. Returns false once the
/// receiver is gone.
async fn forward(data: &[u8], from_server: &mpsc::Sender<Inbound>) -> bool {
    let inbound = match Frame::decode(data) {
        Ok(Some(frame)) => Inbound::Frame(frame),
        Ok(None) => Inbound::HeartBeat,
        Err(e) => {
            warn!(%e, "skipping undecodable frame");
            return true;
        },
    };

    from_server.send(inbound).await.is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use chatsync_proto::{Command, HeartBeat};

    use super::*;

    #[test]
    fn heart_beat_is_bare_eol() {
        let Message::Text(text) = encode(&Outbound::HeartBeat).unwrap() else {
            panic!("heart-beat must be a text message");
        };
        assert_eq!(text.as_str(), "\n");
    }

    #[test]
    fn frames_travel_as_text() {
        let frame = Frame::connect("localhost", HeartBeat::DISABLED, None);
        let Message::Text(text) = encode(&Outbound::Frame(frame)).unwrap() else {
            panic!("utf-8 frame must be a text message");
        };

        assert!(text.as_str().starts_with("CONNECT\n"));
        assert!(text.as_str().ends_with('\0'));
    }

    /// Accept one WebSocket on `listener` and collect the commands of every
    /// frame until the client closes.
    async fn collect_commands(listener: tokio::net::TcpListener) -> Vec<Command> {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let mut commands = Vec::new();
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => {
                    if let Ok(Some(frame)) = Frame::decode(text.as_bytes()) {
                        commands.push(frame.command);
                    }
                },
                Message::Close(_) => break,
                _ => {},
            }
        }
        commands
    }

    #[tokio::test]
    async fn shutdown_writes_queued_frames_first() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let broker = tokio::spawn(collect_commands(listener));

        let socket = connect(&url).await.unwrap();
        let unsubscribe = Outbound::Frame(Frame::unsubscribe("sub-0"));
        socket.to_server.send(unsubscribe).await.unwrap();
        let disconnect = Outbound::Frame(Frame::disconnect(Some("d-1")));
        socket.to_server.send(disconnect).await.unwrap();

        assert!(socket.shutdown().await);
        assert_eq!(broker.await.unwrap(), vec![Command::Unsubscribe, Command::Disconnect]);
    }

    #[tokio::test]
    async fn forward_decodes_frames_and_heart_beats() {
        let (tx, mut rx) = mpsc::channel(4);

        assert!(forward(b"\n", &tx).await);
        assert!(forward(b"RECEIPT\nreceipt-id:7\n\n\0", &tx).await);
        assert!(forward(b"NOT A FRAME\n\n\0", &tx).await);

        assert!(matches!(rx.recv().await, Some(Inbound::HeartBeat)));
        let Some(Inbound::Frame(frame)) = rx.recv().await else {
            panic!("expected a frame");
        };
        assert_eq!(frame.command, Command::Receipt);
        assert!(rx.try_recv().is_err());
    }
}
