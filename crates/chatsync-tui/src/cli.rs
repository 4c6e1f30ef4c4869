//! Command-line arguments.
//!
//! The flags mirror the login form of the browser test page: where the broker
//! lives, which room to join and who the local user is.

use std::{fs, io, path::PathBuf};

use chatsync_client::{
    ChatPayload, ConnectionMode, RoomAddress, SessionConfig, UserId, transport::DEFAULT_URL,
};
use clap::Parser;
use thiserror::Error;

/// Errors preparing a session from the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// Unknown `--mode` value.
    #[error("unknown connection mode {0:?} (expected stomp or socketio)")]
    Mode(String),

    /// History file could not be read.
    #[error("cannot read history {path}: {source}")]
    HistoryIo {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// History file is not a JSON array of messages.
    #[error("invalid history {path}: {source}")]
    HistoryJson {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Chatsync terminal client
#[derive(Parser, Debug, Clone)]
#[command(name = "chatsync")]
#[command(about = "Join a realtime chat room from the terminal")]
#[command(version)]
pub struct Args {
    /// Broker WebSocket endpoint
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Article the room belongs to
    #[arg(short, long)]
    pub article: String,

    /// Chat room id within the article
    #[arg(short, long)]
    pub room: String,

    /// Local user id
    #[arg(short, long)]
    pub user: String,

    /// Nickname stamped on outgoing messages
    #[arg(short, long)]
    pub nickname: String,

    /// Credential sent as the Authorization connect header
    #[arg(short, long)]
    pub token: Option<String>,

    /// Realtime transport: stomp or socketio
    #[arg(short, long, default_value = "stomp")]
    pub mode: String,

    /// JSON array of earlier messages to show before connecting
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Log file. The terminal is in raw mode, so logs never go to stderr.
    #[arg(long, default_value = "chatsync.log")]
    pub log_file: PathBuf,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Session configuration for the room visit.
    pub fn session_config(&self) -> Result<SessionConfig, CliError> {
        let mode =
            ConnectionMode::parse(&self.mode).ok_or_else(|| CliError::Mode(self.mode.clone()))?;
        let room = RoomAddress::new(self.article.as_str(), self.room.as_str());

        let mut config = SessionConfig::new(room, UserId::from(self.user.as_str()), &self.nickname)
            .with_mode(mode);
        if let Some(token) = &self.token {
            config = config.with_auth_token(token.as_str());
        }
        Ok(config)
    }

    /// Messages from `--history`, oldest first. Empty without the flag.
    pub fn load_history(&self) -> Result<Vec<ChatPayload>, CliError> {
        let Some(path) = &self.history else {
            return Ok(Vec::new());
        };

        let json = fs::read_to_string(path)
            .map_err(|source| CliError::HistoryIo { path: path.clone(), source })?;
        parse_history(&json).map_err(|source| CliError::HistoryJson { path: path.clone(), source })
    }
}

/// Parse a history document as the room endpoint returns it.
pub fn parse_history(json: &str) -> Result<Vec<ChatPayload>, serde_json::Error> {
    serde_json::from_str(json)
}
