//! Error types for frame and payload decoding.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire data.
///
/// None of these are fatal to a session: the caller drops the offending frame
/// and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A line was not terminated by an EOL before the input ended
    #[error("frame truncated: expected end of line")]
    FrameTruncated,

    /// Body was not followed by the NUL octet
    #[error("frame is missing its NUL terminator")]
    MissingTerminator,

    /// Command line is not a STOMP command we understand
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Header line without a `:` separator, or an unencodable header
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Backslash followed by something other than `n`, `r`, `c` or `\`
    #[error("invalid escape sequence in header: {0}")]
    InvalidEscape(String),

    /// Command or header bytes are not UTF-8
    #[error("frame headers are not valid UTF-8")]
    InvalidUtf8,

    /// `content-length` is not a decimal integer
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),

    /// Body exceeds [`crate::Frame::MAX_BODY_SIZE`]
    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge {
        /// Actual body size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// `heart-beat` header is not `<ms>,<ms>`
    #[error("invalid heart-beat header: {0}")]
    InvalidHeartBeat(String),

    /// JSON body could not be (de)serialized
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}
