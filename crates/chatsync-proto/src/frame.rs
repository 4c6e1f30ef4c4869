//! STOMP frame type and text codec.
//!
//! A frame on the wire is:
//!
//! ```text
//! COMMAND EOL
//! *( header EOL )
//! EOL
//! *OCTET
//! NUL
//! ```
//!
//! where EOL is `\n` optionally preceded by `\r`. A message consisting only of
//! EOLs is a heart-beat and decodes to `None`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    command::Command,
    errors::{ProtocolError, Result},
    header::{HeartBeat, escape, unescape},
};

/// A single STOMP frame.
///
/// Headers keep their wire order. When a header name repeats, only the first
/// occurrence is significant (STOMP 1.2 §"Repeated Header Entries");
/// [`Frame::header`] follows that rule.
///
/// # Invariants
///
/// - Size Limit: `body.len()` MUST NOT exceed [`Frame::MAX_BODY_SIZE`].
///   Oversized bodies are rejected by both [`Frame::encode`] and
///   [`Frame::decode`].
/// - `content-length` is owned by the codec. A caller-supplied
///   `content-length` header is ignored on encode and recomputed from the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command
    pub command: Command,
    /// Decoded header entries in wire order
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Bytes,
}

impl Frame {
    /// Largest body accepted in either direction (1 MiB).
    pub const MAX_BODY_SIZE: usize = 1024 * 1024;

    /// Frame with no headers and an empty body.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: Bytes::new() }
    }

    /// Append a header entry.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Value of the first header entry named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Body interpreted as UTF-8.
    pub fn body_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|_| ProtocolError::InvalidPayload("body is not valid UTF-8".to_string()))
    }

    /// `CONNECT` frame opening a session.
    ///
    /// `authorization` is forwarded verbatim as the `Authorization` header
    /// when present.
    pub fn connect(host: &str, heart_beat: HeartBeat, authorization: Option<&str>) -> Self {
        let frame = Self::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", heart_beat.to_header_value());

        match authorization {
            Some(token) => frame.with_header("Authorization", token),
            None => frame,
        }
    }

    /// `SUBSCRIBE` frame for `destination` under subscription `id`.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    /// `UNSUBSCRIBE` frame for subscription `id`.
    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id)
    }

    /// `SEND` frame carrying a JSON body.
    pub fn send(destination: &str, json: impl Into<Bytes>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(json)
    }

    /// `DISCONNECT` frame, optionally requesting a receipt.
    pub fn disconnect(receipt: Option<&str>) -> Self {
        let frame = Self::new(Command::Disconnect);
        match receipt {
            Some(id) => frame.with_header("receipt", id),
            None => frame,
        }
    }

    /// Encode the frame into `dst`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BodyTooLarge` if the body exceeds
    ///   [`Frame::MAX_BODY_SIZE`]
    /// - `ProtocolError::InvalidHeader` if a handshake frame carries a header
    ///   that cannot be represented without escaping
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.body.len() > Self::MAX_BODY_SIZE {
            return Err(ProtocolError::BodyTooLarge {
                size: self.body.len(),
                max: Self::MAX_BODY_SIZE,
            });
        }

        let escaped = self.command.escapes_headers();

        dst.put_slice(self.command.as_str().as_bytes());
        dst.put_u8(b'\n');

        for (name, value) in &self.headers {
            if name == "content-length" {
                continue;
            }

            if escaped {
                dst.put_slice(escape(name).as_bytes());
                dst.put_u8(b':');
                dst.put_slice(escape(value).as_bytes());
            } else {
                if name.contains([':', '\n', '\r']) || value.contains(['\n', '\r']) {
                    return Err(ProtocolError::InvalidHeader(format!(
                        "{name} cannot be sent unescaped in {}",
                        self.command
                    )));
                }
                dst.put_slice(name.as_bytes());
                dst.put_u8(b':');
                dst.put_slice(value.as_bytes());
            }
            dst.put_u8(b'\n');
        }

        if !self.body.is_empty() {
            dst.put_slice(format!("content-length:{}\n", self.body.len()).as_bytes());
        }

        dst.put_u8(b'\n');
        dst.put_slice(&self.body);
        dst.put_u8(0);

        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(64 + self.body.len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode one frame from a complete transport message.
    ///
    /// Returns `Ok(None)` for a heart-beat (a message holding only EOLs).
    /// Trailing EOLs after the NUL terminator are ignored.
    ///
    /// # Errors
    ///
    /// Any structural problem yields a [`ProtocolError`]; the caller should
    /// drop the message.
    pub fn decode(src: &[u8]) -> Result<Option<Self>> {
        let mut cursor = Cursor { buf: src, pos: 0 };

        cursor.skip_eols();
        if cursor.is_empty() {
            return Ok(None);
        }

        let command = Command::parse(cursor.line()?)?;
        let escaped = command.escapes_headers();

        let mut headers: Vec<(String, String)> = Vec::new();
        loop {
            let line = cursor.line()?;
            if line.is_empty() {
                break;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ProtocolError::InvalidHeader(line.to_string()))?;

            let (name, value) = if escaped {
                (unescape(name)?, unescape(value)?)
            } else {
                (name.to_string(), value.to_string())
            };
            headers.push((name, value));
        }

        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .map(|(_, v)| {
                v.trim()
                    .parse::<usize>()
                    .map_err(|_| ProtocolError::InvalidContentLength(v.clone()))
            })
            .transpose()?;

        let rest = cursor.remaining();
        let body_len = match content_length {
            Some(len) => {
                check_body_size(len)?;
                if rest.len() <= len {
                    return Err(ProtocolError::FrameTruncated);
                }
                if rest[len] != 0 {
                    return Err(ProtocolError::MissingTerminator);
                }
                len
            },
            None => {
                let len =
                    rest.iter().position(|b| *b == 0).ok_or(ProtocolError::MissingTerminator)?;
                check_body_size(len)?;
                len
            },
        };

        Ok(Some(Self { command, headers, body: Bytes::copy_from_slice(&rest[..body_len]) }))
    }
}

fn check_body_size(size: usize) -> Result<()> {
    if size > Frame::MAX_BODY_SIZE {
        return Err(ProtocolError::BodyTooLarge { size, max: Frame::MAX_BODY_SIZE });
    }
    Ok(())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    fn skip_eols(&mut self) {
        while let Some(b) = self.buf.get(self.pos) {
            if *b != b'\n' && *b != b'\r' {
                break;
            }
            self.pos += 1;
        }
    }

    /// Next line without its EOL.
    fn line(&mut self) -> Result<&'a str> {
        let rest = self.remaining();
        let end = rest.iter().position(|b| *b == b'\n').ok_or(ProtocolError::FrameTruncated)?;
        self.pos += end + 1;

        let line = match rest[..end].strip_suffix(b"\r") {
            Some(stripped) => stripped,
            None => &rest[..end],
        };
        std::str::from_utf8(line).map_err(|_| ProtocolError::InvalidUtf8)
    }
}
