//! Header value escaping and the `heart-beat` header.

use std::{borrow::Cow, time::Duration};

use crate::errors::{ProtocolError, Result};

/// Escape a header name or value per STOMP 1.2.
pub(crate) fn escape(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\\', '\n', '\r', ':']) {
        return Cow::Borrowed(raw);
    }

    let mut escaped = String::with_capacity(raw.len() + 4);
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            ':' => escaped.push_str("\\c"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Reverse [`escape`]. Undefined escape sequences are a protocol error.
pub(crate) fn unescape(encoded: &str) -> Result<String> {
    if !encoded.contains('\\') {
        return Ok(encoded.to_string());
    }

    let mut out = String::with_capacity(encoded.len());
    let mut chars = encoded.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(ProtocolError::InvalidEscape(encoded.to_string())),
        }
    }
    Ok(out)
}

/// Heart-beat intervals as carried by the `heart-beat` header.
///
/// From the client's point of view `outgoing` is how often we promise to send
/// something and `incoming` is how often we want to hear from the peer. A zero
/// duration means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    /// Interval between frames this side sends.
    pub outgoing: Duration,
    /// Interval between frames this side expects to receive.
    pub incoming: Duration,
}

impl HeartBeat {
    /// No heart-beating in either direction.
    pub const DISABLED: Self = Self { outgoing: Duration::ZERO, incoming: Duration::ZERO };

    /// Create heart-beat settings.
    pub fn new(outgoing: Duration, incoming: Duration) -> Self {
        Self { outgoing, incoming }
    }

    /// Parse a `cx,cy` header value (milliseconds).
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || ProtocolError::InvalidHeartBeat(value.to_string());

        let (out, inc) = value.split_once(',').ok_or_else(invalid)?;
        let out: u64 = out.trim().parse().map_err(|_| invalid())?;
        let inc: u64 = inc.trim().parse().map_err(|_| invalid())?;

        Ok(Self::new(Duration::from_millis(out), Duration::from_millis(inc)))
    }

    /// Render as a `cx,cy` header value.
    pub fn to_header_value(&self) -> String {
        format!("{},{}", self.outgoing.as_millis(), self.incoming.as_millis())
    }

    /// Effective intervals once the client's offer meets the server's reply.
    ///
    /// Each direction is disabled if either side disabled it, otherwise the
    /// slower of the two intervals wins.
    pub fn negotiate(client: Self, server: Self) -> Self {
        let pick = |ours: Duration, theirs: Duration| {
            if ours.is_zero() || theirs.is_zero() { Duration::ZERO } else { ours.max(theirs) }
        };

        Self {
            outgoing: pick(client.outgoing, server.incoming),
            incoming: pick(client.incoming, server.outgoing),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn escape_round_trip() {
        let raw = "a:b\\c\nd\re";
        let escaped = escape(raw);
        assert_eq!(escaped, "a\\cb\\\\c\\nd\\re");
        assert_eq!(unescape(&escaped).unwrap(), raw);
    }

    #[test]
    fn escape_borrows_plain_values() {
        assert!(matches!(escape("/topic/chat/1/2"), Cow::Borrowed(_)));
    }

    #[test]
    fn unescape_rejects_undefined_sequence() {
        assert!(matches!(unescape("bad\\t"), Err(ProtocolError::InvalidEscape(_))));
        assert!(matches!(unescape("trailing\\"), Err(ProtocolError::InvalidEscape(_))));
    }

    #[test]
    fn heart_beat_parse() {
        let hb = HeartBeat::parse("4000,10000").unwrap();
        assert_eq!(hb.outgoing, Duration::from_secs(4));
        assert_eq!(hb.incoming, Duration::from_secs(10));
        assert_eq!(hb.to_header_value(), "4000,10000");

        assert!(HeartBeat::parse("4000").is_err());
        assert!(HeartBeat::parse("a,b").is_err());
    }

    #[test]
    fn negotiate_takes_slower_interval() {
        let client = HeartBeat::new(Duration::from_secs(4), Duration::from_secs(4));
        let server = HeartBeat::new(Duration::from_secs(10), Duration::from_secs(2));

        let agreed = HeartBeat::negotiate(client, server);
        assert_eq!(agreed.outgoing, Duration::from_secs(4));
        assert_eq!(agreed.incoming, Duration::from_secs(10));
    }

    #[test]
    fn negotiate_zero_disables_direction() {
        let client = HeartBeat::new(Duration::from_secs(4), Duration::from_secs(4));
        let server = HeartBeat::new(Duration::ZERO, Duration::from_secs(4));

        let agreed = HeartBeat::negotiate(client, server);
        assert_eq!(agreed.outgoing, Duration::from_secs(4));
        assert_eq!(agreed.incoming, Duration::ZERO);

        assert_eq!(HeartBeat::negotiate(HeartBeat::DISABLED, server), HeartBeat::DISABLED);
    }
}
