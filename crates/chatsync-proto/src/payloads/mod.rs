//! JSON bodies carried in chat `SEND` and `MESSAGE` frames.
//!
//! Identifiers arrive as JSON strings from some server builds and as integers
//! from others (the history endpoint serializes database keys). Both forms
//! are normalized into string newtypes so comparisons are by textual value.

mod chat;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use chat::{ChatPayload, MessageType};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Signed(n) => n.to_string(),
            RawId::Unsigned(n) => n.to_string(),
        }
    }
}

/// Serialize a textual id, preferring a JSON integer when the text is the
/// canonical rendering of one.
fn serialize_id<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match value.parse::<i64>() {
        Ok(n) if n.to_string() == value => serializer.serialize_i64(n),
        _ => serializer.serialize_str(value),
    }
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Wrap a textual identifier.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Textual form.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value.to_string())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serialize_id(&self.0, serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into()))
            }
        }
    };
}

id_type!(
    /// Author identifier, scoped to a room.
    UserId
);

id_type!(
    /// Server-assigned message identifier.
    MessageId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_strings_and_integers() {
        let a: UserId = serde_json::from_str("42").unwrap();
        let b: UserId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "42");

        let neg: MessageId = serde_json::from_str("-3").unwrap();
        assert_eq!(neg.as_str(), "-3");

        assert!(serde_json::from_str::<UserId>("1.5").is_err());
        assert!(serde_json::from_str::<UserId>("null").is_err());
    }

    #[test]
    fn numeric_ids_serialize_as_integers() {
        assert_eq!(serde_json::to_string(&UserId::from(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&UserId::from("007")).unwrap(), "\"007\"");
        assert_eq!(serde_json::to_string(&MessageId::from("m-1")).unwrap(), "\"m-1\"");
    }
}
