use serde::{Deserialize, Deserializer, Serialize};

use super::{MessageId, UserId};
use crate::errors::Result;

/// Kind of chat frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    /// A new message
    #[default]
    Create,
    /// An edit of an existing message, targeted by `messageId`
    Update,
}

impl MessageType {
    fn is_create(&self) -> bool {
        *self == Self::Create
    }
}

/// Body of a chat `SEND` or `MESSAGE` frame.
///
/// Encodes with camelCase field names. Decoding also accepts the snake_case
/// names used by the history endpoint, tolerates `null` for every field, and
/// ignores unknown fields. In particular an `isSentByMe` flag sent by a peer
/// is discarded here and recomputed by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    /// Server-assigned id. Absent on a client's own publication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,

    /// Author. Edits relayed by the server may omit it.
    #[serde(default, alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// Author display name at send time
    #[serde(default, alias = "user_nickname", deserialize_with = "null_as_default")]
    pub user_nickname: String,

    /// Message text, or the replacement text for an edit
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    /// ISO-8601 creation instant
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,

    /// Frame kind, `CREATE` when absent
    #[serde(
        rename = "type",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "MessageType::is_create"
    )]
    pub message_type: MessageType,

    /// Edit target, only meaningful for [`MessageType::Update`]
    #[serde(default, alias = "message_id", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,

    /// Whether `content` is an image reference rather than text
    #[serde(default, alias = "is_image", deserialize_with = "null_as_default")]
    pub is_image: bool,
}

impl ChatPayload {
    /// A new text message authored by `user_id`.
    pub fn create(
        user_id: UserId,
        user_nickname: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            user_nickname: user_nickname.into(),
            content: content.into(),
            timestamp: timestamp.into(),
            ..Self::default()
        }
    }

    /// An edit replacing the content of `target`.
    pub fn update(target: MessageId, content: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Update,
            message_id: Some(target),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Attach the server-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Parse a frame body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Serialize into a frame body.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
