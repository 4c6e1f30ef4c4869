//! Chat messages as stored in the session log.

use chatsync_proto::{ChatPayload, MessageId, UserId};

/// One entry of the room's message log.
///
/// `is_sent_by_me` is derived locally from `user_id` and never taken from the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Server id. `None` while the message only exists optimistically.
    pub id: Option<MessageId>,
    /// Author
    pub user_id: UserId,
    /// Author nickname at send time
    pub user_nickname: String,
    /// Text body, changed only by edits
    pub content: String,
    /// ISO-8601 creation instant
    pub timestamp: String,
    /// `content` references an image
    pub is_image: bool,
    /// Authored by the local session's user
    pub is_sent_by_me: bool,
}

impl ChatMessage {
    /// Build a log entry from a wire payload, attributing it against
    /// `local_user`.
    ///
    /// Returns `None` when the payload names no author.
    pub fn from_payload(payload: ChatPayload, local_user: &UserId) -> Option<Self> {
        let user_id = payload.user_id?;
        let is_sent_by_me = &user_id == local_user;

        Some(Self {
            id: payload.id,
            user_id,
            user_nickname: payload.user_nickname,
            content: payload.content,
            timestamp: payload.timestamp,
            is_image: payload.is_image,
            is_sent_by_me,
        })
    }

    /// Optimistic entry for a message the local user is sending.
    pub fn outgoing(
        user_id: UserId,
        user_nickname: impl Into<String>,
        content: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id,
            user_nickname: user_nickname.into(),
            content: content.into(),
            timestamp: timestamp.into(),
            is_image: false,
            is_sent_by_me: true,
        }
    }

    /// Wire form of this message. `is_sent_by_me` is not transmitted.
    pub fn to_payload(&self) -> ChatPayload {
        ChatPayload {
            id: self.id.clone(),
            user_id: Some(self.user_id.clone()),
            user_nickname: self.user_nickname.clone(),
            content: self.content.clone(),
            timestamp: self.timestamp.clone(),
            is_image: self.is_image,
            ..ChatPayload::default()
        }
    }

    /// Still waiting for a server id.
    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribution_is_recomputed() {
        let me = UserId::from("42");

        let mut payload =
            ChatPayload::create(UserId::from("7"), "peer", "hi", "2024-05-01T10:00:00Z");
        let peer = ChatMessage::from_payload(payload.clone(), &me);
        assert_eq!(peer.map(|m| m.is_sent_by_me), Some(false));

        payload.user_id = Some(me.clone());
        let mine = ChatMessage::from_payload(payload, &me);
        assert_eq!(mine.map(|m| m.is_sent_by_me), Some(true));
    }

    #[test]
    fn anonymous_payload_rejected() {
        let payload = ChatPayload { content: "x".to_string(), ..ChatPayload::default() };
        assert_eq!(ChatMessage::from_payload(payload, &UserId::from("1")), None);
    }

    #[test]
    fn outgoing_is_pending_and_mine() {
        let msg = ChatMessage::outgoing(UserId::from("42"), "me", "hi", "2024-05-01T10:00:00.000Z");
        assert!(msg.is_pending());
        assert!(msg.is_sent_by_me);

        let payload = msg.to_payload();
        assert_eq!(payload.user_id, Some(UserId::from("42")));
        assert_eq!(payload.id, None);
    }
}
