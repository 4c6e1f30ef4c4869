//! Broker destination naming for a chat room.

use std::fmt;

/// Identifies one chat room: the lost-item article it belongs to and the room
/// within that article.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomAddress {
    /// Article the room hangs off
    pub article_id: String,
    /// Room within the article
    pub chat_room_id: String,
}

impl RoomAddress {
    /// Broker-side topic prefix subscribers listen on.
    pub const TOPIC_PREFIX: &'static str = "/topic/chat";

    /// Application-side prefix clients publish to.
    pub const APP_PREFIX: &'static str = "/app/chat";

    /// Address of room `chat_room_id` under `article_id`.
    pub fn new(article_id: impl Into<String>, chat_room_id: impl Into<String>) -> Self {
        Self { article_id: article_id.into(), chat_room_id: chat_room_id.into() }
    }

    /// Topic to `SUBSCRIBE` to for room traffic.
    pub fn topic(&self) -> String {
        format!("{}/{}/{}", Self::TOPIC_PREFIX, self.article_id, self.chat_room_id)
    }

    /// Destination to `SEND` new messages to.
    pub fn publish_destination(&self) -> String {
        format!("{}/{}/{}", Self::APP_PREFIX, self.article_id, self.chat_room_id)
    }
}

impl fmt::Display for RoomAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.article_id, self.chat_room_id)
    }
}
