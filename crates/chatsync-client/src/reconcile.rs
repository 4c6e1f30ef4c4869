//! Reconciliation of inbound room traffic with the local log.
//!
//! The broker fans every publication out to all subscribers, the sender
//! included, and the wire carries no acknowledgement channel. The sender's own
//! echo is therefore recognised purely by author identity: a `CREATE` whose
//! author is the local user was already appended optimistically at send time.
//!
//! Precedence for an inbound frame:
//!
//! 1. `UPDATE` patches the target message, whoever authored the edit.
//! 2. A `CREATE` from the local user is a self-echo and is suppressed.
//! 3. Anything else is a new message from a peer and is appended.

use chatsync_proto::{ChatPayload, MessageId, MessageType, UserId};
use tracing::debug;

use crate::{message::ChatMessage, store::SessionStore};

/// Why an inbound frame was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Body is not a chat payload, or a `CREATE` names no author
    Malformed,
    /// `UPDATE` without a `messageId`
    MissingTarget,
}

/// What to do with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// New message from a peer
    Append(ChatMessage),
    /// Edit of an existing message
    Patch {
        /// Target message
        id: MessageId,
        /// Replacement content
        content: String,
    },
    /// Echo of our own optimistic send
    SuppressEcho,
    /// Not applicable to the log
    Drop(DropReason),
}

impl Decision {
    /// Apply to `store`. Returns whether the log changed.
    ///
    /// A patch whose target is not in the log is a silent no-op.
    pub fn apply(self, store: &mut SessionStore) -> bool {
        match self {
            Self::Append(message) => {
                store.append_message(message);
                true
            },
            Self::Patch { id, content } => store.patch_message(&id, content),
            Self::SuppressEcho => false,
            Self::Drop(reason) => {
                debug!(?reason, "dropping inbound frame");
                false
            },
        }
    }
}

/// Decide how a decoded payload affects the log of `local_user`.
pub fn reconcile_inbound(payload: ChatPayload, local_user: &UserId) -> Decision {
    if payload.message_type == MessageType::Update {
        return match payload.message_id {
            Some(id) => Decision::Patch { id, content: payload.content },
            None => Decision::Drop(DropReason::MissingTarget),
        };
    }

    match payload.user_id.as_ref() {
        None => return Decision::Drop(DropReason::Malformed),
        Some(author) if author == local_user => {
            debug!(%author, "suppressing self-echo");
            return Decision::SuppressEcho;
        },
        Some(_) => {},
    }

    match ChatMessage::from_payload(payload, local_user) {
        Some(message) => Decision::Append(message),
        None => Decision::Drop(DropReason::Malformed),
    }
}

/// [`reconcile_inbound`] on a raw frame body.
pub fn decode_inbound(body: &[u8], local_user: &UserId) -> Decision {
    match ChatPayload::from_json(body) {
        Ok(payload) => reconcile_inbound(payload, local_user),
        Err(err) => {
            debug!(%err, "undecodable chat payload");
            Decision::Drop(DropReason::Malformed)
        },
    }
}
