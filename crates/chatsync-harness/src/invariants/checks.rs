//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{HashMap, HashSet};

use chatsync_client::{ConnectionStatus, MessageId};

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// A server id appears at most once in a client's log.
///
/// Duplicates mean a self-echo or a redelivery was appended twice.
pub struct UniqueServerIds;

impl Invariant for UniqueServerIds {
    fn name(&self) -> &'static str {
        "unique_server_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let mut seen = HashSet::new();
            for id in client.server_ids() {
                if !seen.insert(id) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("client {}: id {} appears twice", client.id, id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// `is_sent_by_me` holds exactly for entries authored by the local user.
pub struct AttributionMatchesAuthor;

impl Invariant for AttributionMatchesAuthor {
    fn name(&self) -> &'static str {
        "attribution_matches_author"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for (index, message) in client.messages.iter().enumerate() {
                let mine = message.user_id == client.user_id;
                if message.is_sent_by_me != mine {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {} (user {}): entry {} by {} has is_sent_by_me={}",
                            client.id,
                            client.user_id,
                            index,
                            message.user_id,
                            message.is_sent_by_me
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Entries are never removed or reordered between snapshots.
///
/// Compares identities only: edits may change content in place. Clients
/// without a previous log (first snapshot, history reseeded, torn down) are
/// skipped.
pub struct AppendOnlyLog;

impl Invariant for AppendOnlyLog {
    fn name(&self) -> &'static str {
        "append_only_log"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            let Some(previous) = &client.previous else {
                continue;
            };
            if client.torn_down {
                continue;
            }

            if client.messages.len() < previous.len() {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "client {}: log shrank {} → {}",
                        client.id,
                        previous.len(),
                        client.messages.len()
                    ),
                });
            }

            for (index, (before, after)) in previous.iter().zip(&client.messages).enumerate() {
                if before.id != after.id || before.user_id != after.user_id {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {}: entry {} changed identity {:?}/{} → {:?}/{}",
                            client.id, index, before.id, before.user_id, after.id, after.user_id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A client that left the room holds nothing and stays disconnected.
pub struct TornDownIsEmpty;

impl Invariant for TornDownIsEmpty {
    fn name(&self) -> &'static str {
        "torn_down_is_empty"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if !client.torn_down {
                continue;
            }

            if !client.messages.is_empty() || client.status != ConnectionStatus::Disconnected {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "client {}: torn down with {} entries and status {:?}",
                        client.id,
                        client.messages.len(),
                        client.status
                    ),
                });
            }
        }
        Ok(())
    }
}

/// All clients order the server ids they share the same way.
///
/// The broker delivers to every subscriber in publish order, so two logs may
/// differ in which ids they hold but never in their relative order.
pub struct SharedOrdering;

impl Invariant for SharedOrdering {
    fn name(&self) -> &'static str {
        "shared_ordering"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let orderings: Vec<(usize, Vec<&MessageId>)> = state
            .clients
            .iter()
            .map(|client| (client.id, client.server_ids().collect::<Vec<_>>()))
            .filter(|(_, ids)| !ids.is_empty())
            .collect();

        for (i, (first_id, first)) in orderings.iter().enumerate() {
            for (other_id, other) in &orderings[i + 1..] {
                let common: HashSet<&MessageId> =
                    first.iter().copied().filter(|id| other.contains(id)).collect();
                if common.is_empty() {
                    continue;
                }

                let first_order: Vec<_> = first.iter().filter(|id| common.contains(*id)).collect();
                let other_order: Vec<_> = other.iter().filter(|id| common.contains(*id)).collect();

                if first_order != other_order {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {first_id} sees order {first_order:?}, client {other_id} sees \
                             {other_order:?}"
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Clients holding the same server id agree on its content.
///
/// Only holds once every client has seen every edit, so it is not part of
/// [`InvariantRegistry::standard`](super::InvariantRegistry::standard).
pub struct ContentConvergence;

impl Invariant for ContentConvergence {
    fn name(&self) -> &'static str {
        "content_convergence"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut seen: HashMap<&MessageId, (usize, &str)> = HashMap::new();

        for client in &state.clients {
            for message in &client.messages {
                let Some(id) = &message.id else {
                    continue;
                };

                match seen.get(id) {
                    Some((holder, content)) if *content != message.content => {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "id {}: client {} has {:?}, client {} has {:?}",
                                id, holder, content, client.id, message.content
                            ),
                        });
                    },
                    Some(_) => {},
                    None => {
                        seen.insert(id, (client.id, message.content.as_str()));
                    },
                }
            }
        }
        Ok(())
    }
}
