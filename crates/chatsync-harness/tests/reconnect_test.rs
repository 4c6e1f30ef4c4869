//! Connection lifecycle under failures, on virtual time.
//!
//! Covers dropped sockets, refused handshakes, an unreachable broker and a
//! broker that goes silent. Nothing here waits on a real clock.

use std::time::Duration;

use chatsync_client::{
    ChatPayload, ClientError, ConnectionConfig, ConnectionStatus, RoomAddress, SessionConfig,
    UserId,
};
use chatsync_harness::{InvariantRegistry, SimBroker, SimEnv, SimRoom};
use chatsync_proto::HeartBeat;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const FOUR_SECONDS: Duration = Duration::from_secs(4);

fn room() -> SimRoom {
    SimRoom::new(SimEnv::with_seed(2), RoomAddress::new("15", "3"))
}

#[test]
fn dropped_socket_reconnects_after_delay() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    let bob = room.join(2u64, "bob").unwrap();
    assert_eq!(room.client(alice).subscription(), Some("sub-0"));

    room.drop_socket(alice, "network partition");
    room.settle();
    assert_eq!(room.client(alice).status(), ConnectionStatus::Disconnected);

    let refused = room.send(alice, "are you there?");
    assert_eq!(refused, Err(ClientError::NotConnected { status: ConnectionStatus::Disconnected }));
    assert!(room.messages(alice).is_empty());

    room.send(bob, "missed it").unwrap();
    room.settle();

    room.advance(RECONNECT_DELAY - Duration::from_millis(250));
    assert_eq!(room.client(alice).status(), ConnectionStatus::Disconnected);

    room.advance(Duration::from_millis(250));
    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);
    assert_eq!(room.client(alice).subscription(), Some("sub-1"));
    assert_eq!(room.broker().subscribers(&room.room().topic()), 2);

    room.send(bob, "welcome back").unwrap();
    room.settle();

    let alice_log: Vec<_> = room.messages(alice).iter().map(|m| m.content.as_str()).collect();
    assert_eq!(alice_log, vec!["welcome back"], "no replay of missed traffic");
    room.check_invariants(&InvariantRegistry::standard(), "after reconnect");
}

#[test]
fn rejected_handshake_retries() {
    let mut broker = SimBroker::new();
    broker.reject_next_connect("broker busy");
    let mut room = room().with_broker(broker);

    let alice = room.join(1u64, "alice").unwrap();
    assert_eq!(room.client(alice).status(), ConnectionStatus::Error);
    assert!(room.session(alice).is_none());

    room.advance(RECONNECT_DELAY);
    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);
}

#[test]
fn wrong_credential_keeps_failing() {
    let broker = SimBroker::new().with_required_token("Bearer right");
    let mut room = room().with_broker(broker);

    let config = SessionConfig::new(room.room().clone(), UserId::from(1), "a")
        .with_auth_token("Bearer wrong");
    let alice = room.join_with(config).unwrap();

    for _ in 0..3 {
        assert_eq!(room.client(alice).status(), ConnectionStatus::Error);
        room.advance(RECONNECT_DELAY);
    }

    let good = SessionConfig::new(room.room().clone(), UserId::from(2), "b")
        .with_auth_token("Bearer right");
    let bob = room.join_with(good).unwrap();
    assert_eq!(room.client(bob).status(), ConnectionStatus::Connected);
}

#[test]
fn unreachable_broker_retries_until_back() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();

    room.set_network(false);
    room.drop_socket(alice, "link down");
    room.settle();

    room.advance(RECONNECT_DELAY);
    assert_eq!(room.client(alice).status(), ConnectionStatus::Error);
    room.advance(RECONNECT_DELAY);
    assert_eq!(room.client(alice).status(), ConnectionStatus::Error);

    room.set_network(true);
    room.advance(RECONNECT_DELAY);
    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);
    assert!(room.client(alice).connection().attempts() >= 3);
}

#[test]
fn heart_beats_keep_the_session_alive() {
    let broker = SimBroker::new().with_heart_beat(HeartBeat::new(FOUR_SECONDS, FOUR_SECONDS));
    let mut room = room().with_broker(broker).with_broker_heart_beats(FOUR_SECONDS);

    let alice = room.join(1u64, "alice").unwrap();
    let session = room.session(alice);

    room.advance(Duration::from_secs(60));

    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);
    assert_eq!(room.session(alice), session);
    assert!(room.heart_beats_sent(alice) >= 14);
}

#[test]
fn silent_broker_is_detected() {
    let broker = SimBroker::new().with_heart_beat(HeartBeat::new(FOUR_SECONDS, FOUR_SECONDS));
    let mut room = room().with_broker(broker);

    let alice = room.join(1u64, "alice").unwrap();
    let first = room.session(alice);

    room.advance(Duration::from_secs(8));
    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);

    room.advance(Duration::from_millis(250));
    assert_eq!(room.client(alice).status(), ConnectionStatus::Disconnected);

    room.advance(RECONNECT_DELAY);
    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);
    assert_ne!(room.session(alice), first);
}

#[test]
fn broker_error_while_connected_keeps_session() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    let session = room.session(alice).unwrap();

    room.broker_mut().inject_error(session, "rate limited", "slow down");
    room.settle();

    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);
    room.send(alice, "still here").unwrap();
    room.settle();
    assert_eq!(room.messages(alice).len(), 1);
}

#[test]
fn fast_timing_shortens_reconnect() {
    let timing = ConnectionConfig {
        reconnect_delay: Duration::from_secs(1),
        ..ConnectionConfig::default()
    };
    let mut room = room().with_timing(timing);
    let alice = room.join(1u64, "alice").unwrap();

    room.drop_socket(alice, "blip");
    room.settle();
    room.advance(Duration::from_secs(1));

    assert_eq!(room.client(alice).status(), ConnectionStatus::Connected);
    room.publish(ChatPayload::create(UserId::from(9), "zed", "hi", "t"));
    room.settle();
    assert_eq!(room.messages(alice).len(), 1);
}
