//! Multi-participant room tests.
//!
//! Several session clients share one simulated broker. After traffic settles
//! every participant must see one copy of each message, attributed to its
//! author, in the order the broker published them.

use chatsync_client::{
    ChatPayload, ClientError, ConnectionMode, ConnectionStatus, MessageId, RoomAddress,
    SessionConfig, UserId,
};
use chatsync_harness::{InvariantRegistry, SimEnv, SimRoom};

fn room() -> SimRoom {
    SimRoom::new(SimEnv::with_seed(1), RoomAddress::new("15", "3"))
}

fn contents(room: &SimRoom, index: usize) -> Vec<&str> {
    room.messages(index).iter().map(|m| m.content.as_str()).collect()
}

#[test]
fn participants_see_each_message_once() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    let bob = room.join(2u64, "bob").unwrap();

    room.send(alice, "found your wallet").unwrap();
    room.settle();
    room.send(bob, "thank you!").unwrap();
    room.settle();

    assert_eq!(contents(&room, alice), vec!["found your wallet", "thank you!"]);
    assert_eq!(contents(&room, bob), vec!["found your wallet", "thank you!"]);

    let alice_log = room.messages(alice);
    assert!(alice_log[0].is_sent_by_me);
    assert!(alice_log[0].id.is_none(), "own message stays optimistic");
    assert!(!alice_log[1].is_sent_by_me);
    assert_eq!(alice_log[1].id, Some(MessageId::from(2)));

    let bob_log = room.messages(bob);
    assert_eq!(bob_log[0].id, Some(MessageId::from(1)));
    assert_eq!(bob_log[0].user_nickname, "alice");

    room.check_invariants(&InvariantRegistry::settled(), "after conversation");
}

#[test]
fn outside_edit_reaches_every_participant() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    let bob = room.join(2u64, "bob").unwrap();

    let id = room.publish(ChatPayload::create(UserId::from(3), "carol", "typo", "t")).unwrap();
    room.settle();
    room.publish(ChatPayload::update(id.clone(), "fixed"));
    room.settle();

    for index in [alice, bob] {
        assert_eq!(room.client(index).store().get(&id).unwrap().content, "fixed");
    }
    assert_eq!(room.broker().history(&room.room().topic())[0].content, "fixed");
    room.check_invariants(&InvariantRegistry::settled(), "after edit");
}

#[test]
fn edit_of_own_message_patches_peer_copies() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    let bob = room.join(2u64, "bob").unwrap();

    room.send(alice, "meet at 5").unwrap();
    room.settle();
    let id = room.messages(bob)[0].id.clone().unwrap();

    room.publish(ChatPayload::update(id, "meet at 6"));
    room.settle();

    // The sender's copy never learned its server id, so only peers match.
    assert_eq!(contents(&room, bob), vec!["meet at 6"]);
    assert_eq!(contents(&room, alice), vec!["meet at 5"]);
    room.check_invariants(&InvariantRegistry::standard(), "after own edit");
}

#[test]
fn late_joiner_seeded_from_history_matches() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    room.publish(ChatPayload::create(UserId::from(3), "carol", "first", "t"));
    room.settle();
    room.send(alice, "second").unwrap();
    room.settle();

    let bob = room.join(2u64, "bob").unwrap();
    let history = room.broker().history(&room.room().topic()).to_vec();
    room.seed(bob, history).unwrap();

    room.publish(ChatPayload::create(UserId::from(3), "carol", "third", "t"));
    room.settle();

    assert_eq!(contents(&room, bob), vec!["first", "second", "third"]);
    assert_eq!(contents(&room, alice), vec!["first", "second", "third"]);
    assert!(!room.messages(bob)[1].is_sent_by_me);
    room.check_invariants(&InvariantRegistry::settled(), "after late join");
}

#[test]
fn leaving_unsubscribes_and_clears() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    let bob = room.join(2u64, "bob").unwrap();
    let topic = room.room().topic();
    assert_eq!(room.broker().subscribers(&topic), 2);

    room.send(bob, "hello").unwrap();
    room.settle();
    let session = room.session(alice).unwrap();

    room.leave(alice).unwrap();
    room.send(bob, "anyone?").unwrap();
    room.settle();

    let commands: Vec<String> =
        room.broker().received(session).iter().map(|f| f.command.to_string()).collect();
    assert_eq!(commands[commands.len() - 2..], ["UNSUBSCRIBE", "DISCONNECT"]);
    assert_eq!(room.broker().subscribers(&topic), 1);

    assert!(room.client(alice).is_torn_down());
    assert!(room.messages(alice).is_empty());
    assert_eq!(room.client(alice).status(), ConnectionStatus::Disconnected);
    room.check_invariants(&InvariantRegistry::standard(), "after leave");
}

#[test]
fn socket_io_mode_never_connects() {
    let mut room = room();
    let config = SessionConfig::new(room.room().clone(), UserId::from(1), "alice")
        .with_mode(ConnectionMode::SocketIo);

    let result = room.join_with(config);
    assert_eq!(result, Err(ClientError::UnsupportedMode(ConnectionMode::SocketIo)));
    assert_eq!(room.broker().subscribers(&room.room().topic()), 0);
}

#[test]
fn broker_transcript() {
    let mut room = room();
    let alice = room.join(1u64, "alice").unwrap();
    room.send(alice, "hi").unwrap();
    room.settle();
    room.leave(alice).unwrap();

    insta::assert_snapshot!(room.broker().transcript().join("\n"), @r"
    0 > CONNECT
    0 < CONNECTED
    0 > SUBSCRIBE
    0 > SEND
    0 < MESSAGE
    0 > UNSUBSCRIBE
    0 > DISCONNECT
    0 < RECEIPT
    ");
}
