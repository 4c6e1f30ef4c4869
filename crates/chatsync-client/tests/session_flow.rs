//! End-to-end room session tests against a scripted broker.
//!
//! The broker here is just a sequence of frames. These tests check what the
//! store shows after a realistic exchange: optimistic send, self-echo, peer
//! traffic and edits, then teardown.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use chatsync_client::{
    ChatPayload, Client, ClientAction, ClientError, ClientEvent, ConnectionState,
    ConnectionStatus, Environment, MessageId, RoomAddress, SessionConfig, UserId,
};
use chatsync_proto::{Command, Frame};
use chrono::{DateTime, TimeZone, Utc};

#[derive(Clone)]
struct TestEnv {
    start: Instant,
    elapsed_ms: Arc<AtomicU64>,
}

impl TestEnv {
    fn new() -> Self {
        Self { start: Instant::now(), elapsed_ms: Arc::new(AtomicU64::new(0)) }
    }

    fn advance(&self, by: Duration) {
        self.elapsed_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Environment for TestEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        self.start + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_714_557_600_000).single().unwrap_or_default()
            + chrono::Duration::milliseconds(self.elapsed_ms.load(Ordering::SeqCst) as i64)
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(7);
    }
}

fn room() -> RoomAddress {
    RoomAddress::new("15", "3")
}

fn connect(client: &mut Client<TestEnv>) -> Vec<ClientAction> {
    let mut actions = client.handle(ClientEvent::Activate).expect("activate");
    actions.extend(client.handle(ClientEvent::SocketOpened).expect("socket open"));
    actions.extend(
        client
            .handle(ClientEvent::FrameReceived(
                Frame::new(Command::Connected)
                    .with_header("version", "1.2")
                    .with_header("heart-beat", "4000,4000")
                    .with_header("session", "session-1"),
            ))
            .expect("connected"),
    );
    actions
}

/// Broadcast `payload` on the room topic the way the broker fans it out.
fn broadcast(client: &Client<TestEnv>, payload: &ChatPayload) -> ClientEvent {
    let subscription = client.subscription().expect("subscribed");
    let frame = Frame::new(Command::Message)
        .with_header("subscription", subscription)
        .with_header("destination", room().topic())
        .with_header("message-id", "m-1")
        .with_body(payload.to_json().expect("encode"));
    ClientEvent::FrameReceived(frame)
}

fn sent_frames(actions: &[ClientAction]) -> Vec<Frame> {
    actions
        .iter()
        .filter_map(|a| match a {
            ClientAction::Send(frame) => Some(frame.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn conversation_with_echo_and_edit() {
    let env = TestEnv::new();
    let config = SessionConfig::new(room(), UserId::from("42"), "me").with_auth_token("Bearer t");
    let mut client = Client::new(env.clone(), config);

    let actions = connect(&mut client);
    let frames = sent_frames(&actions);
    assert_eq!(frames[0].command, Command::Connect);
    assert_eq!(frames[1].command, Command::Subscribe);
    assert_eq!(frames[1].header("destination"), Some("/topic/chat/15/3"));
    assert!(client.store().connection().is_connected());

    // Optimistic send
    let actions = client.handle(ClientEvent::SendMessage { content: "hi".into() }).expect("send");
    let published = sent_frames(&actions);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].header("destination"), Some("/app/chat/15/3"));
    assert_eq!(published[0].header("content-type"), Some("application/json"));
    assert_eq!(client.store().len(), 1);

    // Broker echoes it back with a server id
    env.advance(Duration::from_millis(40));
    let echo = ChatPayload::create(UserId::from(42), "me", "hi", "2024-05-01T10:00:00.000Z")
        .with_id(MessageId::from(100));
    client.handle(broadcast(&client, &echo)).expect("echo");
    assert_eq!(client.store().len(), 1);

    // A peer answers
    let reply = ChatPayload::create(UserId::from(7), "peer", "hello", "2024-05-01T10:00:01.000Z")
        .with_id(MessageId::from(101));
    let actions = client.handle(broadcast(&client, &reply)).expect("reply");
    assert_eq!(actions, vec![ClientAction::MessageAppended]);

    // The peer edits their reply
    let edit = ChatPayload::update(MessageId::from(101), "hello there");
    client.handle(broadcast(&client, &edit)).expect("edit");

    let log = client.store().messages();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].content, "hi");
    assert!(log[0].is_sent_by_me);
    assert!(log[0].is_pending());
    assert_eq!(log[1].content, "hello there");
    assert_eq!(log[1].user_nickname, "peer");
    assert!(!log[1].is_sent_by_me);

    // Leaving the room
    let actions = client.handle(ClientEvent::Deactivate).expect("deactivate");
    let commands: Vec<_> = sent_frames(&actions).iter().map(|f| f.command).collect();
    assert_eq!(commands, vec![Command::Unsubscribe, Command::Disconnect]);
    assert!(client.store().is_empty());
    assert_eq!(client.store().connection(), &ConnectionState::Disconnected);
}

#[test]
fn history_then_live_traffic() {
    let env = TestEnv::new();
    let mut client = Client::new(env, SessionConfig::new(room(), UserId::from(42), "me"));

    let history: Vec<ChatPayload> = serde_json_history();
    client.handle(ClientEvent::SeedHistory(history)).expect("seed");
    assert_eq!(client.store().len(), 2);

    connect(&mut client);
    let edit = ChatPayload::update(MessageId::from(1), "first, edited");
    client.handle(broadcast(&client, &edit)).expect("edit");

    assert_eq!(client.store().messages()[0].content, "first, edited");
    assert!(client.store().messages()[0].is_sent_by_me);
}

fn serde_json_history() -> Vec<ChatPayload> {
    [
        br#"{"id":1,"user_id":42,"user_nickname":"me","content":"first","timestamp":"2024-04-30T09:00:00"}"#
            .as_slice(),
        br#"{"id":2,"userId":"7","userNickname":"peer","content":"second","timestamp":"2024-04-30T09:05:00","isImage":false}"#
            .as_slice(),
    ]
    .into_iter()
    .map(|raw| ChatPayload::from_json(raw).expect("history entry"))
    .collect()
}

#[test]
fn sends_refused_until_reconnected() {
    let env = TestEnv::new();
    let mut client = Client::new(env.clone(), SessionConfig::new(room(), UserId::from(42), "me"));
    connect(&mut client);

    client.handle(ClientEvent::SocketClosed { reason: "network".into() }).expect("closed");
    assert_eq!(client.status(), ConnectionStatus::Disconnected);

    let refused = client.handle(ClientEvent::SendMessage { content: "lost?".into() });
    assert!(matches!(refused, Err(ClientError::NotConnected { .. })));
    assert!(client.store().is_empty());

    env.advance(Duration::from_secs(5));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).expect("tick");
    assert!(actions.contains(&ClientAction::OpenSocket));

    client.handle(ClientEvent::SocketOpened).expect("reopen");
    let actions = client
        .handle(ClientEvent::FrameReceived(Frame::new(Command::Connected)))
        .expect("connected again");
    let resubscribe = sent_frames(&actions);
    assert_eq!(resubscribe.len(), 1);
    assert_eq!(resubscribe[0].header("id"), Some("sub-1"));

    client.handle(ClientEvent::SendMessage { content: "back".into() }).expect("send");
    assert_eq!(client.store().len(), 1);
}

#[test]
fn broker_rejection_retries_after_delay() {
    let env = TestEnv::new();
    let mut client = Client::new(env.clone(), SessionConfig::new(room(), UserId::from(42), "me"));
    client.handle(ClientEvent::Activate).expect("activate");
    client.handle(ClientEvent::SocketOpened).expect("open");

    let actions = client
        .handle(ClientEvent::FrameReceived(
            Frame::new(Command::Error).with_header("message", "bad token").with_body("denied"),
        ))
        .expect("error frame");

    assert!(actions.contains(&ClientAction::BrokerError {
        message: "bad token".into(),
        detail: "denied".into(),
    }));
    assert!(actions.contains(&ClientAction::StatusChanged(ConnectionStatus::Error)));
    assert_eq!(client.store().connection(), &ConnectionState::Error);

    env.advance(Duration::from_secs(4));
    assert!(client.handle(ClientEvent::Tick { now: env.now() }).expect("tick").is_empty());

    env.advance(Duration::from_secs(1));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).expect("tick");
    assert_eq!(actions, vec![
        ClientAction::StatusChanged(ConnectionStatus::Connecting),
        ClientAction::OpenSocket,
    ]);
}

#[test]
fn heart_beats_flow_while_connected() {
    let env = TestEnv::new();
    let mut client = Client::new(env.clone(), SessionConfig::new(room(), UserId::from(42), "me"));
    connect(&mut client);

    env.advance(Duration::from_secs(4));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).expect("tick");
    assert_eq!(actions, vec![ClientAction::SendHeartBeat]);

    client.handle(ClientEvent::HeartBeatReceived).expect("heart-beat");
    env.advance(Duration::from_secs(5));
    client.handle(ClientEvent::HeartBeatReceived).expect("heart-beat");
    env.advance(Duration::from_secs(5));
    client.handle(ClientEvent::Tick { now: env.now() }).expect("tick");
    assert_eq!(client.status(), ConnectionStatus::Connected);

    env.advance(Duration::from_secs(9));
    let actions = client.handle(ClientEvent::Tick { now: env.now() }).expect("tick");
    assert!(actions.iter().any(|a| matches!(a, ClientAction::CloseSocket { .. })));
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}
