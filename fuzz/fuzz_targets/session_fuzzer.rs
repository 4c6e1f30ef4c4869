//! Fuzz target for the room session state machine
//!
//! Drives a [`Client`] with arbitrary sequences of socket events, broker
//! frames, ticks and user actions.
//!
//! # Invariants
//!
//! - Handling any event sequence never panics
//! - Server ids in the log are unique
//! - `is_sent_by_me` always matches the local user
//! - A torn-down session holds no messages

#![no_main]

use std::{collections::HashSet, time::Duration};

use arbitrary::Arbitrary;
use chatsync_client::{
    ChatPayload, Client, ClientEvent, Environment, MessageId, RoomAddress, SessionConfig, UserId,
};
use chatsync_harness::{SimEnv, SimInstant};
use chatsync_proto::{Command, Frame};
use libfuzzer_sys::fuzz_target;

const LOCAL_USER: u64 = 1;

#[derive(Debug, Arbitrary)]
enum Step {
    Activate,
    Deactivate,
    SocketOpened,
    SocketClosed,
    Connected { heart_beat: u8 },
    HeartBeat,
    Message { id: Option<u8>, user: u8, content: String, own_subscription: bool },
    Update { id: u8, content: String },
    RawBody(Vec<u8>),
    BrokerError(String),
    Tick { millis: u16 },
    Send(String),
    Seed(Vec<(u8, u8)>),
}

fn message_frame(client: &Client<SimEnv>, payload: &ChatPayload, own_subscription: bool) -> Frame {
    let subscription = match (own_subscription, client.subscription()) {
        (true, Some(id)) => id.to_string(),
        _ => "sub-stale".to_string(),
    };
    let body = payload.to_json().unwrap_or_default();

    Frame::new(Command::Message)
        .with_header("subscription", subscription)
        .with_header("destination", client.config().room.topic())
        .with_body(body)
}

fn event(client: &Client<SimEnv>, env: &SimEnv, step: Step) -> ClientEvent<SimInstant> {
    match step {
        Step::Activate => ClientEvent::Activate,
        Step::Deactivate => ClientEvent::Deactivate,
        Step::SocketOpened => ClientEvent::SocketOpened,
        Step::SocketClosed => ClientEvent::SocketClosed { reason: "fuzz".to_string() },
        Step::Connected { heart_beat } => {
            let frame = Frame::new(Command::Connected)
                .with_header("version", "1.2")
                .with_header("heart-beat", format!("{heart_beat},{heart_beat}"));
            ClientEvent::FrameReceived(frame)
        },
        Step::HeartBeat => ClientEvent::HeartBeatReceived,
        Step::Message { id, user, content, own_subscription } => {
            let mut payload =
                ChatPayload::create(UserId::from(u64::from(user)), "peer", content, "t");
            payload.id = id.map(|id| MessageId::from(u64::from(id)));
            ClientEvent::FrameReceived(message_frame(client, &payload, own_subscription))
        },
        Step::Update { id, content } => {
            let payload = ChatPayload::update(MessageId::from(u64::from(id)), content);
            ClientEvent::FrameReceived(message_frame(client, &payload, true))
        },
        Step::RawBody(body) => {
            let frame = Frame::new(Command::Message)
                .with_header("subscription", client.subscription().unwrap_or("sub-0").to_string())
                .with_body(body);
            ClientEvent::FrameReceived(frame)
        },
        Step::BrokerError(message) => {
            ClientEvent::FrameReceived(Frame::new(Command::Error).with_header("message", message))
        },
        Step::Tick { millis } => {
            env.advance(Duration::from_millis(u64::from(millis)));
            ClientEvent::Tick { now: env.now() }
        },
        Step::Send(content) => ClientEvent::SendMessage { content },
        Step::Seed(entries) => {
            let mut ids = HashSet::new();
            let history = entries
                .into_iter()
                .filter(|(id, _)| ids.insert(*id))
                .map(|(id, user)| {
                    ChatPayload::create(UserId::from(u64::from(user)), "old", "history", "t")
                        .with_id(MessageId::from(u64::from(id)))
                })
                .collect();
            ClientEvent::SeedHistory(history)
        },
    }
}

fuzz_target!(|steps: Vec<Step>| {
    let env = SimEnv::default();
    let config = SessionConfig::new(RoomAddress::new("15", "3"), UserId::from(LOCAL_USER), "me");
    let mut client = Client::new(env.clone(), config);
    let local = UserId::from(LOCAL_USER);

    for step in steps {
        // History is only loaded for a live room view
        if matches!(step, Step::Seed(_)) && client.is_torn_down() {
            continue;
        }

        let event = event(&client, &env, step);
        let _ = client.handle(event);

        let messages = client.store().messages();
        if client.is_torn_down() {
            assert!(messages.is_empty(), "torn-down session kept messages");
        }

        for message in messages {
            assert_eq!(message.is_sent_by_me, message.user_id == local);
        }

        let mut seen = HashSet::new();
        for id in messages.iter().filter_map(|m| m.id.as_ref()) {
            assert!(seen.insert(id), "duplicate server id {id}");
        }
    }
});
