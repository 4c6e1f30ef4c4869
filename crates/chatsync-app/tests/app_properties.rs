//! Property-based tests for the App state machine.
//!
//! Tests verify that composer and view invariants hold under arbitrary event
//! sequences, and that date grouping never reorders or loses messages.

use chatsync_app::{App, AppAction, AppEvent, KeyInput, StoreView, group_by_date, message_date};
use chatsync_client::{ChatMessage, ConnectionStatus, UserId};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = ConnectionStatus> {
    prop_oneof![
        1 => Just(ConnectionStatus::Disconnected),
        1 => Just(ConnectionStatus::Connecting),
        3 => Just(ConnectionStatus::Connected),
        1 => Just(ConnectionStatus::Error),
    ]
}

fn key_strategy() -> impl Strategy<Value = KeyInput> {
    prop_oneof![
        6 => prop::char::range('a', 'z').prop_map(KeyInput::Char),
        1 => Just(KeyInput::Char(' ')),
        1 => Just(KeyInput::Char('한')),
        1 => Just(KeyInput::Enter),
        1 => Just(KeyInput::Backspace),
        1 => Just(KeyInput::Delete),
        1 => Just(KeyInput::Left),
        1 => Just(KeyInput::Right),
        1 => Just(KeyInput::Home),
        1 => Just(KeyInput::End),
        1 => Just(KeyInput::Up),
        1 => Just(KeyInput::Down),
    ]
}

/// Generate random app events. Esc is left out so sessions keep going.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        8 => key_strategy().prop_map(AppEvent::Key),
        1 => Just(AppEvent::Tick),
        1 => (1u16..200, 1u16..100).prop_map(|(c, r)| AppEvent::Resize(c, r)),
        2 => (status_strategy(), 0usize..5)
            .prop_map(|(status, n)| AppEvent::StoreChanged(view(status, n))),
    ]
}

fn view(status: ConnectionStatus, messages: usize) -> StoreView {
    StoreView {
        status,
        messages: (0..messages)
            .map(|i| {
                let user = UserId::from("1");
                ChatMessage::outgoing(user, "n", format!("m{i}"), "2024-05-01T10:00:00Z")
            })
            .collect(),
        revision: 0,
    }
}

fn timestamp_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..4, 0u32..24).prop_map(|(d, h)| format!("2024-05-0{d}T{h:02}:00:00Z")),
        (1u32..4, 0u32..24).prop_map(|(d, h)| format!("2024-05-0{d}T{h:02}:30:00")),
        Just("not a date".to_string()),
    ]
}

#[test]
fn prop_composer_invariants_hold() {
    proptest!(|(events in prop::collection::vec(event_strategy(), 0..80))| {
        let mut app = App::new("1/1");

        for event in events {
            let enabled = app.is_input_enabled();
            let before = app.composer().to_string();
            let is_key = matches!(event, AppEvent::Key(_));

            let actions = app.handle(event);

            prop_assert!(app.cursor() <= app.composer().chars().count());
            prop_assert!(app.scroll() <= app.messages().len());

            if is_key && !enabled {
                prop_assert_eq!(app.composer(), before.as_str());
            }

            for action in &actions {
                if let AppAction::SendMessage { content } = action {
                    prop_assert!(enabled);
                    prop_assert!(!content.trim().is_empty());
                    prop_assert_eq!(content, &before);
                    prop_assert_eq!(app.composer(), "");
                }
                prop_assert_ne!(action, &AppAction::Quit);
            }
        }
    });
}

#[test]
fn prop_date_groups_partition_log() {
    proptest!(|(stamps in prop::collection::vec(timestamp_strategy(), 0..40))| {
        let log: Vec<ChatMessage> = stamps
            .iter()
            .enumerate()
            .map(|(i, ts)| {
                ChatMessage::outgoing(UserId::from("1"), "n", i.to_string(), ts.as_str())
            })
            .collect();

        let groups = group_by_date(&log);

        let flattened: Vec<&ChatMessage> = groups.iter().flat_map(|g| g.messages.iter()).collect();
        prop_assert_eq!(flattened.len(), log.len());
        for (grouped, original) in flattened.iter().zip(&log) {
            prop_assert_eq!(*grouped, original);
        }

        for group in &groups {
            prop_assert!(!group.messages.is_empty());
            for message in group.messages {
                prop_assert_eq!(message_date(&message.timestamp), group.date);
            }
        }

        for pair in groups.windows(2) {
            prop_assert_ne!(pair[0].date, pair[1].date);
        }
    });
}
