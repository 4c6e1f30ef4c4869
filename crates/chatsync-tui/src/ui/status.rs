//! Status bar
//!
//! Displays connection status, the room and the latest error.

use chatsync_app::App;
use chatsync_core::ConnectionStatus;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let connection_status = match app.status() {
        ConnectionStatus::Disconnected => {
            Span::styled("Disconnected", Style::default().fg(Color::Red))
        },
        ConnectionStatus::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        },
        ConnectionStatus::Connected => Span::styled(
            "Connected",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        ConnectionStatus::Error => Span::styled(
            "Connection error",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };

    let count = app.messages().len();
    let noun = if count == 1 { "message" } else { "messages" };
    let room_info = format!(" | {} | {count} {noun}", app.title());

    let mut spans = vec![
        Span::raw(" "),
        connection_status,
        Span::styled(room_info, Style::default().fg(Color::Gray)),
    ];
    if let Some(message) = app.status_message() {
        spans.push(Span::styled(format!(" | {message}"), Style::default().fg(Color::Yellow)));
    }

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let paragraph = Paragraph::new(Line::from(spans)).style(style);

    frame.render_widget(paragraph, area);
}
