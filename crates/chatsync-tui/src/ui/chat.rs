//! Chat area
//!
//! Displays the room log with a divider whenever the calendar date changes.
//! The local user's messages are right-aligned and highlighted.

use chatsync_app::{App, message_time};
use chatsync_client::ChatMessage;
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const BORDER_SIZE: u16 = 2;

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!(" {} ", app.title()));

    if app.messages().is_empty() {
        let hint = Span::styled("No messages yet", Style::default().fg(Color::DarkGray));
        frame.render_widget(Paragraph::new(hint).block(block), area);
        return;
    }

    let mut lines = Vec::new();
    // Line index of each message, for scrolling by message
    let mut message_lines = Vec::new();

    for group in app.date_groups() {
        let label = group.date.map_or_else(|| "unknown date".to_string(), |d| d.to_string());
        lines.push(divider(&label));

        for message in group.messages {
            message_lines.push(lines.len());
            lines.push(message_line(message));
        }
    }

    let hidden = app.scroll().min(message_lines.len());
    let end = if hidden == 0 { lines.len() } else { message_lines[message_lines.len() - hidden] };
    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let start = end.saturating_sub(visible_height);

    let visible: Vec<Line> = lines.drain(start..end).collect();
    frame.render_widget(Paragraph::new(visible).block(block), area);
}

fn divider(label: &str) -> Line<'static> {
    Line::from(Span::styled(format!("── {label} ──"), Style::default().fg(Color::DarkGray)))
        .alignment(Alignment::Center)
}

fn message_line(message: &ChatMessage) -> Line<'static> {
    let time = message_time(&message.timestamp).unwrap_or_default();
    let content = if message.is_image {
        format!("[image] {}", message.content)
    } else {
        message.content.clone()
    };

    if message.is_sent_by_me {
        return Line::from(vec![
            Span::styled(content, Style::default().fg(Color::Cyan)),
            Span::raw(" "),
            Span::styled(time, Style::default().fg(Color::DarkGray)),
        ])
        .alignment(Alignment::Right);
    }

    Line::from(vec![
        Span::styled(time, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            message.user_nickname.clone(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(": "),
        Span::raw(content),
    ])
}
