//! Input line
//!
//! Displays the composer with cursor, or a placeholder while the session is
//! not connected.

use chatsync_app::App;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};

const PROMPT_WIDTH: u16 = 2; // "> "
const INPUT_LINE_OFFSET_Y: u16 = 1; // inside top border
const BORDER_WIDTH: u16 = 1;

/// Render the input line.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);

    if !app.is_input_enabled() {
        let placeholder =
            Paragraph::new("Please connect first").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(placeholder.block(block), area);
        return;
    }

    let paragraph = if app.composer().is_empty() {
        Paragraph::new("> Type a message...").style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(format!("> {}", app.composer())).style(Style::default().fg(Color::White))
    };
    frame.render_widget(paragraph.block(block), area);

    let available_width = area.width.saturating_sub(PROMPT_WIDTH + 2 * BORDER_WIDTH);
    let cursor_offset = (app.cursor() as u16).min(available_width);

    let cursor_x = area.x + BORDER_WIDTH + PROMPT_WIDTH + cursor_offset;
    let cursor_y = area.y.saturating_add(INPUT_LINE_OFFSET_Y);
    let max_x = area.x.saturating_add(area.width).saturating_sub(BORDER_WIDTH + 1);

    frame.set_cursor_position((cursor_x.min(max_x), cursor_y));
}
