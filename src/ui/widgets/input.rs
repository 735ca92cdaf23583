// src/ui/widgets/input.rs
use crate::app::{App, AppState};
use ratatui::{prelude::*, widgets::{Block, Borders, Paragraph}};

/// Renders the target URL input box. Validation errors replace the title.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.status_message {
        Some(message) => Line::from(format!("Target URL - {}", message)).red(),
        None => Line::from("Target URL"),
    };
    let input_block = Block::default().borders(Borders::ALL).title(title);
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    if let AppState::Idle = app.state {
        if !app.show_disclaimer {
            frame.set_cursor_position((area.x + app.input.chars().count() as u16 + 1, area.y + 1));
        }
    }
}
