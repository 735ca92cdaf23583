// src/ui/widgets/footer.rs

use crate::app::{App, AppState, ExportStatus};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &'static str) -> Span<'static> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer with the actions available in the current state.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.state {
        AppState::Idle => Line::from(vec![
            Span::raw("Press "),
            key("Enter"),
            Span::raw(" to assess, "),
            key("Esc"),
            Span::raw(" to quit."),
        ]),
        AppState::Finished => match &app.export_status {
            ExportStatus::Success(path) => Line::from(vec![
                Span::styled("Exported to ", Style::new().fg(Color::Green)),
                Span::raw(path.clone()),
                Span::raw("  "),
                key("[N]"),
                Span::raw("ew  "),
                key("[Q]"),
                Span::raw("uit"),
            ]),
            ExportStatus::Error(e) => Line::from(vec![
                Span::styled(format!("Export failed: {}", e), Style::new().fg(Color::Red)),
                Span::raw("  "),
                key("[Q]"),
                Span::raw("uit"),
            ]),
            ExportStatus::Idle => Line::from(vec![
                key("[N]"),
                Span::raw("ew Scan, "),
                key("[E]"),
                Span::raw("xport JSON, "),
                key("[D]"),
                Span::raw("ocument, "),
                key("[Q]"),
                Span::raw("uit"),
            ]),
        },
        AppState::Scanning => Line::from("Assessing... Press Q to quit."),
    };

    let footer = Paragraph::new(line).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
