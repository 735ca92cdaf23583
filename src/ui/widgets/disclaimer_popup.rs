// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

const TERMS: [&str; 4] = [
    "1. You will only assess sites you own or are explicitly authorized to test.",
    "2. You will use the results responsibly and in accordance with applicable laws.",
    "3. The authors assume NO liability for any misuse or damage caused by this program.",
    "4. When OPENAI_API_KEY is set, a summary of the findings is sent to that provider.",
];

/// Renders the authorization disclaimer as a modal over the rest of the UI.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from("BEFORE YOU ASSESS A SITE".bold().yellow()),
        Line::from(""),
        Line::from(
            "vanguard-assess requests the home page, a catalogue of well-known paths and the TLS \
             certificate of the target. These are ordinary requests, but enumerating paths on a \
             site you do not control can still be unlawful.",
        ),
        Line::from(""),
        Line::from("By continuing you agree that:"),
    ];
    lines.extend(TERMS.iter().map(|term| Line::from(*term)));
    lines.push(Line::from(""));
    lines.push(Line::from(
        "Press ".bold() + "Enter".bold().yellow() + " to continue, ".bold() + "Q".bold().yellow() + " to quit".bold(),
    ));

    let block = Block::default()
        .title("Authorized use only")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 70, area);
    let popup = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A rectangle of the given percentages, centered in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
