// src/ui/widgets/analysis_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use vanguard_assess::core::knowledge_base::{self, category_title};
use vanguard_assess::core::models::{Narrative, Severity};

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical => Style::default().fg(Color::Red),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Info => Style::default().fg(Color::Cyan),
    }
}

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Analysis Report (Navigate with ↑ ↓)");

    if !matches!(app.state, AppState::Finished) {
        let content = match app.state {
            AppState::Idle => Paragraph::new("Assessment results will appear here...").alignment(Alignment::Center),
            AppState::Scanning => Paragraph::new(Line::from(vec![
                Span::styled(format!("{} ", SPINNER_CHARS[app.spinner_frame]), Style::default().fg(Color::Cyan)),
                Span::raw(format!("Assessing... stage {}", app.stage)),
            ]))
            .alignment(Alignment::Center),
            AppState::Finished => Paragraph::new(""),
        };
        frame.render_widget(content.block(main_block), area);
        return;
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(30), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = app
        .all_findings
        .iter()
        .map(|f| {
            let title = knowledge_base::get_finding_detail(&f.code).map_or(f.message.as_str(), |d| d.title);
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", category_title(f.category)), Style::default().fg(Color::DarkGray)),
                Span::styled(title.to_string(), severity_style(f.severity)),
            ]))
        })
        .collect();

    let findings_list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(findings_list, chunks[0], &mut app.analysis_list_state);

    // --- Dettagli ---
    // Knowledge-base entry of the selected finding.
    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let selected = app.analysis_list_state.selected().and_then(|i| app.all_findings.get(i));
    match selected {
        Some(finding) => {
            let mut text = vec![Line::from(finding.message.clone()), Line::from("")];
            if let Some(detail) = knowledge_base::get_finding_detail(&finding.code) {
                text.push(Line::from("WHAT IT IS:".yellow().bold()));
                text.push(Line::from(detail.description));
                text.push(Line::from(""));
                text.push(Line::from("HOW TO FIX:".yellow().bold()));
                text.push(Line::from(detail.remediation));
            }
            let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(detail_block);
            frame.render_widget(p, chunks[1]);
        }
        None => render_placeholder_details(frame, app, detail_block, chunks[1]),
    }

    render_narrative(frame, app, chunks[2]);
}

fn render_narrative(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::TOP).title("Narrative");
    let text = match app.report.as_ref().and_then(|r| r.narrative()) {
        Some(Narrative::Generated { text, .. }) => Text::from(text.as_str()),
        Some(Narrative::Unavailable { reason }) => {
            Text::from(Line::from(format!("Narrative unavailable: {}", reason)).dark_gray())
        }
        None => Text::from(""),
    };
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(block), area);
}

fn render_placeholder_details(frame: &mut Frame, app: &App, block: Block, area: Rect) {
    let total_issues = app.summary.critical_issues + app.summary.warning_issues;

    let placeholder_text = if total_issues == 0 && app.summary.failed_probes == 0 {
        Text::from(vec![
            Line::from(""),
            Line::from("✓ NO ISSUES FOUND".bold().fg(Color::Green)),
            Line::from(""),
            Line::from("No critical or warning findings were reported by any probe."),
        ])
    } else {
        Text::from("Select an item above to see details.")
    };

    let p = Paragraph::new(placeholder_text).alignment(Alignment::Center).block(block);
    frame.render_widget(p, area);
}
