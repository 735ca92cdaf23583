// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use vanguard_assess::core::models::{RiskTier, Severity};

fn tier_color(tier: RiskTier) -> Color {
    match tier {
        RiskTier::Critical => Color::Red,
        RiskTier::High => Color::LightRed,
        RiskTier::Medium => Color::Yellow,
        RiskTier::Low => Color::Cyan,
        RiskTier::VeryLow => Color::Green,
    }
}

/// Renders the summary column: risk score, per-probe status, issue counts
/// and the detected CMS. Empty until a report is available.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Score & tier
            Constraint::Length(1), // Gauge
            Constraint::Length(1),
            Constraint::Length(9), // Probes
            Constraint::Length(1),
            Constraint::Length(4), // Issues
            Constraint::Min(0),    // CMS
        ])
        .split(area);

    if !matches!(app.state, AppState::Finished) {
        return;
    }
    let Some(report) = &app.report else {
        return;
    };

    // --- Punteggio di Rischio ---
    // Risk score: higher is worse.
    let color = tier_color(app.summary.tier);
    let score_text = Text::from(vec![
        Line::from("Risk Score".bold()),
        Line::from(format!("{}/100 ({})", app.summary.score, app.summary.tier)).style(Style::default().fg(color)),
    ]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), summary_chunks[0]);

    let score_gauge = Gauge::default()
        .percent(app.displayed_score as u16)
        .label("")
        .style(Style::default().fg(tier_color(RiskTier::from_score(app.displayed_score))));
    frame.render_widget(score_gauge, summary_chunks[1]);

    // --- Stato delle Sonde ---
    // One line per probe.
    let results = report.results();
    let errors = results.errors();
    let mut probe_lines = Vec::new();
    for (kind, findings) in results.findings_by_probe() {
        let (icon, style) = if errors.iter().any(|e| e.probe == kind) {
            ("?", Style::default().fg(Color::Magenta))
        } else if findings.iter().any(|f| f.severity != Severity::Info) {
            ("✗", Style::default().fg(Color::Red))
        } else {
            ("✓", Style::default().fg(Color::Green))
        };
        probe_lines.push(Line::from(vec![Span::styled(format!("{} ", icon), style), Span::raw(kind.title())]));
    }
    let probes_block = Block::default().title("PROBES".bold());
    frame.render_widget(Paragraph::new(probe_lines).block(probes_block), summary_chunks[3]);

    // --- Problemi Trovati ---
    // Issue counts.
    let issues_block = Block::default().title("ISSUES FOUND".bold());
    let details_text = Text::from(vec![
        Line::from(vec![
            Span::raw("Critical: "),
            Span::styled(app.summary.critical_issues.to_string(), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::raw("Warnings: "),
            Span::styled(app.summary.warning_issues.to_string(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("Unavailable: "),
            Span::styled(app.summary.failed_probes.to_string(), Style::default().fg(Color::Magenta)),
        ]),
    ]);
    frame.render_widget(Paragraph::new(details_text).block(issues_block), summary_chunks[5]);

    // --- CMS ---
    let cms_block = Block::default().title("CMS".bold());
    let mut cms_lines = Vec::new();
    match results.cms_result.outcome() {
        Some(outcome) => match &outcome.details.cms {
            Some(name) => {
                let label = match &outcome.details.version {
                    Some(version) => format!("{} {}", name, version),
                    None => name.clone(),
                };
                cms_lines.push(Line::from(vec![
                    Span::raw("- "),
                    Span::styled(label, Style::default().fg(Color::Cyan)),
                ]));
            }
            None => cms_lines.push(Line::from("Not identified.")),
        },
        None => {
            if let Some(e) = results.cms_result.error() {
                cms_lines.push(Line::from(Span::styled(
                    format!("Detection failed: {}", e.message),
                    Style::default().fg(Color::Red),
                )));
            }
        }
    }
    frame.render_widget(Paragraph::new(cms_lines).block(cms_block), summary_chunks[6]);
}
