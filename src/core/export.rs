// src/core/export.rs

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use strum::Display;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::knowledge_base::get_finding_detail;
use crate::core::models::{Narrative, ProbeKind, ProbeResult, Report, Severity};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to render document: {0}")]
    Render(String),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    /// Structured data, lossless.
    Json,
    /// Paginated plain-text document for humans.
    Document,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Document => "txt",
        }
    }
}

/// Rendered export. `format` is what was actually produced, which differs
/// from the request when the document fell back to JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub format: ExportFormat,
    pub contents: String,
}

impl ExportOutput {
    pub fn fell_back(&self, requested: ExportFormat) -> bool {
        self.format != requested
    }
}

/// Page geometry for the document renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLayout {
    pub width: usize,
    pub lines_per_page: usize,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self { width: 80, lines_per_page: 60 }
    }
}

// Page header line plus its rule.
const PAGE_HEADER_LINES: usize = 2;
const PAGE_BREAK: char = '\u{000C}';

pub fn render_json(report: &Report) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn parse_json(contents: &str) -> Result<Report, ExportError> {
    Ok(serde_json::from_str(contents)?)
}

pub fn render(report: &Report, format: ExportFormat) -> Result<ExportOutput, ExportError> {
    render_with_layout(report, format, DocumentLayout::default())
}

/// Renders `report`. A document that cannot be rendered degrades to JSON.
pub fn render_with_layout(
    report: &Report,
    format: ExportFormat,
    layout: DocumentLayout,
) -> Result<ExportOutput, ExportError> {
    if format == ExportFormat::Document {
        match render_document(report, layout) {
            Ok(contents) => return Ok(ExportOutput { format, contents }),
            Err(e) => warn!(error = %e, "Document rendering failed, falling back to JSON."),
        }
    }
    Ok(ExportOutput { format: ExportFormat::Json, contents: render_json(report)? })
}

/// Renders and writes the export into `dir`, returning the file path.
pub fn write_export(report: &Report, format: ExportFormat, dir: &Path) -> Result<PathBuf, ExportError> {
    let output = render(report, format)?;
    fs::create_dir_all(dir)?;

    let host: String = report
        .target()
        .host()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let file_name = format!(
        "vanguard-assess-{}-{}.{}",
        host,
        report.assessed_at().format("%Y%m%dT%H%M%SZ"),
        output.format.extension()
    );
    let path = dir.join(file_name);
    fs::write(&path, output.contents)?;
    info!(path = %path.display(), format = %output.format, "Report exported.");
    Ok(path)
}

fn wrap(text: &str, width: usize, indent: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() { indent.len() + word.len() } else { current.len() + 1 + word.len() };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if current.is_empty() {
            current.push_str(indent);
            current.push_str(word);
        } else {
            current.push(' ');
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "[CRIT]",
        Severity::Warning => "[WARN]",
        Severity::Info => "[INFO]",
    }
}

fn section_lines<T>(kind: ProbeKind, result: &ProbeResult<T>, width: usize) -> Vec<String> {
    let mut lines = vec![String::new(), kind.title().to_uppercase()];
    match result {
        ProbeResult::Error(e) => {
            lines.extend(wrap(&format!("Unavailable ({}): {}", e.kind, e.message), width, "  "));
        }
        ProbeResult::Findings(f) => {
            lines.push(format!("  Status: {}", f.status));
            for finding in &f.findings {
                lines.extend(wrap(
                    &format!("{} {}", severity_tag(finding.severity), finding.message),
                    width,
                    "  ",
                ));
                if finding.severity == Severity::Info {
                    continue;
                }
                if let Some(detail) = get_finding_detail(&finding.code) {
                    lines.extend(wrap(&format!("Fix: {}", detail.remediation), width, "         "));
                }
            }
        }
    }
    lines
}

fn body_lines(report: &Report, width: usize) -> Vec<String> {
    let results = report.results();
    let breakdown = report.score_breakdown();
    let mut lines = vec![
        "WEBSITE SECURITY ASSESSMENT".to_string(),
        String::new(),
        format!("Target:      {}", report.target()),
        format!("Assessed at: {}", report.assessed_at().to_rfc3339()),
        format!("Risk score:  {}/100 ({})", report.risk_score(), report.risk_tier()),
        format!(
            "Breakdown:   vulnerabilities {}, exposed paths {}, certificate {}, cookies {}",
            breakdown.vulnerabilities, breakdown.exposed_paths, breakdown.certificate, breakdown.cookies
        ),
    ];

    lines.extend(section_lines(ProbeKind::Protocol, &results.protocol_findings, width));
    lines.extend(section_lines(ProbeKind::CertificateBasic, &results.certificate_basic, width));
    lines.extend(section_lines(ProbeKind::CertificateAdvanced, &results.certificate_advanced, width));
    if let Some(cert) = results.certificate_advanced.outcome() {
        let d = &cert.details;
        lines.push(format!("  Issuer:   {}", d.issuer_organization.as_deref().unwrap_or(&d.issuer)));
        lines.push(format!("  Expires:  {} ({} days)", d.not_after.format("%Y-%m-%d"), d.days_until_expiry));
        lines.push(format!("  Protocol: {}", d.protocol_version));
    }
    lines.extend(section_lines(ProbeKind::Headers, &results.header_results, width));
    lines.extend(section_lines(ProbeKind::Cookies, &results.cookie_result, width));
    lines.extend(section_lines(ProbeKind::ExposedPaths, &results.exposed_paths_result, width));
    lines.extend(section_lines(ProbeKind::Cms, &results.cms_result, width));
    lines.extend(section_lines(ProbeKind::Vulnerabilities, &results.vulnerability_findings, width));

    lines.push(String::new());
    lines.push("NARRATIVE".to_string());
    match report.narrative() {
        Some(Narrative::Generated { text, .. }) => {
            for paragraph in text.lines() {
                if paragraph.trim().is_empty() {
                    lines.push(String::new());
                } else {
                    lines.extend(wrap(paragraph, width, "  "));
                }
            }
        }
        Some(Narrative::Unavailable { reason }) => lines.extend(wrap(&format!("Unavailable: {}", reason), width, "  ")),
        None => lines.push("  Not requested.".to_string()),
    }
    lines
}

/// Paginated plain text. Pages are separated by form feeds and each starts
/// with a header naming the target and the page number.
pub fn render_document(report: &Report, layout: DocumentLayout) -> Result<String, ExportError> {
    if layout.lines_per_page <= PAGE_HEADER_LINES {
        return Err(ExportError::Render(format!(
            "page of {} lines cannot hold any content",
            layout.lines_per_page
        )));
    }
    if layout.width < 20 {
        return Err(ExportError::Render(format!("page width {} is too narrow", layout.width)));
    }

    let body = body_lines(report, layout.width);
    let per_page = layout.lines_per_page - PAGE_HEADER_LINES;
    let pages: Vec<&[String]> = body.chunks(per_page).collect();
    let total = pages.len();

    let mut out = String::new();
    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            out.push(PAGE_BREAK);
        }
        writeln!(out, "vanguard-assess | {} | page {}/{}", report.target(), index + 1, total)
            .map_err(|e| ExportError::Render(e.to_string()))?;
        writeln!(out, "{}", "=".repeat(layout.width)).map_err(|e| ExportError::Render(e.to_string()))?;
        for line in page.iter() {
            writeln!(out, "{}", line).map_err(|e| ExportError::Render(e.to_string()))?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ErrorKind, ProbeError, Target};
    use crate::core::report::ReportAssembler;
    use crate::core::scanner::accumulator::Accumulator;
    use crate::core::scanner::ProbeOutput;
    use crate::core::scoring;

    fn sample_report() -> Report {
        let mut acc = Accumulator::default();
        acc.record(ProbeOutput::failed(ProbeKind::CertificateAdvanced, ErrorKind::Timeout, "slow"));
        acc.record(ProbeOutput::Headers(ProbeResult::Error(ProbeError::new(
            ProbeKind::Headers,
            ErrorKind::ConnectionRefused,
            "refused",
        ))));
        let results = acc.seal();
        let assessment = scoring::assess(&results);
        ReportAssembler::without_narrative(Target::parse("https://example.com/").unwrap(), results, assessment)
    }

    #[test]
    fn json_round_trips() {
        let report = sample_report();
        let json = render_json(&report).unwrap();
        assert_eq!(parse_json(&json).unwrap(), report);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["target"], "https://example.com/");
        assert_eq!(value["risk_tier"], "VERY_LOW");
        assert_eq!(value["header_results"]["error_kind"], "connection_refused");
    }

    #[test]
    fn document_is_paginated() {
        let layout = DocumentLayout { width: 60, lines_per_page: 10 };
        let output = render_with_layout(&sample_report(), ExportFormat::Document, layout).unwrap();
        assert_eq!(output.format, ExportFormat::Document);

        let pages: Vec<&str> = output.contents.split(PAGE_BREAK).collect();
        assert!(pages.len() > 1);
        assert!(pages[0].starts_with("vanguard-assess | https://example.com/ | page 1/"));
        assert!(pages.iter().all(|p| p.lines().count() <= 10));
        assert!(output.contents.contains("Unavailable (timeout): slow"));
    }

    #[test]
    fn impossible_layout_falls_back_to_json() {
        let layout = DocumentLayout { width: 80, lines_per_page: 1 };
        let output = render_with_layout(&sample_report(), ExportFormat::Document, layout).unwrap();
        assert!(output.fell_back(ExportFormat::Document));
        assert!(parse_json(&output.contents).is_ok());
    }

    #[test]
    fn wrapping_respects_width() {
        let lines = wrap("one two three four five six seven", 12, "  ");
        assert!(lines.iter().all(|l| l.len() <= 12));
        assert_eq!(lines[0], "  one two");
    }
}
