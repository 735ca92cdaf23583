// src/core/scanner/headers_scanner.rs

use async_trait::async_trait;
use tracing::{debug, info};

use super::Probe;
use crate::core::config::ScanConfig;
use crate::core::http::{build_client, header_value, request_error, Redirects};
use crate::core::models::{
    Category, Finding, HeaderPresence, HeaderReport, ProbeFindings, ProbeKind, ProbeResult, ScanResult, Severity,
    Target,
};
use reqwest::header::HeaderMap;

/// Security headers inspected on every target: (canonical name, finding code).
pub const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("Content-Security-Policy", "HEADERS_CSP_MISSING"),
    ("X-Frame-Options", "HEADERS_X_FRAME_OPTIONS_MISSING"),
    ("X-Content-Type-Options", "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING"),
    ("Strict-Transport-Security", "HEADERS_HSTS_MISSING"),
];

pub struct HeaderProbe {
    config: ScanConfig,
}

impl HeaderProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for HeaderProbe {
    type Details = HeaderReport;

    fn kind(&self) -> ProbeKind {
        ProbeKind::Headers
    }

    async fn run(&self, target: &Target) -> ProbeResult<HeaderReport> {
        run_headers_scan(target, &self.config).await.into()
    }
}

/// Checks for the presence of a specific HTTP header in a `HeaderMap`.
fn check_header(headers: &HeaderMap, name: &str) -> HeaderPresence {
    debug!(header_name = name, "Checking for header.");
    match header_value(headers, name) {
        Some(value) => {
            debug!(header_name = name, value = %value, "Header found.");
            HeaderPresence::Present { value }
        }
        None => {
            debug!(header_name = name, "Header not found.");
            HeaderPresence::Absent
        }
    }
}

/// Performs the headers scan.
///
/// # Arguments
///
/// * `target` - The target to send a HEAD request to. Redirects are not followed.
/// * `config` - Shared network budgets and user agent.
///
/// # Returns
///
/// A `ScanResult` holding a `HeaderReport` with the presence of every entry of
/// `SECURITY_HEADERS`, or a classified `ProbeError`.
async fn run_headers_scan(target: &Target, config: &ScanConfig) -> ScanResult<HeaderReport> {
    info!(target = %target, "Starting headers scan.");
    let client = build_client(ProbeKind::Headers, config, Redirects::Manual, config.request_timeout)?;

    let response = client
        .head(target.as_str())
        .send()
        .await
        .map_err(|e| request_error(ProbeKind::Headers, &e))?;
    info!(status = %response.status(), "Received HTTP response for headers scan.");

    let report = collect_headers(response.headers());
    let (status, findings) = analyze_headers(&report);
    info!(status, present = report.present_count(), "Headers scan finished.");
    Ok(ProbeFindings::new(ProbeKind::Headers, status, findings, report))
}

/// Records the presence and value of each of `SECURITY_HEADERS`.
pub fn collect_headers(headers: &HeaderMap) -> HeaderReport {
    HeaderReport {
        headers: SECURITY_HEADERS
            .iter()
            .map(|(name, _)| (name.to_string(), check_header(headers, name)))
            .collect(),
    }
}

/// One warning per absent header. These findings are descriptive only and
/// do not feed the risk score.
pub fn analyze_headers(report: &HeaderReport) -> (&'static str, Vec<Finding>) {
    debug!("Analyzing collected header data.");
    let findings: Vec<Finding> = SECURITY_HEADERS
        .iter()
        .filter(|(name, _)| !report.headers.get(*name).is_some_and(HeaderPresence::is_present))
        .map(|(name, code)| Finding::new(Severity::Warning, Category::Header, code, format!("{} header missing", name)))
        .collect();

    let status = if findings.is_empty() { "all_present" } else { "missing_headers" };
    (status, findings)
}
