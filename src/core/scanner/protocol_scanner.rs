// src/core/scanner/protocol_scanner.rs

use async_trait::async_trait;
use tracing::{debug, info};

use super::Probe;
use crate::core::config::ScanConfig;
use crate::core::http::{build_client, header_value, request_error, Redirects};
use crate::core::models::{
    Category, Finding, ProbeFindings, ProbeKind, ProbeResult, ProtocolReport, ScanResult, Severity, Target,
};

/// Status codes treated as redirects when inspecting the first hop.
const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// Checks whether the site is served over HTTPS and how plain HTTP is handled.
pub struct ProtocolProbe {
    config: ScanConfig,
}

impl ProtocolProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for ProtocolProbe {
    type Details = ProtocolReport;

    fn kind(&self) -> ProbeKind {
        ProbeKind::Protocol
    }

    async fn run(&self, target: &Target) -> ProbeResult<ProtocolReport> {
        run_protocol_scan(target, &self.config).await.into()
    }
}

/// Performs the protocol scan with a single HEAD request that does not follow
/// redirects, so the first hop is what gets judged.
///
/// # Arguments
///
/// * `target` - The target to request.
/// * `config` - Shared network budgets and user agent.
///
/// # Returns
///
/// A `ScanResult` holding the `ProtocolReport` with its status and finding, or
/// a classified `ProbeError` when the request failed.
async fn run_protocol_scan(target: &Target, config: &ScanConfig) -> ScanResult<ProtocolReport> {
    info!(target = %target, "Starting protocol scan.");
    let client = build_client(ProbeKind::Protocol, config, Redirects::Manual, config.request_timeout)?;

    let response = client
        .head(target.as_str())
        .send()
        .await
        .map_err(|e| request_error(ProbeKind::Protocol, &e))?;

    let status_code = response.status().as_u16();
    let redirect_location = if REDIRECT_STATUSES.contains(&status_code) {
        header_value(response.headers(), "location")
    } else {
        None
    };
    debug!(status_code, location = ?redirect_location, "Received first-hop response.");

    let report = ProtocolReport {
        scheme: target.url().scheme().to_string(),
        status_code,
        redirect_location,
    };
    let (status, findings) = analyze_protocol(&report);
    info!(status, findings = findings.len(), "Protocol scan finished.");
    Ok(ProbeFindings::new(ProbeKind::Protocol, status, findings, report))
}

/// Maps the first-hop observation to a status label and exactly one finding.
///
/// # Arguments
///
/// * `report` - Scheme, status code and redirect location of the first hop.
///
/// # Returns
///
/// A tuple containing:
/// - The status, e.g. `"https"`, `"redirects_to_https"` or `"http_only"`.
/// - A single finding, critical when the target stays on plain HTTP.
pub fn analyze_protocol(report: &ProtocolReport) -> (&'static str, Vec<Finding>) {
    let is_http = report.scheme == "http";
    let redirected = REDIRECT_STATUSES.contains(&report.status_code);
    let to_https = report
        .redirect_location
        .as_deref()
        .is_some_and(|location| location.starts_with("https://"));

    let (status, severity, code, message) = match (is_http, redirected) {
        (true, true) if to_https => (
            "redirects_to_https",
            Severity::Info,
            "PROTOCOL_HTTP_REDIRECTS_TO_HTTPS",
            "Accepts HTTP but redirects to HTTPS (should refuse HTTP entirely)".to_string(),
        ),
        (true, true) => (
            "http_without_https_redirect",
            Severity::Critical,
            "PROTOCOL_HTTP_NO_HTTPS_REDIRECT",
            "Uses HTTP and redirects without upgrading to HTTPS".to_string(),
        ),
        (true, false) => (
            "http_only",
            Severity::Critical,
            "PROTOCOL_HTTP_ONLY",
            "Uses HTTP instead of HTTPS".to_string(),
        ),
        (false, true) => (
            "redirect",
            Severity::Warning,
            "PROTOCOL_UNEXPECTED_REDIRECT",
            format!("Redirects with status {}", report.status_code),
        ),
        (false, false) => ("https", Severity::Info, "PROTOCOL_HTTPS", "Uses HTTPS".to_string()),
    };

    (status, vec![Finding::new(severity, Category::Protocol, code, message)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(scheme: &str, status_code: u16, location: Option<&str>) -> ProtocolReport {
        ProtocolReport {
            scheme: scheme.to_string(),
            status_code,
            redirect_location: location.map(str::to_string),
        }
    }

    #[test]
    fn http_redirecting_to_https_is_informational() {
        let (status, findings) = analyze_protocol(&report("http", 301, Some("https://example.com/")));
        assert_eq!(status, "redirects_to_https");
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn plain_http_is_critical() {
        let (status, findings) = analyze_protocol(&report("http", 200, None));
        assert_eq!(status, "http_only");
        assert_eq!(findings[0].severity, Severity::Critical);

        let (_, findings) = analyze_protocol(&report("http", 302, Some("/login")));
        assert_eq!(findings[0].code, "PROTOCOL_HTTP_NO_HTTPS_REDIRECT");
        assert!(findings[0].is_critical());
    }

    #[test]
    fn https_outcomes() {
        let (status, findings) = analyze_protocol(&report("https", 200, None));
        assert_eq!(status, "https");
        assert_eq!(findings[0].severity, Severity::Info);

        let (status, findings) = analyze_protocol(&report("https", 308, Some("https://www.example.com/")));
        assert_eq!(status, "redirect");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].message, "Redirects with status 308");
    }

    #[test]
    fn not_modified_is_not_a_redirect() {
        let (status, _) = analyze_protocol(&report("https", 304, None));
        assert_eq!(status, "https");
    }
}
