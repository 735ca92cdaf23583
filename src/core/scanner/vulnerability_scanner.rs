// src/core/scanner/vulnerability_scanner.rs

use async_trait::async_trait;
use tracing::{debug, info};

use super::cookie_scanner::parse_set_cookie;
use super::Probe;
use crate::core::config::ScanConfig;
use crate::core::http::{build_client, header_value, request_error, set_cookie_lines, Redirects};
use crate::core::models::{
    Category, Finding, ProbeFindings, ProbeKind, ProbeResult, ScanResult, Severity, Target, VulnerabilityReport,
};
use reqwest::header::HeaderMap;

/// Quick heuristics over a single GET. Overlap with the header and cookie
/// probes is expected: these findings are what the risk score counts.
pub struct VulnerabilityHeuristicProbe {
    config: ScanConfig,
}

impl VulnerabilityHeuristicProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for VulnerabilityHeuristicProbe {
    type Details = VulnerabilityReport;

    fn kind(&self) -> ProbeKind {
        ProbeKind::Vulnerabilities
    }

    async fn run(&self, target: &Target) -> ProbeResult<VulnerabilityReport> {
        run_vulnerability_scan(target, &self.config).await.into()
    }
}

/// Performs the vulnerability heuristics on a single GET, following redirects.
///
/// # Arguments
///
/// * `target` - The target to request.
/// * `config` - Shared network budgets and user agent.
///
/// # Returns
///
/// A `ScanResult` holding the `VulnerabilityReport`, or a classified `ProbeError`.
async fn run_vulnerability_scan(target: &Target, config: &ScanConfig) -> ScanResult<VulnerabilityReport> {
    info!(target = %target, "Starting vulnerability heuristics scan.");
    let client = build_client(ProbeKind::Vulnerabilities, config, Redirects::Follow, config.request_timeout)?;

    let response = client
        .get(target.as_str())
        .send()
        .await
        .map_err(|e| request_error(ProbeKind::Vulnerabilities, &e))?;

    let report = inspect_response(response.headers());
    let (status, findings) = analyze_vulnerabilities(&report);
    info!(status, findings = findings.len(), "Vulnerability heuristics scan finished.");
    Ok(ProbeFindings::new(ProbeKind::Vulnerabilities, status, findings, report))
}

/// Extracts the conditions the heuristics look at from a response.
///
/// # Arguments
///
/// * `headers` - The response headers.
///
/// # Returns
///
/// A `VulnerabilityReport` with the cookies lacking `HttpOnly`, whether HSTS
/// and CSP are set, and any disclosed `Server` or `X-Powered-By` value.
pub fn inspect_response(headers: &HeaderMap) -> VulnerabilityReport {
    let cookies_without_http_only = set_cookie_lines(headers)
        .iter()
        .filter_map(|line| parse_set_cookie(line))
        .filter(|cookie| !cookie.http_only)
        .map(|cookie| cookie.name)
        .collect();

    VulnerabilityReport {
        cookies_without_http_only,
        hsts_present: headers.contains_key("strict-transport-security"),
        csp_present: headers.contains_key("content-security-policy"),
        server: header_value(headers, "server"),
        powered_by: header_value(headers, "x-powered-by"),
    }
}

/// Exactly one finding per present condition. Every one of them is counted by
/// the risk score.
///
/// # Returns
///
/// A tuple of the status (`"no_issues"` or `"issues_found"`) and the findings.
pub fn analyze_vulnerabilities(report: &VulnerabilityReport) -> (&'static str, Vec<Finding>) {
    debug!("Analyzing vulnerability heuristics.");
    let mut findings = Vec::new();

    if !report.cookies_without_http_only.is_empty() {
        findings.push(Finding::new(
            Severity::Warning,
            Category::Vulnerability,
            "VULN_COOKIE_HTTPONLY",
            format!(
                "Cookies without HttpOnly (XSS risk): {}",
                report.cookies_without_http_only.join(", ")
            ),
        ));
    }
    if !report.hsts_present {
        findings.push(Finding::new(
            Severity::Warning,
            Category::Vulnerability,
            "VULN_HSTS_MISSING",
            "HSTS not configured (downgrade attacks possible)",
        ));
    }
    if !report.csp_present {
        findings.push(Finding::new(
            Severity::Warning,
            Category::Vulnerability,
            "VULN_CSP_MISSING",
            "CSP not configured (XSS risk)",
        ));
    }
    if let Some(server) = &report.server {
        findings.push(Finding::new(
            Severity::Info,
            Category::Vulnerability,
            "VULN_SERVER_DISCLOSED",
            format!("Server header exposes: {}", server),
        ));
    }
    if let Some(powered_by) = &report.powered_by {
        findings.push(Finding::new(
            Severity::Info,
            Category::Vulnerability,
            "VULN_POWERED_BY_DISCLOSED",
            format!("X-Powered-By exposes: {}", powered_by),
        ));
    }

    let status = if findings.is_empty() { "no_issues" } else { "issues_found" };
    (status, findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardened_response_has_no_findings() {
        let mut headers = HeaderMap::new();
        headers.insert("strict-transport-security", "max-age=63072000".parse().unwrap());
        headers.insert("content-security-policy", "default-src 'self'".parse().unwrap());
        headers.append("set-cookie", "sid=1; HttpOnly; Secure".parse().unwrap());

        let (status, findings) = analyze_vulnerabilities(&inspect_response(&headers));
        assert_eq!(status, "no_issues");
        assert!(findings.is_empty());
    }

    #[test]
    fn every_condition_yields_exactly_one_finding() {
        let mut headers = HeaderMap::new();
        headers.insert("server", "nginx/1.18.0".parse().unwrap());
        headers.insert("x-powered-by", "PHP/7.4".parse().unwrap());
        headers.append("set-cookie", "a=1".parse().unwrap());
        headers.append("set-cookie", "b=2".parse().unwrap());

        let report = inspect_response(&headers);
        assert_eq!(report.cookies_without_http_only, vec!["a", "b"]);

        let (_, findings) = analyze_vulnerabilities(&report);
        let codes: Vec<&str> = findings.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "VULN_COOKIE_HTTPONLY",
                "VULN_HSTS_MISSING",
                "VULN_CSP_MISSING",
                "VULN_SERVER_DISCLOSED",
                "VULN_POWERED_BY_DISCLOSED",
            ]
        );
    }
}
