// src/core/scanner/cookie_scanner.rs

use async_trait::async_trait;
use tracing::{debug, info};

use super::Probe;
use crate::core::config::ScanConfig;
use crate::core::http::{build_client, request_error, set_cookie_lines, Redirects};
use crate::core::models::{
    Category, CookieAssessment, CookieReport, Finding, ProbeFindings, ProbeKind, ProbeResult, ScanResult, Severity,
    Target,
};

pub struct CookieProbe {
    config: ScanConfig,
}

impl CookieProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for CookieProbe {
    type Details = CookieReport;

    fn kind(&self) -> ProbeKind {
        ProbeKind::Cookies
    }

    async fn run(&self, target: &Target) -> ProbeResult<CookieReport> {
        run_cookie_scan(target, &self.config).await.into()
    }
}

/// Attributes of a single `Set-Cookie` line that matter for the assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
}

/// Parses one `Set-Cookie` header value. Attribute names are matched without
/// regard to case.
///
/// # Arguments
///
/// * `line` - The raw header value, e.g. `sid=1; Path=/; HttpOnly`.
///
/// # Returns
///
/// The cookie name and its `Secure`, `HttpOnly` and `SameSite` attributes, or
/// `None` when there is no cookie name.
pub fn parse_set_cookie(line: &str) -> Option<SetCookie> {
    let mut parts = line.split(';');
    let pair = parts.next()?.trim();
    let name = pair.split_once('=').map_or(pair, |(name, _)| name).trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = SetCookie {
        name: name.to_string(),
        secure: false,
        http_only: false,
        same_site: None,
    };

    for attr in parts {
        let (key, value) = match attr.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (attr.trim(), None),
        };
        match key.to_ascii_lowercase().as_str() {
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "samesite" => cookie.same_site = value.filter(|v| !v.is_empty()).map(str::to_string),
            _ => {}
        }
    }

    Some(cookie)
}

/// Performs the cookie scan on the `Set-Cookie` lines of a single GET.
///
/// # Arguments
///
/// * `target` - The target to request. Its scheme decides whether `Secure` is required.
/// * `config` - Shared network budgets and user agent.
///
/// # Returns
///
/// A `ScanResult` holding the `CookieReport`, or a classified `ProbeError`.
async fn run_cookie_scan(target: &Target, config: &ScanConfig) -> ScanResult<CookieReport> {
    info!(target = %target, "Starting cookie scan.");
    let client = build_client(ProbeKind::Cookies, config, Redirects::Follow, config.request_timeout)?;

    let response = client
        .get(target.as_str())
        .send()
        .await
        .map_err(|e| request_error(ProbeKind::Cookies, &e))?;

    let cookies: Vec<SetCookie> = set_cookie_lines(response.headers())
        .iter()
        .filter_map(|line| parse_set_cookie(line))
        .collect();
    debug!(count = cookies.len(), "Parsed Set-Cookie headers.");

    let (status, findings, report) = analyze_cookies(&cookies, target.is_https());
    info!(status, findings = findings.len(), "Cookie scan finished.");
    Ok(ProbeFindings::new(ProbeKind::Cookies, status, findings, report))
}

/// One finding per missing flag per cookie. `Secure` is only required when
/// the target itself is served over HTTPS.
///
/// # Arguments
///
/// * `cookies` - Parsed cookies in header order.
/// * `is_https` - Whether the target is served over HTTPS.
///
/// # Returns
///
/// A tuple containing:
/// - The status: `"no_cookies"`, `"secure"` or `"issues_found"`.
/// - The findings, all warnings.
/// - The per-cookie assessment.
pub fn analyze_cookies(cookies: &[SetCookie], is_https: bool) -> (&'static str, Vec<Finding>, CookieReport) {
    if cookies.is_empty() {
        return ("no_cookies", Vec::new(), CookieReport::default());
    }

    let mut findings = Vec::new();
    let mut assessments = Vec::with_capacity(cookies.len());

    for cookie in cookies {
        let mut issues = Vec::new();

        if is_https && !cookie.secure {
            issues.push("Missing Secure flag".to_string());
            findings.push(Finding::new(
                Severity::Warning,
                Category::Cookie,
                "COOKIE_SECURE_MISSING",
                format!("Cookie '{}': missing Secure flag", cookie.name),
            ));
        }
        if !cookie.http_only {
            issues.push("Missing HttpOnly flag".to_string());
            findings.push(Finding::new(
                Severity::Warning,
                Category::Cookie,
                "COOKIE_HTTPONLY_MISSING",
                format!("Cookie '{}': missing HttpOnly flag", cookie.name),
            ));
        }
        let weak_same_site = match cookie.same_site.as_deref() {
            None => true,
            Some(value) => value.eq_ignore_ascii_case("none"),
        };
        if weak_same_site {
            issues.push("SameSite not configured".to_string());
            findings.push(Finding::new(
                Severity::Warning,
                Category::Cookie,
                "COOKIE_SAMESITE_MISSING",
                format!("Cookie '{}': SameSite missing or None", cookie.name),
            ));
        }

        assessments.push(CookieAssessment {
            name: cookie.name.clone(),
            secure: cookie.secure,
            http_only: cookie.http_only,
            same_site: cookie.same_site.clone(),
            issues,
        });
    }

    let status = if findings.is_empty() { "secure" } else { "issues_found" };
    let report = CookieReport { cookies_analyzed: assessments.len(), cookies: assessments };
    (status, findings, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_case_insensitive() {
        let cookie = parse_set_cookie("sid=abc; path=/; SECURE; httpOnly; samesite=Lax").unwrap();
        assert_eq!(cookie.name, "sid");
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site.as_deref(), Some("Lax"));
    }

    #[test]
    fn nameless_lines_are_skipped() {
        assert!(parse_set_cookie("=value; Secure").is_none());
        assert!(parse_set_cookie("").is_none());
        assert_eq!(parse_set_cookie("flag").unwrap().name, "flag");
    }

    #[test]
    fn no_cookies_is_a_status_not_a_finding() {
        let (status, findings, report) = analyze_cookies(&[], true);
        assert_eq!(status, "no_cookies");
        assert!(findings.is_empty());
        assert_eq!(report.cookies_analyzed, 0);
    }

    #[test]
    fn each_missing_flag_is_one_finding() {
        let cookies = vec![parse_set_cookie("sid=1; SameSite=None").unwrap()];
        let (status, findings, report) = analyze_cookies(&cookies, true);
        assert_eq!(status, "issues_found");
        assert_eq!(findings.len(), 3);
        assert_eq!(report.cookies[0].issues.len(), 3);
        assert!(findings.iter().all(|f| f.message.contains("'sid'")));
    }

    #[test]
    fn secure_is_only_required_over_https() {
        let cookies = vec![parse_set_cookie("sid=1; HttpOnly; SameSite=Strict").unwrap()];
        let (status, findings, _) = analyze_cookies(&cookies, false);
        assert_eq!(status, "secure");
        assert!(findings.is_empty());

        let (_, findings, _) = analyze_cookies(&cookies, true);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, "COOKIE_SECURE_MISSING");
    }
}
