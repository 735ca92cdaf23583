// src/core/scanner/fingerprint_scanner.rs

use async_trait::async_trait;
use tracing::{debug, info};

use super::Probe;
use crate::core::config::ScanConfig;
use crate::core::http::{build_client, request_error, Redirects};
use crate::core::models::{
    Category, CmsReport, Finding, ProbeFindings, ProbeKind, ProbeResult, ScanResult, Severity, Target,
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};

/// Where a CMS marker is looked for.
enum Marker {
    /// Substring of the lowercased HTML body.
    Body(&'static str),
    /// Substring of any response header name.
    HeaderName(&'static str),
}

/// One platform signature. Signatures are tried in order and the first match wins.
struct CmsSignature {
    name: &'static str,
    markers: &'static [Marker],
    indicator: &'static str,
    /// Version pattern applied to the lowercased body.
    body_version: Option<&'static Lazy<Regex>>,
    /// Version pattern applied to `<meta name="generator">`.
    generator_version: Option<&'static Lazy<Regex>>,
    hardening: &'static [&'static str],
}

static RE_WP_ASSET_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"wp-includes.*?ver=([0-9.]+)").unwrap());
static RE_GEN_WORDPRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)wordpress\s+([\d.]+)").unwrap());
static RE_GEN_JOOMLA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)joomla!?\s+([\d.]+)").unwrap());
static RE_GEN_DRUPAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)drupal\s+([\d.]+)").unwrap());
static RE_GEN_MAGENTO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)magento\s+([\d.]+)").unwrap());

static SIGNATURES: &[CmsSignature] = &[
    CmsSignature {
        name: "WordPress",
        markers: &[Marker::Body("wp-content"), Marker::Body("wp-includes")],
        indicator: "wp-content/ or wp-includes/ detected",
        body_version: Some(&RE_WP_ASSET_VERSION),
        generator_version: Some(&RE_GEN_WORDPRESS),
        hardening: &[
            "WordPress: keep plugins and themes up to date",
            "WordPress: hide the version number from public pages",
        ],
    },
    CmsSignature {
        name: "Joomla",
        markers: &[Marker::Body("joomla"), Marker::Body("/components/com_")],
        indicator: "Joomla components detected",
        body_version: None,
        generator_version: Some(&RE_GEN_JOOMLA),
        hardening: &[
            "Joomla: keep extensions up to date",
            "Joomla: restrict access to /administrator",
        ],
    },
    CmsSignature {
        name: "Drupal",
        markers: &[Marker::Body("drupal"), Marker::Body("sites/default/files")],
        indicator: "Drupal structure detected",
        body_version: None,
        generator_version: Some(&RE_GEN_DRUPAL),
        hardening: &["Drupal: apply core security advisories promptly"],
    },
    CmsSignature {
        name: "Shopify",
        markers: &[Marker::Body("shopify"), Marker::Body("cdn.shopify.com")],
        indicator: "Shopify CDN detected",
        body_version: None,
        generator_version: None,
        hardening: &["Shopify: review the permissions granted to installed apps"],
    },
    CmsSignature {
        name: "Wix",
        markers: &[Marker::Body("wix.com"), Marker::HeaderName("x-wix")],
        indicator: "Wix platform detected",
        body_version: None,
        generator_version: None,
        hardening: &["Wix: review third-party app permissions and member access"],
    },
    CmsSignature {
        name: "Magento",
        markers: &[Marker::Body("magento"), Marker::Body("mage/cookies.js")],
        indicator: "Magento detected",
        body_version: None,
        generator_version: Some(&RE_GEN_MAGENTO),
        hardening: &[
            "Magento: apply security patches as soon as they are released",
            "Magento: move the admin panel away from the default path",
        ],
    },
];

pub struct CmsFingerprintProbe {
    config: ScanConfig,
}

impl CmsFingerprintProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for CmsFingerprintProbe {
    type Details = CmsReport;

    fn kind(&self) -> ProbeKind {
        ProbeKind::Cms
    }

    async fn run(&self, target: &Target) -> ProbeResult<CmsReport> {
        run_fingerprint_scan(target, &self.config).await.into()
    }
}

/// Performs the CMS fingerprint scan on the body and headers of a single GET.
///
/// # Arguments
///
/// * `target` - The target to request.
/// * `config` - Shared network budgets and user agent.
///
/// # Returns
///
/// A `ScanResult` holding the `CmsReport`, or a classified `ProbeError`.
async fn run_fingerprint_scan(target: &Target, config: &ScanConfig) -> ScanResult<CmsReport> {
    info!(target = %target, "Starting CMS fingerprint scan.");
    let client = build_client(ProbeKind::Cms, config, Redirects::Follow, config.request_timeout)?;

    let response = client
        .get(target.as_str())
        .send()
        .await
        .map_err(|e| request_error(ProbeKind::Cms, &e))?;
    info!(status = %response.status(), "Received HTTP response.");

    let headers = response.headers().clone();
    let body = response.text().await.map_err(|e| request_error(ProbeKind::Cms, &e))?;
    debug!(bytes = body.len(), "Successfully read response body.");

    let report = detect_cms(&body, &headers);
    let (status, findings) = analyze_cms(&report);
    info!(status, cms = ?report.cms, version = ?report.version, "CMS fingerprint scan finished.");
    Ok(ProbeFindings::new(ProbeKind::Cms, status, findings, report))
}

fn marker_matches(marker: &Marker, body_lower: &str, headers: &HeaderMap) -> bool {
    match marker {
        Marker::Body(needle) => body_lower.contains(needle),
        Marker::HeaderName(needle) => headers.keys().any(|name| name.as_str().contains(needle)),
    }
}

/// Applies a regex and returns its first capture group, if any.
fn check_with_regex(text: Option<&str>, re: &Regex) -> Option<String> {
    text.and_then(|text| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .filter(|s| !s.is_empty())
}

/// Reads `<meta name="generator" content="...">` from the parsed page.
fn generator_meta(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("meta[name='generator']").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
}

/// Runs the ordered signature list against a page. The first signature with a
/// matching marker wins.
///
/// # Arguments
///
/// * `body` - The HTML of the page.
/// * `headers` - The response headers, for header-based markers.
///
/// # Returns
///
/// A `CmsReport` naming the CMS and, when the generator meta tag or a version
/// pattern reveals it, its version. Empty when nothing matched.
pub fn detect_cms(body: &str, headers: &HeaderMap) -> CmsReport {
    let body_lower = body.to_lowercase();

    let Some(signature) = SIGNATURES
        .iter()
        .find(|sig| sig.markers.iter().any(|m| marker_matches(m, &body_lower, headers)))
    else {
        debug!("No CMS signature matched.");
        return CmsReport::default();
    };
    debug!(cms = signature.name, "CMS signature matched.");

    let generator = signature.generator_version.and_then(|re| check_with_regex(generator_meta(body).as_deref(), re));
    let version = signature
        .body_version
        .and_then(|re| check_with_regex(Some(&body_lower), re))
        .or(generator);

    let mut warnings: Vec<String> = signature.hardening.iter().map(|w| w.to_string()).collect();
    if let Some(v) = &version {
        warnings.push(format!("Detected version: {}", v));
    }

    CmsReport {
        cms: Some(signature.name.to_string()),
        version,
        indicators: vec![signature.indicator.to_string()],
        warnings,
    }
}

/// One `CMS_DETECTED` finding followed by the hardening advice for that CMS.
/// Status is `"detected"` or `"none"`.
pub fn analyze_cms(report: &CmsReport) -> (&'static str, Vec<Finding>) {
    let Some(cms) = &report.cms else {
        return (
            "none",
            vec![Finding::new(Severity::Info, Category::Cms, "CMS_NONE", "No known CMS detected")],
        );
    };

    let detected = match &report.version {
        Some(version) => format!("CMS detected: {} {}", cms, version),
        None => format!("CMS detected: {}", cms),
    };
    let mut findings = vec![Finding::new(Severity::Info, Category::Cms, "CMS_DETECTED", detected)];
    findings.extend(
        report
            .warnings
            .iter()
            .filter(|w| !w.starts_with("Detected version"))
            .map(|w| Finding::new(Severity::Warning, Category::Cms, "CMS_HARDENING", w.as_str())),
    );
    ("detected", findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wordpress_version_from_asset_query() {
        let body = r#"<html><link href="/wp-includes/css/style.min.css?ver=6.4.2"></html>"#;
        let report = detect_cms(body, &HeaderMap::new());
        assert_eq!(report.cms.as_deref(), Some("WordPress"));
        assert_eq!(report.version.as_deref(), Some("6.4.2"));
        assert!(report.warnings.iter().any(|w| w == "Detected version: 6.4.2"));
    }

    #[test]
    fn generator_meta_supplies_version() {
        let body = r#"<html><head><meta name="generator" content="Joomla! 4.2 - Open Source Content Management"></head></html>"#;
        let report = detect_cms(body, &HeaderMap::new());
        assert_eq!(report.cms.as_deref(), Some("Joomla"));
        assert_eq!(report.version.as_deref(), Some("4.2"));
    }

    #[test]
    fn first_signature_wins() {
        // Mentions both WordPress and Shopify markers; WordPress is earlier.
        let body = "<script src='https://cdn.shopify.com/x.js'></script><img src='/wp-content/a.png'>";
        let report = detect_cms(body, &HeaderMap::new());
        assert_eq!(report.cms.as_deref(), Some("WordPress"));
    }

    #[test]
    fn wix_is_found_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-wix-request-id", "abc".parse().unwrap());
        let report = detect_cms("<html></html>", &headers);
        assert_eq!(report.cms.as_deref(), Some("Wix"));
    }

    #[test]
    fn unknown_site_is_informational() {
        let report = detect_cms("<html><body>hello</body></html>", &HeaderMap::new());
        assert_eq!(report.cms, None);
        let (status, findings) = analyze_cms(&report);
        assert_eq!(status, "none");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn detected_platform_carries_hardening_warnings() {
        let report = detect_cms("<div class='magento'></div>", &HeaderMap::new());
        let (status, findings) = analyze_cms(&report);
        assert_eq!(status, "detected");
        assert_eq!(findings[0].code, "CMS_DETECTED");
        assert_eq!(findings.iter().filter(|f| f.code == "CMS_HARDENING").count(), 2);
    }
}
