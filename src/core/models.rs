// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter};
use thiserror::Error;
use url::Url;

// --- Tipi di Risultato Riutilizzabili ---
// Reusable Result Types
// What a probe computes internally before it is folded into a `ProbeResult`.
pub type ScanResult<T> = Result<ProbeFindings<T>, ProbeError>;

// --- Target ---

/// Reasons a raw URL string is rejected before any probe runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid URL '{input}': {reason}")]
    Malformed { input: String, reason: String },
    #[error("unsupported scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("URL '{0}' has no host")]
    MissingHost(String),
}

/// A validated absolute `http`/`https` URL. Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target {
    url: Url,
}

impl Target {
    pub fn parse(input: &str) -> Result<Self, TargetError> {
        let url = Url::parse(input.trim()).map_err(|e| TargetError::Malformed {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(TargetError::UnsupportedScheme(other.to_string())),
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self { url }),
            _ => Err(TargetError::MissingHost(input.to_string())),
        }
    }

    /// Parses what a user typed, assuming `https://` when no scheme was given.
    pub fn from_user_input(raw: &str) -> Result<Self, TargetError> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::parse(raw)
        } else {
            Self::parse(&format!("https://{}", raw))
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn is_https(&self) -> bool {
        self.url.scheme() == "https"
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// `scheme://host[:port]` without path, used as the base for path probes.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

impl TryFrom<String> for Target {
    type Error = TargetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Target::parse(&value)
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.url.into()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

// --- Modelli Dati Core ---
// Core Data Models

// The severity level of a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

// The machine category attached to every finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Category {
    Ssl,
    Header,
    Cookie,
    ExposedPath,
    Cms,
    Vulnerability,
    Protocol,
}

// The smallest observational unit. `code` keys into the knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub category: Category,
    pub code: String,
    pub message: String,
}

impl Finding {
    pub fn new(severity: Severity, category: Category, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// The fixed set of probes a run fans out to.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProbeKind {
    Protocol,
    CertificateBasic,
    CertificateAdvanced,
    Headers,
    Cookies,
    ExposedPaths,
    Cms,
    Vulnerabilities,
}

impl ProbeKind {
    pub fn category(self) -> Category {
        match self {
            ProbeKind::Protocol => Category::Protocol,
            ProbeKind::CertificateBasic | ProbeKind::CertificateAdvanced => Category::Ssl,
            ProbeKind::Headers => Category::Header,
            ProbeKind::Cookies => Category::Cookie,
            ProbeKind::ExposedPaths => Category::ExposedPath,
            ProbeKind::Cms => Category::Cms,
            ProbeKind::Vulnerabilities => Category::Vulnerability,
        }
    }

    /// Human-readable section title.
    pub fn title(self) -> &'static str {
        match self {
            ProbeKind::Protocol => "Protocol",
            ProbeKind::CertificateBasic => "SSL/TLS (basic)",
            ProbeKind::CertificateAdvanced => "SSL/TLS Certificate",
            ProbeKind::Headers => "HTTP Security Headers",
            ProbeKind::Cookies => "Cookies",
            ProbeKind::ExposedPaths => "Exposed Files",
            ProbeKind::Cms => "CMS Detection",
            ProbeKind::Vulnerabilities => "Vulnerability Heuristics",
        }
    }
}

// --- Errori delle Sonde ---
// Probe Errors

/// Failure taxonomy shared by every probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    DnsFailure,
    ConnectionRefused,
    TlsFailure,
    HttpError,
    ParseError,
    Unknown,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{probe} probe failed ({kind}): {message}")]
pub struct ProbeError {
    #[serde(rename = "probe_id")]
    pub probe: ProbeKind,
    #[serde(rename = "error_kind")]
    pub kind: ErrorKind,
    pub message: String,
}

impl ProbeError {
    pub fn new(probe: ProbeKind, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { probe, kind, message: message.into() }
    }
}

/// A probe's successful observation set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeFindings<T> {
    #[serde(rename = "probe_id")]
    pub probe: ProbeKind,
    pub status: String,
    pub findings: Vec<Finding>,
    pub details: T,
}

impl<T> ProbeFindings<T> {
    pub fn new(probe: ProbeKind, status: &str, findings: Vec<Finding>, details: T) -> Self {
        Self { probe, status: status.to_string(), findings, details }
    }
}

/// Tagged outcome of one probe run. Never an `Err` in the Rust sense: failures
/// are data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeResult<T> {
    Findings(ProbeFindings<T>),
    Error(ProbeError),
}

impl<T> ProbeResult<T> {
    pub fn probe(&self) -> ProbeKind {
        match self {
            ProbeResult::Findings(f) => f.probe,
            ProbeResult::Error(e) => e.probe,
        }
    }

    pub fn outcome(&self) -> Option<&ProbeFindings<T>> {
        match self {
            ProbeResult::Findings(f) => Some(f),
            ProbeResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match self {
            ProbeResult::Findings(_) => None,
            ProbeResult::Error(e) => Some(e),
        }
    }

    /// Findings of a successful run; empty for an errored probe.
    pub fn findings(&self) -> &[Finding] {
        self.outcome().map(|f| f.findings.as_slice()).unwrap_or_default()
    }
}

impl<T> From<ScanResult<T>> for ProbeResult<T> {
    fn from(result: ScanResult<T>) -> Self {
        match result {
            Ok(findings) => ProbeResult::Findings(findings),
            Err(error) => ProbeResult::Error(error),
        }
    }
}

// --- Modelli delle Sonde ---
// Per-probe detail models

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolReport {
    pub scheme: String,
    pub status_code: u16,
    pub redirect_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateBasicReport {
    pub final_url: String,
    pub is_https: bool,
    pub protocol: String,
    pub upgraded_from_http: bool,
}

// Leaf certificate fields extracted by the advanced certificate probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateDetails {
    pub hostname: String,
    pub subject: String,
    pub issuer: String,
    pub issuer_organization: Option<String>,
    pub serial_number: String,
    pub subject_alt_names: Vec<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub protocol_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum HeaderPresence {
    Present { value: String },
    Absent,
}

impl HeaderPresence {
    pub fn is_present(&self) -> bool {
        matches!(self, HeaderPresence::Present { .. })
    }
}

// Keyed by the canonical header name, e.g. "Content-Security-Policy".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HeaderReport {
    pub headers: BTreeMap<String, HeaderPresence>,
}

impl HeaderReport {
    pub fn present_count(&self) -> usize {
        self.headers.values().filter(|h| h.is_present()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieAssessment {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CookieReport {
    pub cookies_analyzed: usize,
    pub cookies: Vec<CookieAssessment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExposedPath {
    pub path: String,
    pub status_code: u16,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExposedPathsReport {
    pub critical_exposed: Vec<ExposedPath>,
    pub warnings: Vec<ExposedPath>,
    pub public_files: Vec<ExposedPath>,
    pub total_exposed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CmsReport {
    pub cms: Option<String>,
    pub version: Option<String>,
    pub indicators: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VulnerabilityReport {
    pub cookies_without_http_only: Vec<String>,
    pub hsts_present: bool,
    pub csp_present: bool,
    pub server: Option<String>,
    pub powered_by: Option<String>,
}

// --- Risultati Aggregati ---
// Aggregated Results

/// One result per probe, sealed after the join barrier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanResults {
    pub protocol_findings: ProbeResult<ProtocolReport>,
    pub certificate_basic: ProbeResult<CertificateBasicReport>,
    pub certificate_advanced: ProbeResult<CertificateDetails>,
    pub header_results: ProbeResult<HeaderReport>,
    pub cookie_result: ProbeResult<CookieReport>,
    pub exposed_paths_result: ProbeResult<ExposedPathsReport>,
    pub cms_result: ProbeResult<CmsReport>,
    pub vulnerability_findings: ProbeResult<VulnerabilityReport>,
}

impl ScanResults {
    /// Every finding grouped by the probe that produced it, in probe order.
    pub fn findings_by_probe(&self) -> Vec<(ProbeKind, &[Finding])> {
        vec![
            (ProbeKind::Protocol, self.protocol_findings.findings()),
            (ProbeKind::CertificateBasic, self.certificate_basic.findings()),
            (ProbeKind::CertificateAdvanced, self.certificate_advanced.findings()),
            (ProbeKind::Headers, self.header_results.findings()),
            (ProbeKind::Cookies, self.cookie_result.findings()),
            (ProbeKind::ExposedPaths, self.exposed_paths_result.findings()),
            (ProbeKind::Cms, self.cms_result.findings()),
            (ProbeKind::Vulnerabilities, self.vulnerability_findings.findings()),
        ]
    }

    pub fn all_findings(&self) -> Vec<&Finding> {
        self.findings_by_probe()
            .into_iter()
            .flat_map(|(_, findings)| findings.iter())
            .collect()
    }

    /// Probes that produced an error instead of findings.
    pub fn errors(&self) -> Vec<&ProbeError> {
        [
            self.protocol_findings.error(),
            self.certificate_basic.error(),
            self.certificate_advanced.error(),
            self.header_results.error(),
            self.cookie_result.error(),
            self.exposed_paths_result.error(),
            self.cms_result.error(),
            self.vulnerability_findings.error(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// --- Punteggio ---
// Scoring

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

// Points contributed by each scored category, before clamping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScoreBreakdown {
    pub vulnerabilities: u32,
    pub exposed_paths: u32,
    pub certificate: u32,
    pub cookies: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.vulnerabilities + self.exposed_paths + self.certificate + self.cookies
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskAssessment {
    pub score: u8,
    pub tier: RiskTier,
    pub breakdown: ScoreBreakdown,
}

// --- Report Principale ---
// Main Report

/// Outcome of asking the narrative collaborator for prose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Narrative {
    Generated { text: String, generated_at: DateTime<Utc> },
    Unavailable { reason: String },
}

impl Narrative {
    pub fn text(&self) -> Option<&str> {
        match self {
            Narrative::Generated { text, .. } => Some(text),
            Narrative::Unavailable { .. } => None,
        }
    }
}

/// The final, immutable record of one assessment run. Only the report
/// assembler constructs it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub(crate) target: Target,
    pub(crate) assessed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub(crate) results: ScanResults,
    pub(crate) risk_score: u8,
    pub(crate) risk_tier: RiskTier,
    pub(crate) score_breakdown: ScoreBreakdown,
    pub(crate) narrative: Option<Narrative>,
}

impl Report {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn assessed_at(&self) -> DateTime<Utc> {
        self.assessed_at
    }

    pub fn results(&self) -> &ScanResults {
        &self.results
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.risk_tier
    }

    pub fn score_breakdown(&self) -> ScoreBreakdown {
        self.score_breakdown
    }

    pub fn narrative(&self) -> Option<&Narrative> {
        self.narrative.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_accepts_http_and_https() {
        let target = Target::parse("https://example.com/shop?x=1").unwrap();
        assert!(target.is_https());
        assert_eq!(target.host(), "example.com");
        assert_eq!(target.origin(), "https://example.com");

        let plain = Target::parse("http://127.0.0.1:8080/").unwrap();
        assert!(!plain.is_https());
        assert_eq!(plain.origin(), "http://127.0.0.1:8080");
    }

    #[test]
    fn target_rejects_other_schemes_and_garbage() {
        assert_eq!(
            Target::parse("ftp://example.com"),
            Err(TargetError::UnsupportedScheme("ftp".into()))
        );
        assert!(matches!(Target::parse("not a url"), Err(TargetError::Malformed { .. })));
        assert!(Target::parse("https://").is_err());
    }

    #[test]
    fn user_input_defaults_to_https() {
        let target = Target::from_user_input("  example.org ").unwrap();
        assert_eq!(target.as_str(), "https://example.org/");
        let explicit = Target::from_user_input("http://example.org").unwrap();
        assert!(!explicit.is_https());
    }

    #[test]
    fn probe_result_serializes_as_tagged_union() {
        let err: ProbeResult<CmsReport> =
            ProbeResult::Error(ProbeError::new(ProbeKind::Cms, ErrorKind::Timeout, "no answer"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["outcome"], "error");
        assert_eq!(json["probe_id"], "cms");
        assert_eq!(json["error_kind"], "timeout");
        assert!(err.findings().is_empty());
    }

    #[test]
    fn enum_labels_match_wire_names() {
        assert_eq!(RiskTier::VeryLow.to_string(), "VERY_LOW");
        assert_eq!(Category::ExposedPath.to_string(), "exposed-path");
        assert_eq!(ErrorKind::DnsFailure.to_string(), "dns_failure");
        assert_eq!(ProbeKind::CertificateAdvanced.to_string(), "certificate_advanced");
    }
}
