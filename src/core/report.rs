// src/core/report.rs

use chrono::Utc;
use std::fmt::Write as _;
use tracing::{info, warn};

use crate::core::models::{
    Narrative, ProbeKind, ProbeResult, Report, RiskAssessment, ScanResults, Severity, Target,
};
use crate::core::narrative::{NarrativeGenerator, NarrativeRequest};

/// The only place a `Report` is built. Each report is created once, with its
/// narrative already folded in.
pub struct ReportAssembler<'a> {
    narrator: &'a dyn NarrativeGenerator,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(narrator: &'a dyn NarrativeGenerator) -> Self {
        Self { narrator }
    }

    /// Builds a report with no narrative at all.
    pub fn without_narrative(target: Target, results: ScanResults, assessment: RiskAssessment) -> Report {
        Report {
            target,
            assessed_at: Utc::now(),
            results,
            risk_score: assessment.score,
            risk_tier: assessment.tier,
            score_breakdown: assessment.breakdown,
            narrative: None,
        }
    }

    /// Merges results and score, then asks the narrator for prose. A narrator
    /// failure becomes `Narrative::Unavailable`; the report is complete either way.
    pub async fn assemble(&self, target: Target, results: ScanResults, assessment: RiskAssessment) -> Report {
        let draft = Self::without_narrative(target, results, assessment);
        let request = narrative_request(&draft);

        let narrative = match self.narrator.generate(&request).await {
            Ok(text) => {
                info!(narrator = self.narrator.name(), chars = text.len(), "Narrative attached.");
                Narrative::Generated { text, generated_at: Utc::now() }
            }
            Err(e) => {
                warn!(narrator = self.narrator.name(), error = %e, "Narrative unavailable.");
                Narrative::Unavailable { reason: e.to_string() }
            }
        };

        Report { narrative: Some(narrative), ..draft }
    }
}

pub fn narrative_request(report: &Report) -> NarrativeRequest {
    NarrativeRequest {
        target: report.target().clone(),
        risk_score: report.risk_score(),
        risk_tier: report.risk_tier(),
        formatted_findings: format_findings(report.results()),
        unavailable: unavailable_probes(report.results()),
    }
}

pub fn unavailable_probes(results: &ScanResults) -> Vec<ProbeKind> {
    results.errors().into_iter().map(|e| e.probe).collect()
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "CRITICAL",
        Severity::Warning => "WARNING",
        Severity::Info => "INFO",
    }
}

fn write_section<T>(out: &mut String, kind: ProbeKind, result: &ProbeResult<T>) {
    let _ = writeln!(out, "## {}", kind.title());
    match result {
        ProbeResult::Findings(f) => {
            let _ = writeln!(out, "- Status: {}", f.status);
            for finding in &f.findings {
                let _ = writeln!(out, "- [{}] {}", severity_label(finding.severity), finding.message);
            }
        }
        ProbeResult::Error(e) => {
            let _ = writeln!(out, "- UNAVAILABLE ({}): {}", e.kind, e.message);
        }
    }
}

/// Plain-text digest of every probe, one section each. Failed probes are
/// marked unavailable rather than omitted.
pub fn format_findings(results: &ScanResults) -> String {
    let mut out = String::new();
    write_section(&mut out, ProbeKind::Protocol, &results.protocol_findings);
    write_section(&mut out, ProbeKind::CertificateBasic, &results.certificate_basic);

    write_section(&mut out, ProbeKind::CertificateAdvanced, &results.certificate_advanced);
    if let Some(cert) = results.certificate_advanced.outcome() {
        let d = &cert.details;
        let _ = writeln!(out, "- Days until expiry: {}", d.days_until_expiry);
        let _ = writeln!(out, "- Protocol: {}", d.protocol_version);
        if let Some(org) = &d.issuer_organization {
            let _ = writeln!(out, "- Issuer: {}", org);
        }
    }

    write_section(&mut out, ProbeKind::Headers, &results.header_results);
    write_section(&mut out, ProbeKind::Vulnerabilities, &results.vulnerability_findings);

    write_section(&mut out, ProbeKind::ExposedPaths, &results.exposed_paths_result);
    if let Some(paths) = results.exposed_paths_result.outcome() {
        let _ = writeln!(out, "- Total exposed: {}", paths.details.total_exposed);
    }

    write_section(&mut out, ProbeKind::Cookies, &results.cookie_result);
    if let Some(cookies) = results.cookie_result.outcome() {
        let _ = writeln!(out, "- Cookies analysed: {}", cookies.details.cookies_analyzed);
    }

    write_section(&mut out, ProbeKind::Cms, &results.cms_result);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ErrorKind, ProbeError, RiskTier};
    use crate::core::narrative::{NarrativeError, NarrativeGenerator};
    use crate::core::scanner::accumulator::Accumulator;
    use crate::core::scanner::ProbeOutput;
    use crate::core::scoring;
    use async_trait::async_trait;

    struct FixedNarrator(Result<&'static str, ()>);

    #[async_trait]
    impl NarrativeGenerator for FixedNarrator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
            assert!(request.formatted_findings.contains("## Protocol"));
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(NarrativeError::InvalidResponse("boom".into())),
            }
        }
    }

    fn results_with_cert_timeout() -> ScanResults {
        let mut acc = Accumulator::default();
        acc.record(ProbeOutput::CertificateAdvanced(ProbeResult::Error(ProbeError::new(
            ProbeKind::CertificateAdvanced,
            ErrorKind::Timeout,
            "TLS handshake timed out",
        ))));
        acc.seal()
    }

    #[test]
    fn digest_marks_failed_probes() {
        let text = format_findings(&results_with_cert_timeout());
        assert!(text.contains("## SSL/TLS Certificate\n- UNAVAILABLE (timeout): TLS handshake timed out"));
        assert_eq!(unavailable_probes(&results_with_cert_timeout()).len(), 8);
    }

    #[tokio::test]
    async fn narrative_is_folded_in() {
        let results = results_with_cert_timeout();
        let assessment = scoring::assess(&results);
        let narrator = FixedNarrator(Ok("All good."));
        let target = Target::parse("https://example.com").unwrap();

        let report = ReportAssembler::new(&narrator).assemble(target, results, assessment).await;
        assert_eq!(report.risk_tier(), RiskTier::VeryLow);
        assert_eq!(report.narrative().and_then(Narrative::text), Some("All good."));
    }

    #[tokio::test]
    async fn narrator_failure_still_yields_report() {
        let results = results_with_cert_timeout();
        let assessment = scoring::assess(&results);
        let narrator = FixedNarrator(Err(()));
        let target = Target::parse("https://example.com").unwrap();

        let report = ReportAssembler::new(&narrator).assemble(target, results, assessment).await;
        assert!(matches!(report.narrative(), Some(Narrative::Unavailable { .. })));
        assert_eq!(report.risk_score(), 0);
    }
}
