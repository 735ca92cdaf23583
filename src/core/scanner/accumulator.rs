// src/core/scanner/accumulator.rs

use tracing::warn;

use super::ProbeOutput;
use crate::core::models::{
    CertificateBasicReport, CertificateDetails, CmsReport, CookieReport, ErrorKind, ExposedPathsReport, HeaderReport,
    ProbeError, ProbeKind, ProbeResult, ProtocolReport, ScanResults, VulnerabilityReport,
};

/// One write-once slot per probe, filled as tasks finish and read only after
/// the join barrier through `seal`.
#[derive(Debug, Default)]
pub struct Accumulator {
    protocol: Option<ProbeResult<ProtocolReport>>,
    certificate_basic: Option<ProbeResult<CertificateBasicReport>>,
    certificate_advanced: Option<ProbeResult<CertificateDetails>>,
    headers: Option<ProbeResult<HeaderReport>>,
    cookies: Option<ProbeResult<CookieReport>>,
    exposed_paths: Option<ProbeResult<ExposedPathsReport>>,
    cms: Option<ProbeResult<CmsReport>>,
    vulnerabilities: Option<ProbeResult<VulnerabilityReport>>,
}

fn fill<T>(slot: &mut Option<ProbeResult<T>>, probe: ProbeKind, result: ProbeResult<T>) -> bool {
    if slot.is_some() {
        warn!(probe = %probe, "Slot already written, discarding duplicate result.");
        return false;
    }
    *slot = Some(result);
    true
}

fn take<T>(slot: Option<ProbeResult<T>>, probe: ProbeKind) -> ProbeResult<T> {
    slot.unwrap_or_else(|| {
        warn!(probe = %probe, "Probe did not report before the join barrier.");
        ProbeResult::Error(ProbeError::new(probe, ErrorKind::Unknown, "probe did not report"))
    })
}

impl Accumulator {
    /// Stores `output` in its slot. Returns `false` if the slot was already
    /// written; the first result wins.
    pub fn record(&mut self, output: ProbeOutput) -> bool {
        let probe = output.probe();
        match output {
            ProbeOutput::Protocol(r) => fill(&mut self.protocol, probe, r),
            ProbeOutput::CertificateBasic(r) => fill(&mut self.certificate_basic, probe, r),
            ProbeOutput::CertificateAdvanced(r) => fill(&mut self.certificate_advanced, probe, r),
            ProbeOutput::Headers(r) => fill(&mut self.headers, probe, r),
            ProbeOutput::Cookies(r) => fill(&mut self.cookies, probe, r),
            ProbeOutput::ExposedPaths(r) => fill(&mut self.exposed_paths, probe, r),
            ProbeOutput::Cms(r) => fill(&mut self.cms, probe, r),
            ProbeOutput::Vulnerabilities(r) => fill(&mut self.vulnerabilities, probe, r),
        }
    }

    pub fn is_filled(&self, probe: ProbeKind) -> bool {
        match probe {
            ProbeKind::Protocol => self.protocol.is_some(),
            ProbeKind::CertificateBasic => self.certificate_basic.is_some(),
            ProbeKind::CertificateAdvanced => self.certificate_advanced.is_some(),
            ProbeKind::Headers => self.headers.is_some(),
            ProbeKind::Cookies => self.cookies.is_some(),
            ProbeKind::ExposedPaths => self.exposed_paths.is_some(),
            ProbeKind::Cms => self.cms.is_some(),
            ProbeKind::Vulnerabilities => self.vulnerabilities.is_some(),
        }
    }

    /// Consumes the accumulator. Empty slots become `unknown` errors so the
    /// result always has all eight entries.
    pub fn seal(self) -> ScanResults {
        ScanResults {
            protocol_findings: take(self.protocol, ProbeKind::Protocol),
            certificate_basic: take(self.certificate_basic, ProbeKind::CertificateBasic),
            certificate_advanced: take(self.certificate_advanced, ProbeKind::CertificateAdvanced),
            header_results: take(self.headers, ProbeKind::Headers),
            cookie_result: take(self.cookies, ProbeKind::Cookies),
            exposed_paths_result: take(self.exposed_paths, ProbeKind::ExposedPaths),
            cms_result: take(self.cms, ProbeKind::Cms),
            vulnerability_findings: take(self.vulnerabilities, ProbeKind::Vulnerabilities),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ProbeFindings;

    fn cms_findings(status: &str) -> ProbeOutput {
        ProbeOutput::Cms(ProbeResult::Findings(ProbeFindings::new(
            ProbeKind::Cms,
            status,
            Vec::new(),
            CmsReport::default(),
        )))
    }

    #[test]
    fn slots_are_write_once() {
        let mut acc = Accumulator::default();
        assert!(!acc.is_filled(ProbeKind::Cms));
        assert!(acc.record(cms_findings("first")));
        assert!(!acc.record(cms_findings("second")));
        assert!(acc.is_filled(ProbeKind::Cms));

        let sealed = acc.seal();
        assert_eq!(sealed.cms_result.outcome().map(|f| f.status.as_str()), Some("first"));
    }

    #[test]
    fn sealing_fills_missing_slots_with_errors() {
        let mut acc = Accumulator::default();
        acc.record(ProbeOutput::failed(ProbeKind::Headers, ErrorKind::Timeout, "slow"));
        let sealed = acc.seal();

        assert_eq!(sealed.header_results.error().map(|e| e.kind), Some(ErrorKind::Timeout));
        let missing = sealed.protocol_findings.error().unwrap();
        assert_eq!(missing.kind, ErrorKind::Unknown);
        assert_eq!(missing.message, "probe did not report");
        assert_eq!(sealed.errors().len(), 8);
    }
}
