// src/core/scoring.rs

//! Maps sealed scan results to a bounded risk score and tier.
//!
//! A probe that returned an error contributes zero points. On infrastructure
//! failure the score therefore errs low; consumers should read the report's
//! error entries alongside the score.

use crate::core::models::{RiskAssessment, RiskTier, ScanResults, ScoreBreakdown};

pub const VULNERABILITY_POINTS: u32 = 5;
pub const VULNERABILITY_CAP: u32 = 30;
pub const EXPOSED_PATH_POINTS: u32 = 20;
pub const EXPOSED_PATH_CAP: u32 = 40;
pub const CERTIFICATE_POINTS: u32 = 10;
pub const CERTIFICATE_CAP: u32 = 20;
pub const COOKIE_POINTS: u32 = 2;
pub const COOKIE_CAP: u32 = 10;
pub const MAX_SCORE: u32 = 100;

pub const CRITICAL_THRESHOLD: u8 = 80;
pub const HIGH_THRESHOLD: u8 = 60;
pub const MEDIUM_THRESHOLD: u8 = 30;

impl RiskTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= CRITICAL_THRESHOLD => RiskTier::Critical,
            s if s >= HIGH_THRESHOLD => RiskTier::High,
            s if s >= MEDIUM_THRESHOLD => RiskTier::Medium,
            0 => RiskTier::VeryLow,
            _ => RiskTier::Low,
        }
    }
}

fn capped(count: usize, points: u32, cap: u32) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX).saturating_mul(points).min(cap)
}

/// Per-category points. Header, protocol, basic certificate and CMS findings
/// are descriptive and never scored.
pub fn breakdown(results: &ScanResults) -> ScoreBreakdown {
    let vulnerabilities = results.vulnerability_findings.findings().len();

    let critical_paths = results
        .exposed_paths_result
        .outcome()
        .map(|f| f.details.critical_exposed.len())
        .unwrap_or(0);

    let certificate_issues = results
        .certificate_advanced
        .findings()
        .iter()
        .filter(|f| f.is_critical())
        .count();

    let cookie_issues = results.cookie_result.findings().len();

    ScoreBreakdown {
        vulnerabilities: capped(vulnerabilities, VULNERABILITY_POINTS, VULNERABILITY_CAP),
        exposed_paths: capped(critical_paths, EXPOSED_PATH_POINTS, EXPOSED_PATH_CAP),
        certificate: capped(certificate_issues, CERTIFICATE_POINTS, CERTIFICATE_CAP),
        cookies: capped(cookie_issues, COOKIE_POINTS, COOKIE_CAP),
    }
}

pub fn assess(results: &ScanResults) -> RiskAssessment {
    let breakdown = breakdown(results);
    let score = breakdown.total().min(MAX_SCORE) as u8;
    RiskAssessment {
        score,
        tier: RiskTier::from_score(score),
        breakdown,
    }
}
