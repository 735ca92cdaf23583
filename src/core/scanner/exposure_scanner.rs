// src/core/scanner/exposure_scanner.rs

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::Probe;
use crate::core::config::ScanConfig;
use crate::core::http::{build_client, Redirects};
use crate::core::models::{
    Category, ExposedPath, ExposedPathsReport, Finding, ProbeFindings, ProbeKind, ProbeResult, ScanResult, Severity,
    Target,
};

/// How a path is judged when it answers 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Source control metadata, environment files, backups and dumps.
    Sensitive,
    Admin,
    /// Files a public site is expected to serve.
    ExpectedPublic,
    /// Documented API entry points.
    ApiSurface,
}

pub const PATH_CATALOGUE: [(&str, PathClass); 21] = [
    ("/.git/HEAD", PathClass::Sensitive),
    ("/.git/config", PathClass::Sensitive),
    ("/.env", PathClass::Sensitive),
    ("/.env.local", PathClass::Sensitive),
    ("/.env.production", PathClass::Sensitive),
    ("/admin", PathClass::Admin),
    ("/admin/", PathClass::Admin),
    ("/wp-admin", PathClass::Admin),
    ("/wp-admin/", PathClass::Admin),
    ("/phpmyadmin", PathClass::Admin),
    ("/phpmyadmin/", PathClass::Admin),
    ("/backup.zip", PathClass::Sensitive),
    ("/backup.sql", PathClass::Sensitive),
    ("/database.sql", PathClass::Sensitive),
    ("/db.sql", PathClass::Sensitive),
    ("/.well-known/security.txt", PathClass::ExpectedPublic),
    ("/robots.txt", PathClass::ExpectedPublic),
    ("/sitemap.xml", PathClass::ExpectedPublic),
    ("/api/", PathClass::ApiSurface),
    ("/swagger", PathClass::ApiSurface),
    ("/graphql", PathClass::ApiSurface),
];

pub struct ExposedPathProbe {
    config: ScanConfig,
}

impl ExposedPathProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for ExposedPathProbe {
    type Details = ExposedPathsReport;

    fn kind(&self) -> ProbeKind {
        ProbeKind::ExposedPaths
    }

    async fn run(&self, target: &Target) -> ProbeResult<ExposedPathsReport> {
        run_exposure_scan(target, &self.config).await.into()
    }
}

/// Performs the exposed path scan: one concurrent HEAD per catalogue entry,
/// redirects not followed. Paths that fail to answer count as absent.
///
/// # Arguments
///
/// * `target` - The target whose origin the catalogue is appended to.
/// * `config` - `path_timeout` bounds each HEAD request.
///
/// # Returns
///
/// A `ScanResult` holding the `ExposedPathsReport`, or a `ProbeError` if the
/// client could not be built.
async fn run_exposure_scan(target: &Target, config: &ScanConfig) -> ScanResult<ExposedPathsReport> {
    let base = target.origin();
    info!(base = %base, paths = PATH_CATALOGUE.len(), "Starting exposed path scan.");
    let client = build_client(ProbeKind::ExposedPaths, config, Redirects::Manual, config.path_timeout)?;

    let mut tasks = JoinSet::new();
    for (index, (path, _)) in PATH_CATALOGUE.iter().enumerate() {
        let client = client.clone();
        let url = format!("{}{}", base, path);
        tasks.spawn(async move {
            match client.head(&url).send().await {
                Ok(response) => (index, Some(response.status().as_u16())),
                Err(e) => {
                    // Unreachable paths count as absent.
                    debug!(url = %url, error = %e, "Path probe failed, ignoring.");
                    (index, None)
                }
            }
        });
    }

    let mut statuses = vec![None; PATH_CATALOGUE.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, status)) => statuses[index] = status,
            Err(e) => warn!(error = %e, "Path probe task did not complete."),
        }
    }

    let observed: Vec<(&str, PathClass, u16)> = PATH_CATALOGUE
        .iter()
        .zip(statuses)
        .filter_map(|((path, class), status)| status.map(|code| (*path, *class, code)))
        .collect();

    let (status, findings, report) = analyze_exposure(&observed);
    info!(status, total_exposed = report.total_exposed, "Exposed path scan finished.");
    Ok(ProbeFindings::new(ProbeKind::ExposedPaths, status, findings, report))
}

/// Classifies observed (path, class, status) triples, preserving input order.
///
/// # Arguments
///
/// * `observed` - Catalogue paths that answered, with their class and status code.
///
/// # Returns
///
/// A tuple containing:
/// - The status: `"critical_exposure"`, `"exposed"` or `"clean"`.
/// - The findings. Readable sensitive files are critical, reachable admin or
///   API surfaces are warnings, expected public files are informational.
/// - The report grouping paths by severity.
pub fn analyze_exposure(observed: &[(&str, PathClass, u16)]) -> (&'static str, Vec<Finding>, ExposedPathsReport) {
    let mut report = ExposedPathsReport::default();
    let mut findings = Vec::new();

    for &(path, class, status_code) in observed {
        let entry = |note: &str| ExposedPath {
            path: path.to_string(),
            status_code,
            note: note.to_string(),
        };

        match (status_code, class) {
            (200, PathClass::Sensitive) => {
                report.critical_exposed.push(entry("sensitive file publicly readable"));
                findings.push(Finding::new(
                    Severity::Critical,
                    Category::ExposedPath,
                    "EXPOSED_CRITICAL",
                    format!("CRITICAL: {} is publicly accessible (HTTP 200)", path),
                ));
            }
            (200, PathClass::Admin) => {
                report.warnings.push(entry("administrative interface reachable"));
                findings.push(Finding::new(
                    Severity::Warning,
                    Category::ExposedPath,
                    "EXPOSED_ADMIN",
                    format!("{} is accessible (HTTP 200)", path),
                ));
            }
            (200, PathClass::ExpectedPublic | PathClass::ApiSurface) => {
                report.public_files.push(entry("public (expected)"));
                findings.push(Finding::new(
                    Severity::Info,
                    Category::ExposedPath,
                    "EXPOSED_PUBLIC",
                    format!("{} is public (expected)", path),
                ));
            }
            (403, _) => {
                report.warnings.push(entry("exists but blocked"));
                findings.push(Finding::new(
                    Severity::Warning,
                    Category::ExposedPath,
                    "EXPOSED_BLOCKED",
                    format!("{} exists but is blocked (HTTP 403)", path),
                ));
            }
            _ => {}
        }
    }

    report.total_exposed = report.critical_exposed.len() + report.warnings.len();
    let status = if !report.critical_exposed.is_empty() {
        "critical_exposure"
    } else if report.total_exposed > 0 {
        "exposed"
    } else {
        "clean"
    };
    (status, findings, report)
}
