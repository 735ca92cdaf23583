// src/core/scanner/mod.rs

// Public interface of the `scanner` module: the probe contract, the concrete
// probes and the orchestrator that fans them out and joins them.
pub mod accumulator;
pub mod cookie_scanner;
pub mod exposure_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod protocol_scanner;
pub mod ssl_scanner;
pub mod vulnerability_scanner;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use strum::Display;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use self::accumulator::Accumulator;
use self::cookie_scanner::CookieProbe;
use self::exposure_scanner::ExposedPathProbe;
use self::fingerprint_scanner::CmsFingerprintProbe;
use self::headers_scanner::HeaderProbe;
use self::protocol_scanner::ProtocolProbe;
use self::ssl_scanner::{CertificateBasicProbe, CertificateProbe};
use self::vulnerability_scanner::VulnerabilityHeuristicProbe;
use crate::core::config::ScanConfig;
use crate::core::models::{
    CertificateBasicReport, CertificateDetails, CmsReport, CookieReport, ErrorKind, ExposedPathsReport, HeaderReport,
    ProbeError, ProbeKind, ProbeResult, ProtocolReport, Report, ScanResults, Target, VulnerabilityReport,
};
use crate::core::narrative::NarrativeGenerator;
use crate::core::report::ReportAssembler;
use crate::core::scoring;

// --- Contratto delle Sonde ---
// Probe contract

/// Links a probe's detail type to its slot in the accumulator.
pub trait ProbeDetails: Send + Sized + 'static {
    const KIND: ProbeKind;

    fn into_output(result: ProbeResult<Self>) -> ProbeOutput;
}

/// A single independent network check. Implementations never fail past this
/// boundary: every transport or parse error is returned as data.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    type Details: ProbeDetails;

    fn kind(&self) -> ProbeKind {
        <Self::Details as ProbeDetails>::KIND
    }

    async fn run(&self, target: &Target) -> ProbeResult<Self::Details>;
}

/// A finished probe result tagged with the slot it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutput {
    Protocol(ProbeResult<ProtocolReport>),
    CertificateBasic(ProbeResult<CertificateBasicReport>),
    CertificateAdvanced(ProbeResult<CertificateDetails>),
    Headers(ProbeResult<HeaderReport>),
    Cookies(ProbeResult<CookieReport>),
    ExposedPaths(ProbeResult<ExposedPathsReport>),
    Cms(ProbeResult<CmsReport>),
    Vulnerabilities(ProbeResult<VulnerabilityReport>),
}

impl ProbeOutput {
    pub fn probe(&self) -> ProbeKind {
        match self {
            ProbeOutput::Protocol(_) => ProbeKind::Protocol,
            ProbeOutput::CertificateBasic(_) => ProbeKind::CertificateBasic,
            ProbeOutput::CertificateAdvanced(_) => ProbeKind::CertificateAdvanced,
            ProbeOutput::Headers(_) => ProbeKind::Headers,
            ProbeOutput::Cookies(_) => ProbeKind::Cookies,
            ProbeOutput::ExposedPaths(_) => ProbeKind::ExposedPaths,
            ProbeOutput::Cms(_) => ProbeKind::Cms,
            ProbeOutput::Vulnerabilities(_) => ProbeKind::Vulnerabilities,
        }
    }

    /// An error result for `probe`, used when the task itself failed.
    pub fn failed(probe: ProbeKind, kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = ProbeError::new(probe, kind, message);
        match probe {
            ProbeKind::Protocol => ProbeOutput::Protocol(ProbeResult::Error(error)),
            ProbeKind::CertificateBasic => ProbeOutput::CertificateBasic(ProbeResult::Error(error)),
            ProbeKind::CertificateAdvanced => ProbeOutput::CertificateAdvanced(ProbeResult::Error(error)),
            ProbeKind::Headers => ProbeOutput::Headers(ProbeResult::Error(error)),
            ProbeKind::Cookies => ProbeOutput::Cookies(ProbeResult::Error(error)),
            ProbeKind::ExposedPaths => ProbeOutput::ExposedPaths(ProbeResult::Error(error)),
            ProbeKind::Cms => ProbeOutput::Cms(ProbeResult::Error(error)),
            ProbeKind::Vulnerabilities => ProbeOutput::Vulnerabilities(ProbeResult::Error(error)),
        }
    }
}

macro_rules! probe_details {
    ($($details:ty => $variant:ident),* $(,)?) => {
        $(
            impl ProbeDetails for $details {
                const KIND: ProbeKind = ProbeKind::$variant;

                fn into_output(result: ProbeResult<Self>) -> ProbeOutput {
                    ProbeOutput::$variant(result)
                }
            }
        )*
    };
}

probe_details! {
    ProtocolReport => Protocol,
    CertificateBasicReport => CertificateBasic,
    CertificateDetails => CertificateAdvanced,
    HeaderReport => Headers,
    CookieReport => Cookies,
    ExposedPathsReport => ExposedPaths,
    CmsReport => Cms,
    VulnerabilityReport => Vulnerabilities,
}

// --- Insieme delle Sonde ---
// Probe set

type ProbeTask = Pin<Box<dyn Future<Output = ProbeOutput> + Send>>;
type Launcher = Box<dyn Fn(Target) -> ProbeTask + Send + Sync>;

/// The probes a run fans out to, at most one per `ProbeKind`.
pub struct ProbeSet {
    launchers: Vec<(ProbeKind, Launcher)>,
}

impl ProbeSet {
    pub fn empty() -> Self {
        Self { launchers: Vec::new() }
    }

    /// All eight production probes, sharing one configuration.
    pub fn standard(config: &ScanConfig) -> Self {
        Self::empty()
            .with(ProtocolProbe::new(config.clone()))
            .with(CertificateBasicProbe::new(config.clone()))
            .with(CertificateProbe::new(config.clone()))
            .with(HeaderProbe::new(config.clone()))
            .with(CookieProbe::new(config.clone()))
            .with(ExposedPathProbe::new(config.clone()))
            .with(CmsFingerprintProbe::new(config.clone()))
            .with(VulnerabilityHeuristicProbe::new(config.clone()))
    }

    /// Adds `probe`, replacing any probe already registered for its kind.
    pub fn with<P: Probe>(mut self, probe: P) -> Self {
        let kind = probe.kind();
        let probe = Arc::new(probe);
        let launcher: Launcher = Box::new(move |target: Target| -> ProbeTask {
            let probe = Arc::clone(&probe);
            Box::pin(async move { <P::Details as ProbeDetails>::into_output(probe.run(&target).await) })
        });
        self.launchers.retain(|(existing, _)| *existing != kind);
        self.launchers.push((kind, launcher));
        self
    }

    pub fn kinds(&self) -> Vec<ProbeKind> {
        self.launchers.iter().map(|(kind, _)| *kind).collect()
    }
}

// --- Orchestratore ---
// Orchestrator

/// Pipeline stages, published to observers as the run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStage {
    Idle,
    Fanout,
    Join,
    Aggregate,
    Complete,
}

/// Runs one assessment: fan out every probe, wait for all of them, then score
/// and assemble the report. Holds no state between runs.
pub struct Orchestrator {
    config: ScanConfig,
    probes: ProbeSet,
    stage_tx: Option<watch::Sender<ScanStage>>,
}

impl Orchestrator {
    pub fn new(config: ScanConfig) -> Self {
        let probes = ProbeSet::standard(&config);
        Self { config, probes, stage_tx: None }
    }

    pub fn with_probes(mut self, probes: ProbeSet) -> Self {
        self.probes = probes;
        self
    }

    /// Publishes stage transitions on `tx`. Send errors (no receivers) are ignored.
    pub fn with_stage_updates(mut self, tx: watch::Sender<ScanStage>) -> Self {
        self.stage_tx = Some(tx);
        self
    }

    fn enter(&self, stage: ScanStage) {
        info!(stage = %stage, "Entering stage.");
        if let Some(tx) = &self.stage_tx {
            let _ = tx.send(stage);
        }
    }

    /// FANOUT and JOIN. A probe that panics or overruns its budget is recorded
    /// as an error; siblings keep running.
    pub async fn collect(&self, target: &Target) -> ScanResults {
        self.enter(ScanStage::Fanout);
        let budget = self.config.probe_budget;
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();

        for (kind, launcher) in &self.probes.launchers {
            let kind = *kind;
            let probe_future = launcher(target.clone());
            let handle = tasks.spawn(async move {
                match timeout(budget, probe_future).await {
                    Ok(output) => output,
                    Err(_) => {
                        warn!(probe = %kind, budget_secs = budget.as_secs(), "Probe exceeded its budget.");
                        ProbeOutput::failed(
                            kind,
                            ErrorKind::Timeout,
                            format!("probe exceeded its {}s budget", budget.as_secs()),
                        )
                    }
                }
            });
            debug!(probe = %kind, "Probe launched.");
            pending.insert(handle.id(), kind);
        }
        info!(probes = pending.len(), target = %target, "All probes launched.");

        self.enter(ScanStage::Join);
        let mut accumulator = Accumulator::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, output)) => {
                    pending.remove(&id);
                    debug!(probe = %output.probe(), "Probe reported.");
                    accumulator.record(output);
                }
                Err(join_error) => match pending.remove(&join_error.id()) {
                    Some(kind) => {
                        error!(probe = %kind, error = %join_error, "Probe task failed.");
                        accumulator.record(ProbeOutput::failed(
                            kind,
                            ErrorKind::Unknown,
                            format!("probe task failed: {}", join_error),
                        ));
                    }
                    None => error!(error = %join_error, "Unknown task failed."),
                },
            }
        }

        accumulator.seal()
    }

    /// The full pipeline: FANOUT, JOIN, AGGREGATE. Always yields a report.
    pub async fn run(&self, target: &Target, narrator: &dyn NarrativeGenerator) -> Report {
        info!(target = %target, "Starting assessment.");
        let results = self.collect(target).await;

        self.enter(ScanStage::Aggregate);
        let assessment = scoring::assess(&results);
        info!(score = assessment.score, tier = %assessment.tier, "Risk scored.");

        let assembler = ReportAssembler::new(narrator);
        let report = assembler.assemble(target.clone(), results, assessment).await;

        self.enter(ScanStage::Complete);
        report
    }
}
