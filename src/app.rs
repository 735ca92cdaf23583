// src/app.rs

use ratatui::widgets::ListState;
use tokio::sync::watch;
use vanguard_assess::core::models::{Finding, Report, RiskTier, Severity};
use vanguard_assess::core::scanner::ScanStage;

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug)]
pub struct ScanSummary {
    pub score: u8,
    pub tier: RiskTier,
    pub critical_issues: usize,
    pub warning_issues: usize,
    pub failed_probes: usize,
}

impl Default for ScanSummary {
    fn default() -> Self {
        Self {
            score: 0,
            tier: RiskTier::VeryLow,
            critical_issues: 0,
            warning_issues: 0,
            failed_probes: 0,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub show_disclaimer: bool,
    pub state: AppState,
    pub input: String,
    pub report: Option<Report>,
    pub summary: ScanSummary,
    /// Findings of the current report, most severe first.
    pub all_findings: Vec<Finding>,
    pub analysis_list_state: ListState,
    pub stage: ScanStage,
    /// Stage channel of the run in progress. Each run gets a fresh one.
    stage_updates: Option<watch::Receiver<ScanStage>>,
    pub spinner_frame: usize,
    /// Score shown by the gauge, animated towards `summary.score`.
    pub displayed_score: u8,
    pub status_message: Option<String>,
    pub export_status: ExportStatus,
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Critical => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            show_disclaimer: true,
            state: AppState::Idle,
            input: String::new(),
            report: None,
            summary: ScanSummary::default(),
            all_findings: Vec::new(),
            analysis_list_state: ListState::default(),
            stage: ScanStage::Idle,
            stage_updates: None,
            spinner_frame: 0,
            displayed_score: 0,
            status_message: None,
            export_status: ExportStatus::Idle,
        }
    }

    /// Enters the scanning state and returns the sender the new run publishes
    /// its stages on.
    pub fn start_scan(&mut self) -> watch::Sender<ScanStage> {
        let (stage_tx, stage_rx) = watch::channel(ScanStage::Idle);
        self.stage_updates = Some(stage_rx);
        self.state = AppState::Scanning;
        self.stage = ScanStage::Idle;
        self.status_message = None;
        self.export_status = ExportStatus::Idle;
        stage_tx
    }

    pub fn finish_scan(&mut self, report: Report) {
        let results = report.results();
        let mut findings: Vec<Finding> = results.all_findings().into_iter().cloned().collect();
        findings.sort_by_key(|f| severity_rank(f.severity));

        self.summary = ScanSummary {
            score: report.risk_score(),
            tier: report.risk_tier(),
            critical_issues: findings.iter().filter(|f| f.severity == Severity::Critical).count(),
            warning_issues: findings.iter().filter(|f| f.severity == Severity::Warning).count(),
            failed_probes: results.errors().len(),
        };
        self.analysis_list_state = ListState::default();
        if !findings.is_empty() {
            self.analysis_list_state.select(Some(0));
        }
        self.all_findings = findings;
        self.displayed_score = 0;
        self.report = Some(report);
        self.state = AppState::Finished;
    }

    pub fn scroll_up(&mut self) {
        if self.all_findings.is_empty() {
            return;
        }
        let i = self.analysis_list_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.analysis_list_state.select(Some(i));
    }

    pub fn scroll_down(&mut self) {
        if self.all_findings.is_empty() {
            return;
        }
        let last = self.all_findings.len() - 1;
        let i = self.analysis_list_state.selected().map_or(0, |i| (i + 1).min(last));
        self.analysis_list_state.select(Some(i));
    }

    pub fn on_tick(&mut self) {
        if let Some(updates) = &self.stage_updates {
            self.stage = *updates.borrow();
        }
        if let AppState::Scanning = self.state {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
        if self.displayed_score < self.summary.score {
            self.displayed_score = (self.displayed_score + 2).min(self.summary.score);
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.report = None;
        self.summary = ScanSummary::default();
        self.all_findings = Vec::new();
        self.analysis_list_state = ListState::default();
        self.stage = ScanStage::Idle;
        self.stage_updates = None;
        self.displayed_score = 0;
        self.status_message = None;
        self.export_status = ExportStatus::Idle;
    }
}
