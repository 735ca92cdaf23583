// src/main.rs

use color_eyre::eyre::{eyre, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use vanguard_assess::core::config::{NarrativeConfig, ScanConfig};
use vanguard_assess::core::export::{self, ExportFormat};
use vanguard_assess::core::models::{Report, Target};
use vanguard_assess::core::narrative::{self, NarrativeGenerator};
use vanguard_assess::core::scanner::Orchestrator;
use vanguard_assess::core::validation;

mod app;
mod logging;
mod ui;

use app::{App, AppState, ExportStatus};

/// Everything a scan task needs, shared between runs.
struct Runtime {
    config: ScanConfig,
    narrator: Arc<dyn NarrativeGenerator>,
    export_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let config = ScanConfig::from_env()?;
    let narrator: Arc<dyn NarrativeGenerator> = Arc::from(narrative::from_config(NarrativeConfig::from_env()));
    info!(?config, narrator = narrator.name(), "Configuration loaded.");

    let runtime = Runtime {
        config,
        narrator,
        export_dir: std::env::current_dir()?,
    };

    match std::env::args().nth(1) {
        Some(raw) => run_headless(&runtime, &raw).await,
        None => run_tui(runtime).await,
    }
}

/// One-shot mode: assess a single URL and print the report as JSON.
async fn run_headless(runtime: &Runtime, raw: &str) -> Result<()> {
    let target = Target::from_user_input(raw)?;
    if !validation::is_reachable(&target, &runtime.config).await {
        warn!(target = %target, "Target did not answer the liveness check, assessing anyway.");
        eprintln!("warning: {} did not answer the liveness check", target);
    }

    let report = Orchestrator::new(runtime.config.clone())
        .run(&target, runtime.narrator.as_ref())
        .await;
    println!("{}", export::render_json(&report)?);
    Ok(())
}

async fn run_tui(runtime: Runtime) -> Result<()> {
    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel(1);
    let runtime = Arc::new(runtime);

    let outcome = loop {
        if app.should_quit {
            break Ok(());
        }
        if let Err(e) = terminal.draw(|frame| ui::render(&mut app, frame)) {
            break Err(e.into());
        }

        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {
                if let Err(e) = handle_events(&mut app, &runtime, &tx) {
                    break Err(e);
                }
            }
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }

        app.on_tick();

        if let Ok(report) = rx.try_recv() {
            app.finish_scan(report);
        }
    };

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    outcome
}

fn handle_events(
    app: &mut App,
    runtime: &Arc<Runtime>,
    tx: &mpsc::Sender<Report>,
) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if app.show_disclaimer {
            match key.code {
                KeyCode::Enter => app.show_disclaimer = false,
                KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
                _ => {}
            }
            return Ok(());
        }
        match app.state {
            AppState::Idle => handle_idle_input(app, key.code, runtime, tx),
            AppState::Finished => handle_finished_input(app, key.code, runtime),
            AppState::Scanning => {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
                    app.quit();
                }
            }
        }
    }
    Ok(())
}

fn handle_idle_input(
    app: &mut App,
    key_code: KeyCode,
    runtime: &Arc<Runtime>,
    tx: &mpsc::Sender<Report>,
) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            if app.input.trim().is_empty() {
                return;
            }
            let target = match Target::from_user_input(&app.input) {
                Ok(target) => target,
                Err(e) => {
                    warn!(error = %e, "Rejected target input.");
                    app.status_message = Some(e.to_string());
                    return;
                }
            };

            let stage_tx = app.start_scan();
            let tx = tx.clone();
            let runtime = Arc::clone(runtime);

            tokio::spawn(async move {
                if !validation::is_reachable(&target, &runtime.config).await {
                    warn!(target = %target, "Target did not answer the liveness check, assessing anyway.");
                }
                let report = Orchestrator::new(runtime.config.clone())
                    .with_stage_updates(stage_tx)
                    .run(&target, runtime.narrator.as_ref())
                    .await;
                if tx.send(report).await.is_err() {
                    error!("UI closed before the report was delivered.");
                }
            });
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode, runtime: &Runtime) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.reset(),
        KeyCode::Char('e') | KeyCode::Char('E') => export_report(app, ExportFormat::Json, runtime),
        KeyCode::Char('d') | KeyCode::Char('D') => export_report(app, ExportFormat::Document, runtime),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        _ => {}
    }
}

fn export_report(app: &mut App, format: ExportFormat, runtime: &Runtime) {
    let result = app
        .report
        .as_ref()
        .ok_or_else(|| eyre!("no report to export"))
        .and_then(|report| Ok(export::write_export(report, format, &runtime.export_dir)?));

    app.export_status = match result {
        Ok(path) => ExportStatus::Success(path.display().to_string()),
        Err(e) => {
            error!(error = %e, "Export failed.");
            ExportStatus::Error(e.to_string())
        }
    };
}
