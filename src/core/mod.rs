// src/core/mod.rs

// Root of the `core` module: everything the assessment pipeline needs, with no
// dependency on the terminal front-end.

/// Data structures shared across the pipeline: targets, findings, probe
/// results and the final `Report`.
pub mod models;

/// Defaults and environment overrides for scans and the narrative service.
pub mod config;

/// HTTP client construction and error classification shared by the probes.
pub mod http;

/// The probe contract, concrete probes and the orchestrator.
pub mod scanner;

pub mod scoring;
pub mod report;
pub mod narrative;
pub mod export;
pub mod validation;

/// Finding codes with explanations and remediation advice.
pub mod knowledge_base;
