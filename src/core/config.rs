// src/core/config.rs

//! Runtime configuration for the assessment pipeline and the narrative
//! collaborator. Every value has a default and can be overridden from the
//! environment.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_REQUEST_TIMEOUT: &str = "VANGUARD_ASSESS_TIMEOUT_SECS";
pub const ENV_PATH_TIMEOUT: &str = "VANGUARD_ASSESS_PATH_TIMEOUT_SECS";
pub const ENV_PROBE_BUDGET: &str = "VANGUARD_ASSESS_PROBE_BUDGET_SECS";
pub const ENV_TLS_PORT: &str = "VANGUARD_ASSESS_TLS_PORT";
pub const ENV_USER_AGENT: &str = "VANGUARD_ASSESS_USER_AGENT";
pub const ENV_CA_FILE: &str = "VANGUARD_ASSESS_CA_FILE";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_NARRATIVE_MODEL: &str = "VANGUARD_ASSESS_NARRATIVE_MODEL";
pub const ENV_NARRATIVE_ENDPOINT: &str = "VANGUARD_ASSESS_NARRATIVE_ENDPOINT";

const DEFAULT_USER_AGENT: &str = "VanguardRS/0.1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Network budgets shared by all probes of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Timeout for each single HTTP request or TLS handshake.
    pub request_timeout: Duration,
    /// Timeout for each HEAD request of the exposed path catalogue.
    pub path_timeout: Duration,
    /// Hard ceiling on a whole probe, enforced by the orchestrator.
    pub probe_budget: Duration,
    pub tls_port: u16,
    pub user_agent: String,
    /// Extra PEM trust anchors for the direct TLS handshake, on top of the
    /// system store. Lets hosts behind a private CA be inspected.
    pub ca_file: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            path_timeout: Duration::from_secs(5),
            probe_budget: Duration::from_secs(60),
            tls_port: 443,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            ca_file: None,
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(secs) = parse_secs_var(ENV_REQUEST_TIMEOUT)? {
            config.request_timeout = secs;
        }
        if let Some(secs) = parse_secs_var(ENV_PATH_TIMEOUT)? {
            config.path_timeout = secs;
        }
        if let Some(secs) = parse_secs_var(ENV_PROBE_BUDGET)? {
            config.probe_budget = secs;
        }
        if let Some(raw) = non_empty_var(ENV_TLS_PORT) {
            config.tls_port = parse_positive(ENV_TLS_PORT, &raw)?;
        }
        if let Some(agent) = non_empty_var(ENV_USER_AGENT) {
            config.user_agent = agent;
        }
        config.ca_file = non_empty_var(ENV_CA_FILE).map(PathBuf::from);
        Ok(config)
    }
}

/// Settings for the OpenAI-compatible narrative collaborator.
#[derive(Clone, PartialEq)]
pub struct NarrativeConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub temperature: f64,
    pub timeout: Duration,
}

// Keeps the API key out of logs.
impl std::fmt::Debug for NarrativeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(120),
        }
    }
}

impl NarrativeConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = non_empty_var(ENV_API_KEY);
        if let Some(model) = non_empty_var(ENV_NARRATIVE_MODEL) {
            config.model = model;
        }
        if let Some(endpoint) = non_empty_var(ENV_NARRATIVE_ENDPOINT) {
            config.endpoint = endpoint;
        }
        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_secs_var(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    non_empty_var(name)
        .map(|raw| parse_positive::<u64>(name, &raw).map(Duration::from_secs))
        .transpose()
}

fn parse_positive<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidNumber { name, value: raw.to_string() }),
    }
}
