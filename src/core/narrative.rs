// src/core/narrative.rs

//! The narrative collaborator: structured findings in, prose out. A narrator
//! is stateless apart from its HTTP client and is never required for a
//! report to be complete.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::config::NarrativeConfig;
use crate::core::models::{ProbeKind, RiskTier, Target};

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative generation is disabled: {0}")]
    Disabled(String),
    #[error("failed to reach the narrative service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("narrative service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected narrative response: {0}")]
    InvalidResponse(String),
}

/// Everything the narrator is allowed to see about a run.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeRequest {
    pub target: Target,
    pub risk_score: u8,
    pub risk_tier: RiskTier,
    pub formatted_findings: String,
    /// Probes that failed and therefore have no findings to describe.
    pub unavailable: Vec<ProbeKind>,
}

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError>;
}

const SYSTEM_PROMPT: &str = "You are a website security specialist. You explain automated scan \
results to non-specialists clearly and precisely, without inventing findings.";

/// Renders the user prompt sent to the model.
pub fn build_prompt(request: &NarrativeRequest) -> String {
    let unavailable = if request.unavailable.is_empty() {
        "none".to_string()
    } else {
        request
            .unavailable
            .iter()
            .map(|kind| kind.title())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Analyse the following website security scan results.\n\n\
         URL analysed: {target}\n\
         Risk score: {score}/100\n\
         Risk level: {tier}\n\
         Categories that could not be checked: {unavailable}\n\n\
         SCAN DATA:\n{findings}\n\n\
         Please provide:\n\
         1. EXECUTIVE SUMMARY (2-3 sentences)\n\
         2. DETAILED ANALYSIS per category: protocol and SSL/TLS, security headers, \
         vulnerabilities, exposed files, cookies, CMS\n\
         3. MAIN RISKS, ordered by severity, with impact and likelihood\n\
         4. PRIORITISED RECOMMENDATIONS (5-7 actions) with implementation difficulty\n\
         5. POSITIVE POINTS\n\n\
         Do not draw conclusions about categories that could not be checked.",
        target = request.target,
        score = request.risk_score,
        tier = request.risk_tier,
        unavailable = unavailable,
        findings = request.formatted_findings,
    )
}

// --- OpenAI-compatible chat completions ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiNarrator {
    api_key: String,
    config: NarrativeConfig,
    client: Client,
}

impl OpenAiNarrator {
    /// Fails with `Disabled` when no API key is configured.
    pub fn new(config: NarrativeConfig) -> Result<Self, NarrativeError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| NarrativeError::Disabled("no API key configured".to_string()))?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { api_key, config, client })
    }
}

#[async_trait]
impl NarrativeGenerator for OpenAiNarrator {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
        info!(model = %self.config.model, target = %request.target, "Requesting narrative.");
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(request) },
            ],
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Narrative service rejected the request.");
            return Err(NarrativeError::Api { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| NarrativeError::InvalidResponse("response contained no text".to_string()))?;

        debug!(chars = text.len(), "Narrative received.");
        Ok(text)
    }
}

/// Always declines. Used when no narrative service is configured.
pub struct DisabledNarrator {
    reason: String,
}

impl DisabledNarrator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl NarrativeGenerator for DisabledNarrator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        Err(NarrativeError::Disabled(self.reason.clone()))
    }
}

/// Picks the OpenAI narrator when it can be built, the disabled one otherwise.
pub fn from_config(config: NarrativeConfig) -> Box<dyn NarrativeGenerator> {
    match OpenAiNarrator::new(config) {
        Ok(narrator) => Box::new(narrator),
        Err(e) => {
            info!(reason = %e, "Narrative generation disabled.");
            let reason = match e {
                NarrativeError::Disabled(reason) => reason,
                other => other.to_string(),
            };
            Box::new(DisabledNarrator::new(reason))
        }
    }
}
