// src/core/validation.rs

//! Optional liveness check run before an assessment.

use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::config::ScanConfig;
use crate::core::models::Target;

const LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// `true` when the target answers with a status below 400. Tries HEAD first
/// and falls back to GET when HEAD fails at the transport level.
pub async fn is_reachable(target: &Target, config: &ScanConfig) -> bool {
    let client = match Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(Policy::limited(10))
        .timeout(LIVENESS_TIMEOUT.min(config.request_timeout))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            debug!(error = %e, "Could not build liveness client.");
            return false;
        }
    };

    let status = match client.head(target.as_str()).send().await {
        Ok(response) => Some(response.status()),
        Err(e) => {
            debug!(error = %e, "HEAD failed, retrying with GET.");
            client.get(target.as_str()).send().await.ok().map(|r| r.status())
        }
    };

    let reachable = status.is_some_and(|s| s.as_u16() < 400);
    info!(target = %target, status = ?status.map(|s| s.as_u16()), reachable, "Liveness check finished.");
    reachable
}
