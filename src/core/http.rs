// src/core/http.rs

//! Shared HTTP plumbing for the probes: client construction and the mapping of
//! transport failures onto the probe error taxonomy.

use crate::core::config::ScanConfig;
use crate::core::models::{ErrorKind, ProbeError, ProbeKind};
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Whether a probe wants to observe redirects or land on the final page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    Follow,
    Manual,
}

/// Builds a fresh client for one probe invocation. Probes never share clients,
/// so nothing leaks between runs.
///
/// # Arguments
///
/// * `probe` - The probe the client is for, used to label a build failure.
/// * `config` - Supplies the user agent.
/// * `redirects` - Whether redirects are followed or left to the caller.
/// * `timeout` - Total timeout of each request.
///
/// # Returns
///
/// A configured `reqwest::Client`, or a `ProbeError` of kind `unknown` if
/// the client could not be built.
pub fn build_client(
    probe: ProbeKind,
    config: &ScanConfig,
    redirects: Redirects,
    timeout: Duration,
) -> Result<Client, ProbeError> {
    let policy = match redirects {
        Redirects::Follow => Policy::limited(10),
        Redirects::Manual => Policy::none(),
    };

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(policy)
        .timeout(timeout)
        .build()
        .map_err(|e| {
            error!(probe = %probe, error = %e, "Failed to build HTTP client.");
            ProbeError::new(probe, ErrorKind::Unknown, format!("Failed to build HTTP client: {}", e))
        })
}

/// Converts a reqwest failure into a `ProbeError` with a classified kind and
/// logs it at warn level.
pub fn request_error(probe: ProbeKind, err: &reqwest::Error) -> ProbeError {
    let kind = classify_reqwest_error(err);
    warn!(probe = %probe, kind = %kind, error = %err, "HTTP request failed.");
    ProbeError::new(probe, kind, format!("HTTP request failed: {}", err))
}

/// Maps a reqwest error to an `ErrorKind`.
///
/// Timeouts are checked first, then the I/O error at the bottom of the source
/// chain together with the full error text.
pub fn classify_reqwest_error(err: &reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        return ErrorKind::Timeout;
    }

    // Only the source chain is inspected: the top-level message embeds the URL,
    // which could contain words like "ssl".
    let mut io_kind = None;
    let mut chain = String::new();
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            io_kind.get_or_insert(io_err.kind());
        }
        chain.push_str(&cause.to_string().to_lowercase());
        chain.push_str(" | ");
        source = cause.source();
    }
    debug!(chain = %chain, "Classifying request error.");

    match classify_failure(io_kind, &chain) {
        ErrorKind::Unknown if err.is_status() => ErrorKind::HttpError,
        ErrorKind::Unknown if err.is_decode() || err.is_body() => ErrorKind::ParseError,
        ErrorKind::Unknown if err.is_connect() => ErrorKind::ConnectionRefused,
        kind => kind,
    }
}

/// Pure classification over an optional I/O error kind and a lowercase error
/// description. Shared by the HTTP and raw TLS probes.
pub fn classify_failure(io_kind: Option<io::ErrorKind>, text: &str) -> ErrorKind {
    if matches!(io_kind, Some(io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock))
        || text.contains("timed out")
        || text.contains("deadline has elapsed")
    {
        return ErrorKind::Timeout;
    }
    if text.contains("dns error")
        || text.contains("failed to lookup address")
        || text.contains("name or service not known")
        || text.contains("no such host")
        || text.contains("nodename nor servname")
        || text.contains("no record found")
    {
        return ErrorKind::DnsFailure;
    }
    if matches!(io_kind, Some(io::ErrorKind::ConnectionRefused)) || text.contains("connection refused") {
        return ErrorKind::ConnectionRefused;
    }
    if text.contains("certificate")
        || text.contains("handshake")
        || text.contains("tls")
        || text.contains("ssl")
    {
        return ErrorKind::TlsFailure;
    }
    ErrorKind::Unknown
}

/// Reads a header as text, keeping presence even when the value is not UTF-8.
pub fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).map(|value| match value.to_str() {
        Ok(s) => s.to_string(),
        Err(_) => {
            warn!(header_name = name, "Header found but contained invalid UTF-8.");
            "[Invalid UTF-8]".to_string()
        }
    })
}

/// All raw `Set-Cookie` header lines of a response.
pub fn set_cookie_lines(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_win_over_everything() {
        assert_eq!(classify_failure(Some(io::ErrorKind::TimedOut), "tls handshake"), ErrorKind::Timeout);
        assert_eq!(classify_failure(Some(io::ErrorKind::WouldBlock), ""), ErrorKind::Timeout);
        assert_eq!(classify_failure(None, "operation timed out"), ErrorKind::Timeout);
    }

    #[test]
    fn dns_refused_and_tls_are_distinct() {
        assert_eq!(
            classify_failure(None, "dns error: failed to lookup address information"),
            ErrorKind::DnsFailure
        );
        assert_eq!(
            classify_failure(Some(io::ErrorKind::ConnectionRefused), "tcp connect error"),
            ErrorKind::ConnectionRefused
        );
        assert_eq!(
            classify_failure(None, "invalid peer certificate: unknownissuer"),
            ErrorKind::TlsFailure
        );
        assert_eq!(classify_failure(None, "something odd"), ErrorKind::Unknown);
    }

    #[test]
    fn set_cookie_lines_are_collected_in_order() {
        let mut headers = HeaderMap::new();
        headers.append(reqwest::header::SET_COOKIE, "a=1; Secure".parse().unwrap());
        headers.append(reqwest::header::SET_COOKIE, "b=2".parse().unwrap());
        assert_eq!(set_cookie_lines(&headers), vec!["a=1; Secure", "b=2"]);
        assert_eq!(header_value(&headers, "server"), None);
    }
}
