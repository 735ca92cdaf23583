// src/core/scanner/ssl_scanner.rs

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::Probe;
use crate::core::config::ScanConfig;
use crate::core::http::{build_client, classify_failure, request_error, Redirects};
use crate::core::models::{
    Category, CertificateBasicReport, CertificateDetails, ErrorKind, Finding, ProbeError, ProbeFindings, ProbeKind,
    ProbeResult, ScanResult, Severity, Target,
};
use chrono::{DateTime, Utc};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::system_conf::read_system_conf;
use hickory_resolver::TokioAsyncResolver;
use openssl::ssl::{HandshakeError, SslConnector, SslMethod};
use openssl::x509::X509VerifyResult;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::path::Path;
use std::time::Duration;
use tokio::task::spawn_blocking;
use url::Host;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

const SECONDS_PER_DAY: i64 = 86_400;

// --- Basic: does the final page land on HTTPS? ---

pub struct CertificateBasicProbe {
    config: ScanConfig,
}

impl CertificateBasicProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Probe for CertificateBasicProbe {
    type Details = CertificateBasicReport;

    fn kind(&self) -> ProbeKind {
        ProbeKind::CertificateBasic
    }

    async fn run(&self, target: &Target) -> ProbeResult<CertificateBasicReport> {
        run_basic_ssl_scan(target, &self.config).await.into()
    }
}

/// Performs the basic certificate check by following redirects from the target
/// and looking at the scheme of the page that finally answers.
///
/// # Arguments
///
/// * `target` - The target to request.
/// * `config` - Shared network budgets and user agent.
///
/// # Returns
///
/// A `ScanResult` holding a `CertificateBasicReport`, or a classified
/// `ProbeError` when the request itself failed.
async fn run_basic_ssl_scan(target: &Target, config: &ScanConfig) -> ScanResult<CertificateBasicReport> {
    info!(target = %target, "Starting basic SSL scan.");
    let probe = ProbeKind::CertificateBasic;
    let client = build_client(probe, config, Redirects::Follow, config.request_timeout)?;

    // A successful request over https means the certificate passed validation.
    let response = client
        .get(target.as_str())
        .send()
        .await
        .map_err(|e| request_error(probe, &e))?;

    let final_url = response.url().clone();
    let is_https = final_url.scheme() == "https";
    let report = CertificateBasicReport {
        final_url: final_url.to_string(),
        is_https,
        protocol: if is_https { "TLS/HTTPS" } else { "HTTP" }.to_string(),
        upgraded_from_http: !target.is_https() && is_https,
    };

    let mut findings = Vec::new();
    if is_https {
        findings.push(Finding::new(Severity::Info, Category::Ssl, "SSL_BASIC_VALID", "Valid SSL (TLS/HTTPS)"));
        if report.upgraded_from_http {
            findings.push(Finding::new(
                Severity::Info,
                Category::Ssl,
                "SSL_BASIC_UPGRADED",
                "Original HTTP URL redirected to HTTPS",
            ));
        }
    } else {
        findings.push(Finding::new(
            Severity::Critical,
            Category::Ssl,
            "SSL_BASIC_MISSING",
            "No SSL: the final page is served over plain HTTP",
        ));
    }

    let status = if is_https { "valid" } else { "no_ssl" };
    info!(status, final_url = %report.final_url, "Basic SSL scan finished.");
    Ok(ProbeFindings::new(probe, status, findings, report))
}

// --- Advanced: direct handshake and leaf certificate inspection ---

/// Connects straight to the TLS port and inspects the leaf certificate and the
/// negotiated protocol version.
pub struct CertificateProbe {
    config: ScanConfig,
    fixed_now: Option<DateTime<Utc>>,
}

impl CertificateProbe {
    pub fn new(config: ScanConfig) -> Self {
        Self { config, fixed_now: None }
    }

    /// Pins "now" so expiry arithmetic is reproducible.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }
}

#[async_trait]
impl Probe for CertificateProbe {
    type Details = CertificateDetails;

    fn kind(&self) -> ProbeKind {
        ProbeKind::CertificateAdvanced
    }

    async fn run(&self, target: &Target) -> ProbeResult<CertificateDetails> {
        let now = self.fixed_now.unwrap_or_else(Utc::now);
        run_ssl_scan(target, &self.config, now).await.into()
    }
}

struct TlsHandshake {
    der: Vec<u8>,
    protocol_version: String,
}

/// Performs the advanced certificate check.
///
/// Resolves the host through the system resolver, completes a TLS handshake on
/// `config.tls_port` in a blocking task, then parses the leaf certificate.
///
/// # Arguments
///
/// * `target` - The target whose host is inspected.
/// * `config` - Timeouts, TLS port and optional extra trust anchors.
/// * `now` - The instant expiry is measured against.
///
/// # Returns
///
/// A `ScanResult` holding the parsed `CertificateDetails` and the findings from
/// `analyze_certificate`, or a `ProbeError` classified as DNS, connection, TLS,
/// timeout or parse failure.
async fn run_ssl_scan(target: &Target, config: &ScanConfig, now: DateTime<Utc>) -> ScanResult<CertificateDetails> {
    let host = tls_host(target);
    info!(host = %host, port = config.tls_port, "Starting SSL/TLS scan.");

    let addresses = match host.parse::<IpAddr>() {
        Ok(ip) => vec![ip],
        Err(_) => resolve_host(&host, config.request_timeout).await?,
    };

    let port = config.tls_port;
    let timeout = config.request_timeout;
    let ca_file = config.ca_file.clone();
    let host_owned = host.clone();

    debug!("Spawning blocking task for TLS connection.");
    let handshake =
        spawn_blocking(move || perform_tls_handshake(&host_owned, &addresses, port, timeout, ca_file.as_deref()))
        .await
        .unwrap_or_else(|e| {
            error!(panic = %e, "Blocking SSL scan task panicked!");
            Err(advanced_error(ErrorKind::Unknown, format!("Task panicked: {}", e)))
        })?;

    let details = parse_certificate(&host, &handshake.der, handshake.protocol_version, now)?;
    info!(subject = %details.subject, issuer = %details.issuer, "Successfully parsed certificate.");

    let (status, findings) = analyze_certificate(&details);
    info!(status, findings = findings.len(), "SSL/TLS scan finished.");
    Ok(ProbeFindings::new(ProbeKind::CertificateAdvanced, status, findings, details))
}

fn advanced_error(kind: ErrorKind, message: impl Into<String>) -> ProbeError {
    ProbeError::new(ProbeKind::CertificateAdvanced, kind, message)
}

fn tls_host(target: &Target) -> String {
    match target.url().host() {
        Some(Host::Domain(domain)) => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => String::new(),
    }
}

/// Resolver settings from the host's own DNS configuration, so intranet and
/// split-horizon names resolve the same way they do for the HTTP probes.
/// Falls back to the built-in upstream servers when the system configuration
/// cannot be read.
fn resolver_setup(timeout: Duration) -> (ResolverConfig, ResolverOpts) {
    let (config, mut opts) = read_system_conf().unwrap_or_else(|e| {
        warn!(error = %e, "Could not read system DNS configuration, using defaults.");
        (ResolverConfig::default(), ResolverOpts::default())
    });
    opts.timeout = timeout;
    (config, opts)
}

async fn resolve_host(host: &str, timeout: Duration) -> Result<Vec<IpAddr>, ProbeError> {
    let (config, opts) = resolver_setup(timeout);
    let resolver = TokioAsyncResolver::tokio(config, opts);

    match resolver.lookup_ip(host).await {
        Ok(lookup) => {
            let addresses: Vec<IpAddr> = lookup.iter().collect();
            debug!(host, count = addresses.len(), "Resolved host.");
            if addresses.is_empty() {
                Err(advanced_error(ErrorKind::DnsFailure, format!("No addresses found for {}", host)))
            } else {
                Ok(addresses)
            }
        }
        Err(e) => {
            warn!(host, error = %e, "DNS resolution failed.");
            Err(advanced_error(
                ErrorKind::DnsFailure,
                format!("Could not resolve hostname {}: {}", host, e),
            ))
        }
    }
}

fn connect_any(addresses: &[IpAddr], port: u16, timeout: Duration) -> Result<TcpStream, ProbeError> {
    let mut last_error = None;
    for ip in addresses {
        let addr = SocketAddr::new(*ip, port);
        debug!(%addr, "Connecting TCP stream.");
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                warn!(%addr, error = %e, "TCP connection failed.");
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) => {
            let kind = match classify_failure(Some(e.kind()), &e.to_string().to_lowercase()) {
                ErrorKind::Unknown => ErrorKind::ConnectionRefused,
                kind => kind,
            };
            advanced_error(kind, format!("TCP Connection Error: {}", e))
        }
        None => advanced_error(ErrorKind::DnsFailure, "No address to connect to"),
    })
}

fn perform_tls_handshake(
    host: &str,
    addresses: &[IpAddr],
    port: u16,
    timeout: Duration,
    ca_file: Option<&Path>,
) -> Result<TlsHandshake, ProbeError> {
    let stream = connect_any(addresses, port, timeout)?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| advanced_error(ErrorKind::Unknown, format!("Could not configure socket: {}", e)))?;

    let connector = legacy_capable_connector(ca_file)?;

    debug!(host, "Performing TLS handshake.");
    let tls_stream = connector.connect(host, stream).map_err(handshake_error)?;
    let ssl = tls_stream.ssl();
    let protocol_version = ssl.version_str().to_string();

    let cert = ssl
        .peer_certificate()
        .ok_or_else(|| advanced_error(ErrorKind::TlsFailure, "Server did not provide a certificate."))?;
    let der = cert
        .to_der()
        .map_err(|e| advanced_error(ErrorKind::ParseError, format!("Could not convert certificate to DER: {}", e)))?;

    Ok(TlsHandshake { der, protocol_version })
}

/// Builds a verifying connector that still accepts TLS 1.0 and 1.1.
///
/// OpenSSL 3 refuses those versions at its default security level (their
/// signature algorithms are SHA-1 based), so both the level and the cipher
/// list are lowered to 0. Chain and hostname verification stay on.
fn legacy_capable_connector(ca_file: Option<&Path>) -> Result<SslConnector, ProbeError> {
    let setup = |e: openssl::error::ErrorStack| advanced_error(ErrorKind::Unknown, format!("TlsConnector Error: {}", e));

    let mut builder = SslConnector::builder(SslMethod::tls_client()).map_err(setup)?;
    builder.set_min_proto_version(None).map_err(setup)?;
    builder.set_security_level(0);
    builder.set_cipher_list("DEFAULT:@SECLEVEL=0").map_err(setup)?;
    if let Some(path) = ca_file {
        debug!(ca_file = %path.display(), "Adding extra trust anchors.");
        builder.set_ca_file(path).map_err(setup)?;
    }
    Ok(builder.build())
}

fn handshake_error(err: HandshakeError<TcpStream>) -> ProbeError {
    match err {
        HandshakeError::SetupFailure(stack) => {
            error!(error = %stack, "TLS setup failed.");
            advanced_error(ErrorKind::Unknown, format!("TLS setup failed: {}", stack))
        }
        // The socket is blocking with a read timeout, so "would block" means the
        // peer never answered in time.
        HandshakeError::WouldBlock(_) => {
            warn!("TLS handshake timed out.");
            advanced_error(ErrorKind::Timeout, "TLS handshake timed out")
        }
        HandshakeError::Failure(mid) => {
            let verify = mid.ssl().verify_result();
            if verify != X509VerifyResult::OK {
                warn!(reason = verify.error_string(), "Certificate verification failed.");
                return advanced_error(
                    ErrorKind::TlsFailure,
                    format!("Certificate verification failed: {}", verify.error_string()),
                );
            }
            let kind = match mid.error().io_error() {
                Some(io) => match classify_failure(Some(io.kind()), &io.to_string().to_lowercase()) {
                    ErrorKind::Unknown => ErrorKind::TlsFailure,
                    kind => kind,
                },
                None => ErrorKind::TlsFailure,
            };
            warn!(kind = %kind, error = %mid.error(), "TLS handshake failed.");
            advanced_error(kind, format!("TLS Handshake Error: {}", mid.error()))
        }
    }
}

fn parse_certificate(
    host: &str,
    der: &[u8],
    protocol_version: String,
    now: DateTime<Utc>,
) -> Result<CertificateDetails, ProbeError> {
    let (_, x509) = parse_x509_certificate(der).map_err(|e| {
        error!(error = %e, "Failed to parse X.509 certificate");
        advanced_error(ErrorKind::ParseError, format!("X.509 Parse Error: {}", e))
    })?;

    let validity = x509.validity();
    let not_before = asn1_time_to_chrono_utc(&validity.not_before);
    let not_after = asn1_time_to_chrono_utc(&validity.not_after);

    let issuer_organization = x509
        .issuer()
        .iter_organization()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);

    let subject_alt_names = match x509.subject_alternative_name() {
        Ok(Some(ext)) => ext
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some(dns.to_string()),
                GeneralName::IPAddress(bytes) => format_ip(bytes),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(CertificateDetails {
        hostname: host.to_string(),
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        issuer_organization,
        serial_number: x509.raw_serial_as_string(),
        subject_alt_names,
        not_before,
        not_after,
        days_until_expiry: days_until(not_after, now),
        protocol_version,
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn format_ip(bytes: &[u8]) -> Option<String> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(|b| Ipv4Addr::from(b).to_string()),
        16 => <[u8; 16]>::try_from(bytes).ok().map(|b| Ipv6Addr::from(b).to_string()),
        _ => None,
    }
}

/// Whole days until `not_after`, rounded toward negative infinity so a
/// certificate that expired an hour ago is already at -1.
pub fn days_until(not_after: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (not_after - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Expiry window of a leaf certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryClass {
    Expired,
    ExpiresImminently,
    ExpiresSoon,
    Valid,
}

/// Maps days-until-expiry onto its window: negative is expired, 0 to 7 is
/// imminent, 8 to 30 is soon.
pub fn classify_expiry(days: i64) -> ExpiryClass {
    match days {
        d if d < 0 => ExpiryClass::Expired,
        0..=7 => ExpiryClass::ExpiresImminently,
        8..=30 => ExpiryClass::ExpiresSoon,
        _ => ExpiryClass::Valid,
    }
}

/// Generation of the negotiated protocol, from OpenSSL's version label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolClass {
    Tls13,
    Tls12,
    Obsolete,
    Insecure,
    Unknown,
}

/// Classifies a label such as `"TLSv1.2"` as reported by `SslRef::version_str`.
pub fn classify_protocol(label: &str) -> ProtocolClass {
    match label {
        "TLSv1.3" => ProtocolClass::Tls13,
        "TLSv1.2" => ProtocolClass::Tls12,
        "TLSv1.1" | "TLSv1" | "TLSv1.0" => ProtocolClass::Obsolete,
        l if l.starts_with("SSLv") => ProtocolClass::Insecure,
        _ => ProtocolClass::Unknown,
    }
}

/// Analyzes a parsed certificate and produces the advanced certificate findings.
///
/// # Arguments
///
/// * `details` - The certificate and negotiated protocol from the handshake.
///
/// # Returns
///
/// A tuple containing:
/// - The status: `"expired"`, `"expires_imminently"`, `"expiring_soon"` or `"valid"`.
/// - One expiry finding followed by at most one protocol finding. Expired and
///   imminent certificates are critical, as are obsolete or SSL protocols.
pub fn analyze_certificate(details: &CertificateDetails) -> (&'static str, Vec<Finding>) {
    debug!("Analyzing SSL scan results.");
    let mut findings = Vec::new();
    let days = details.days_until_expiry;

    let expiry = classify_expiry(days);
    let (status, expiry_finding) = match expiry {
        ExpiryClass::Expired => (
            "expired",
            Finding::new(
                Severity::Critical,
                Category::Ssl,
                "SSL_EXPIRED",
                format!("Certificate EXPIRED {} days ago", days.abs()),
            ),
        ),
        ExpiryClass::ExpiresImminently => (
            "expires_imminently",
            Finding::new(
                Severity::Critical,
                Category::Ssl,
                "SSL_EXPIRES_IMMINENTLY",
                format!("CRITICAL: certificate expires in {} days", days),
            ),
        ),
        ExpiryClass::ExpiresSoon => (
            "expiring_soon",
            Finding::new(
                Severity::Warning,
                Category::Ssl,
                "SSL_EXPIRING_SOON",
                format!("Certificate expires soon: {} days", days),
            ),
        ),
        ExpiryClass::Valid => (
            "valid",
            Finding::new(Severity::Info, Category::Ssl, "SSL_VALID", format!("Valid for {} days", days)),
        ),
    };
    findings.push(expiry_finding);

    let protocol = details.protocol_version.as_str();
    match classify_protocol(protocol) {
        ProtocolClass::Tls13 => findings.push(Finding::new(
            Severity::Info,
            Category::Ssl,
            "SSL_TLS13",
            "TLS 1.3 (most secure)",
        )),
        ProtocolClass::Tls12 => findings.push(Finding::new(Severity::Info, Category::Ssl, "SSL_TLS12", "TLS 1.2 (secure)")),
        ProtocolClass::Obsolete => findings.push(Finding::new(
            Severity::Critical,
            Category::Ssl,
            "SSL_OBSOLETE_PROTOCOL",
            format!("{} - obsolete and insecure version", protocol),
        )),
        ProtocolClass::Insecure => findings.push(Finding::new(
            Severity::Critical,
            Category::Ssl,
            "SSL_INSECURE_PROTOCOL",
            format!("{} - EXTREMELY INSECURE", protocol),
        )),
        ProtocolClass::Unknown => debug!(protocol, "Unrecognised protocol label, no finding."),
    }

    (status, findings)
}
