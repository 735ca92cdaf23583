// tests/probes.rs

mod common;

use common::tls::{start_tls_server, Protocols, CA_ORGANIZATION};
use common::{fast_config, mount_wordpress_site, silent_tls_port, target_for, tls_config};
use openssl::ssl::SslVersion;
use vanguard_assess::core::models::{ErrorKind, HeaderPresence, ProbeResult, Severity, Target};
use vanguard_assess::core::scanner::cookie_scanner::CookieProbe;
use vanguard_assess::core::scanner::exposure_scanner::ExposedPathProbe;
use vanguard_assess::core::scanner::fingerprint_scanner::CmsFingerprintProbe;
use vanguard_assess::core::scanner::headers_scanner::HeaderProbe;
use vanguard_assess::core::scanner::protocol_scanner::ProtocolProbe;
use vanguard_assess::core::scanner::ssl_scanner::{CertificateBasicProbe, CertificateProbe};
use vanguard_assess::core::scanner::vulnerability_scanner::VulnerabilityHeuristicProbe;
use vanguard_assess::core::scanner::Probe;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn codes<T>(result: &ProbeResult<T>) -> Vec<&str> {
    result.findings().iter().map(|f| f.code.as_str()).collect()
}

/// A port nothing listens on.
fn closed_port() -> u16 {
    let (listener, port) = silent_tls_port();
    drop(listener);
    port
}

#[tokio::test]
async fn headers_probe_reports_each_missing_header() {
    let server = MockServer::start().await;
    mount_wordpress_site(&server).await;

    let result = HeaderProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().expect("headers probe should succeed");

    assert_eq!(outcome.status, "missing_headers");
    assert_eq!(
        outcome.details.headers.get("X-Frame-Options"),
        Some(&HeaderPresence::Present { value: "DENY".to_string() })
    );
    assert_eq!(
        codes(&result),
        vec![
            "HEADERS_CSP_MISSING",
            "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING",
            "HEADERS_HSTS_MISSING"
        ]
    );
    assert!(result.findings().iter().all(|f| f.severity == Severity::Warning));
}

#[tokio::test]
async fn cookie_probe_flags_missing_attributes_over_http() {
    let server = MockServer::start().await;
    mount_wordpress_site(&server).await;

    let result = CookieProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().expect("cookie probe should succeed");

    assert_eq!(outcome.status, "issues_found");
    assert_eq!(outcome.details.cookies_analyzed, 1);
    assert_eq!(outcome.details.cookies[0].name, "session");
    // Secure is not required on a plain-HTTP target.
    assert_eq!(codes(&result), vec!["COOKIE_HTTPONLY_MISSING", "COOKIE_SAMESITE_MISSING"]);
}

#[tokio::test]
async fn cookie_probe_without_cookies_has_no_findings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let result = CookieProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().unwrap();
    assert_eq!(outcome.status, "no_cookies");
    assert!(outcome.findings.is_empty());
}

#[tokio::test]
async fn cms_probe_detects_wordpress_and_version() {
    let server = MockServer::start().await;
    mount_wordpress_site(&server).await;

    let result = CmsFingerprintProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().expect("CMS probe should succeed");

    assert_eq!(outcome.status, "detected");
    assert_eq!(outcome.details.cms.as_deref(), Some("WordPress"));
    assert_eq!(outcome.details.version.as_deref(), Some("6.4.2"));
    assert_eq!(result.findings()[0].code, "CMS_DETECTED");
    assert_eq!(result.findings()[0].message, "CMS detected: WordPress 6.4.2");
    assert!(result.findings()[1..].iter().all(|f| f.code == "CMS_HARDENING"));
}

#[tokio::test]
async fn vulnerability_probe_emits_one_finding_per_condition() {
    let server = MockServer::start().await;
    mount_wordpress_site(&server).await;

    let result = VulnerabilityHeuristicProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().expect("vulnerability probe should succeed");

    assert_eq!(outcome.status, "issues_found");
    assert_eq!(outcome.details.cookies_without_http_only, vec!["session".to_string()]);
    assert_eq!(outcome.details.server.as_deref(), Some("nginx/1.24.0"));
    assert_eq!(
        codes(&result),
        vec![
            "VULN_COOKIE_HTTPONLY",
            "VULN_HSTS_MISSING",
            "VULN_CSP_MISSING",
            "VULN_SERVER_DISCLOSED",
            "VULN_POWERED_BY_DISCLOSED"
        ]
    );
}

#[tokio::test]
async fn protocol_probe_on_plain_http_is_critical() {
    let server = MockServer::start().await;
    mount_wordpress_site(&server).await;

    let result = ProtocolProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().unwrap();
    assert_eq!(outcome.status, "http_only");
    assert_eq!(outcome.details.status_code, 200);
    assert!(result.findings()[0].is_critical());
}

#[tokio::test]
async fn protocol_probe_sees_upgrade_redirect_without_following_it() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "https://example.com/"))
        .mount(&server)
        .await;

    let result = ProtocolProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().unwrap();
    assert_eq!(outcome.status, "redirects_to_https");
    assert_eq!(outcome.details.redirect_location.as_deref(), Some("https://example.com/"));
    assert_eq!(result.findings()[0].severity, Severity::Info);
}

#[tokio::test]
async fn basic_certificate_probe_reports_missing_ssl() {
    let server = MockServer::start().await;
    mount_wordpress_site(&server).await;

    let result = CertificateBasicProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().unwrap();
    assert_eq!(outcome.status, "no_ssl");
    assert!(!outcome.details.is_https);
    assert_eq!(codes(&result), vec!["SSL_BASIC_MISSING"]);
}

#[tokio::test]
async fn forbidden_admin_is_a_warning_not_critical() {
    let server = MockServer::start().await;
    mount_wordpress_site(&server).await;

    let result = ExposedPathProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().expect("exposed path probe should succeed");
    let details = &outcome.details;

    assert_eq!(outcome.status, "critical_exposure");
    assert_eq!(details.critical_exposed.len(), 1);
    assert_eq!(details.critical_exposed[0].path, "/.env");
    assert!(details.critical_exposed.iter().all(|p| p.path != "/admin"));
    assert_eq!(details.warnings.len(), 1);
    assert_eq!(details.warnings[0].path, "/admin");
    assert_eq!(details.warnings[0].status_code, 403);
    assert_eq!(details.public_files[0].path, "/robots.txt");
    assert_eq!(details.total_exposed, 2);

    let admin = result.findings().iter().find(|f| f.message.contains("/admin")).unwrap();
    assert_eq!(admin.severity, Severity::Warning);
}

#[tokio::test]
async fn exposed_path_probe_on_clean_site() {
    let server = MockServer::start().await;

    let result = ExposedPathProbe::new(fast_config(443)).run(&target_for(&server)).await;
    let outcome = result.outcome().unwrap();
    assert_eq!(outcome.status, "clean");
    assert_eq!(outcome.details.total_exposed, 0);
}

#[tokio::test]
async fn silent_tls_peer_times_out() {
    let (_listener, port) = silent_tls_port();
    let target = Target::parse("https://127.0.0.1/").unwrap();

    let result = CertificateProbe::new(fast_config(port)).run(&target).await;
    let error = result.error().expect("handshake against a silent peer must fail");
    assert_eq!(error.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn certificate_check_reads_the_served_leaf() {
    let fixture = start_tls_server(120, Protocols::Modern);
    let target = Target::parse("https://127.0.0.1/").unwrap();
    let probe = CertificateProbe::new(tls_config(&fixture)).with_clock(fixture.clock_with_days_left(45));

    let first = probe.run(&target).await;
    let outcome = first.outcome().unwrap_or_else(|| panic!("handshake failed: {:?}", first.error()));
    let details = &outcome.details;

    assert_eq!(outcome.status, "valid");
    assert_eq!(details.hostname, "127.0.0.1");
    assert_eq!(details.days_until_expiry, 45);
    assert_eq!(details.not_after, fixture.not_after);
    assert_eq!(details.issuer_organization.as_deref(), Some(CA_ORGANIZATION));
    assert_eq!(details.subject_alt_names, vec!["localhost".to_string(), "127.0.0.1".to_string()]);
    assert_eq!(details.protocol_version, "TLSv1.3");
    assert_eq!(codes(&first), vec!["SSL_VALID", "SSL_TLS13"]);

    // Same clock, same server: same result.
    let second = probe.run(&target).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn legacy_tls_servers_are_reported_as_obsolete() {
    let target = Target::parse("https://127.0.0.1/").unwrap();

    for (version, label) in [(SslVersion::TLS1, "TLSv1"), (SslVersion::TLS1_1, "TLSv1.1")] {
        let fixture = start_tls_server(120, Protocols::Only(version));
        let probe = CertificateProbe::new(tls_config(&fixture)).with_clock(fixture.clock_with_days_left(90));

        let result = probe.run(&target).await;
        let outcome = result
            .outcome()
            .unwrap_or_else(|| panic!("{} handshake failed: {:?}", label, result.error()));

        assert_eq!(outcome.details.protocol_version, label);
        assert_eq!(codes(&result), vec!["SSL_VALID", "SSL_OBSOLETE_PROTOCOL"]);
        assert!(result.findings()[1].is_critical());
    }
}

#[tokio::test]
async fn untrusted_certificate_is_a_tls_failure() {
    let fixture = start_tls_server(120, Protocols::Modern);
    let target = Target::parse("https://127.0.0.1/").unwrap();

    let result = CertificateProbe::new(fast_config(fixture.port)).run(&target).await;
    let error = result.error().expect("a private CA must not verify without the trust anchor");
    assert_eq!(error.kind, ErrorKind::TlsFailure);
    assert!(error.message.starts_with("Certificate verification failed"));
}

#[tokio::test]
async fn refused_connections_are_classified() {
    let port = closed_port();

    let target = Target::parse("https://127.0.0.1/").unwrap();
    let result = CertificateProbe::new(fast_config(port)).run(&target).await;
    assert_eq!(result.error().unwrap().kind, ErrorKind::ConnectionRefused);

    let target = Target::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
    let result = HeaderProbe::new(fast_config(443)).run(&target).await;
    assert_eq!(result.error().unwrap().kind, ErrorKind::ConnectionRefused);
}
