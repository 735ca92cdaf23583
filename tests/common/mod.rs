// tests/common/mod.rs

#![allow(dead_code)]

pub mod tls;

use std::net::TcpListener;
use std::time::Duration;

use async_trait::async_trait;
use vanguard_assess::core::config::ScanConfig;
use vanguard_assess::core::models::Target;
use vanguard_assess::core::narrative::{NarrativeError, NarrativeGenerator, NarrativeRequest};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const WORDPRESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta name="generator" content="WordPress 6.4.2">
    <link rel="stylesheet" href="/wp-content/themes/twenty/style.css">
  </head>
  <body><h1>Hello</h1></body>
</html>"#;

/// A port that accepts TCP connections (through the kernel backlog) but never
/// speaks. Keep the listener alive for the duration of the test.
pub fn silent_tls_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

pub fn fast_config(tls_port: u16) -> ScanConfig {
    ScanConfig {
        request_timeout: Duration::from_secs(1),
        path_timeout: Duration::from_secs(1),
        probe_budget: Duration::from_secs(10),
        tls_port,
        ..ScanConfig::default()
    }
}

/// `fast_config` that also trusts the fixture's certificate authority.
pub fn tls_config(fixture: &tls::TlsFixture) -> ScanConfig {
    ScanConfig { ca_file: Some(fixture.ca_file.clone()), ..fast_config(fixture.port) }
}

pub fn target_for(server: &MockServer) -> Target {
    Target::parse(&server.uri()).unwrap()
}

/// A plain-HTTP WordPress site with one weak cookie, no security headers,
/// a readable `/.env`, a forbidden `/admin` and a public `robots.txt`.
pub async fn mount_wordpress_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .insert_header("server", "nginx/1.24.0")
                .insert_header("x-powered-by", "PHP/8.1")
                .insert_header("set-cookie", "session=abc123; Path=/")
                .set_body_string(WORDPRESS_PAGE),
        )
        .mount(server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("server", "nginx/1.24.0")
                .insert_header("x-frame-options", "DENY"),
        )
        .mount(server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/.env"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(403))
        .mount(server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

pub struct FixedNarrator(pub &'static str);

#[async_trait]
impl NarrativeGenerator for FixedNarrator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        Ok(self.0.to_string())
    }
}

pub struct FailingNarrator;

#[async_trait]
impl NarrativeGenerator for FailingNarrator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        Err(NarrativeError::Api { status: 503, body: "overloaded".to_string() })
    }
}
