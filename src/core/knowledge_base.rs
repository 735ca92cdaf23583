//! Static, read-only database of every finding code the probes can emit,
//! with human-readable explanations and remediation steps. The terminal
//! front-end and the document export both read from it.

use crate::core::models::{Category, Severity};

/// Display name used to group findings by category.
pub fn category_title(category: Category) -> &'static str {
    match category {
        Category::Protocol => "Protocol",
        Category::Ssl => "SSL/TLS Certificate",
        Category::Header => "HTTP Security Headers",
        Category::Cookie => "Cookies",
        Category::ExposedPath => "Exposed Files",
        Category::Cms => "CMS",
        Category::Vulnerability => "Vulnerability Heuristics",
    }
}

/// Everything needed to explain one finding code to a user.
pub struct FindingDetail {
    /// Machine-readable identifier, e.g. "HEADERS_CSP_MISSING".
    pub code: &'static str,
    pub title: &'static str,
    pub category: Category,
    /// Severity the probes emit this code with.
    pub severity: Severity,
    pub description: &'static str,
    pub remediation: &'static str,
}

static FINDINGS: &[FindingDetail] = &[
    // --- Protocol ---
    FindingDetail {
        code: "PROTOCOL_HTTPS",
        title: "Served over HTTPS",
        category: Category::Protocol,
        severity: Severity::Info,
        description: "The site answers directly over HTTPS without redirecting first.",
        remediation: "No action required.",
    },
    FindingDetail {
        code: "PROTOCOL_HTTP_REDIRECTS_TO_HTTPS",
        title: "HTTP Accepted, Redirected to HTTPS",
        category: Category::Protocol,
        severity: Severity::Info,
        description: "Plain HTTP requests are answered with a redirect to HTTPS. The first request still travels unencrypted and can be intercepted or rewritten.",
        remediation: "Keep the redirect and add an HSTS header with a long max-age so browsers stop making plain HTTP requests. Consider HSTS preloading.",
    },
    FindingDetail {
        code: "PROTOCOL_HTTP_NO_HTTPS_REDIRECT",
        title: "HTTP Redirect Without HTTPS",
        category: Category::Protocol,
        severity: Severity::Critical,
        description: "The site redirects plain HTTP requests, but not to an HTTPS address. Traffic remains unencrypted end to end.",
        remediation: "Install a TLS certificate and make every HTTP endpoint redirect permanently (301 or 308) to its HTTPS equivalent.",
    },
    FindingDetail {
        code: "PROTOCOL_HTTP_ONLY",
        title: "Site Uses Plain HTTP",
        category: Category::Protocol,
        severity: Severity::Critical,
        description: "The site is served over unencrypted HTTP. Anything visitors send or receive, including credentials and session cookies, can be read or modified in transit.",
        remediation: "Obtain a certificate (for example from Let's Encrypt), serve the site over HTTPS and redirect all HTTP traffic to it.",
    },
    FindingDetail {
        code: "PROTOCOL_UNEXPECTED_REDIRECT",
        title: "Unexpected Redirect",
        category: Category::Protocol,
        severity: Severity::Warning,
        description: "The HTTPS address answered with a redirect instead of content. This is often harmless (www or trailing-slash canonicalisation) but should be intentional.",
        remediation: "Confirm the redirect target is the canonical HTTPS address and that no redirect chain leads back to HTTP.",
    },
    // --- SSL/TLS ---
    FindingDetail {
        code: "SSL_BASIC_VALID",
        title: "Valid TLS Connection",
        category: Category::Ssl,
        severity: Severity::Info,
        description: "The final page loaded over HTTPS with a certificate trusted by the system store.",
        remediation: "No action required.",
    },
    FindingDetail {
        code: "SSL_BASIC_UPGRADED",
        title: "Upgraded to HTTPS by Redirect",
        category: Category::Ssl,
        severity: Severity::Info,
        description: "The HTTP address eventually lands on an HTTPS page after following redirects.",
        remediation: "Publish HTTPS links everywhere and enable HSTS so the HTTP hop is skipped.",
    },
    FindingDetail {
        code: "SSL_BASIC_MISSING",
        title: "No TLS on Final Page",
        category: Category::Ssl,
        severity: Severity::Critical,
        description: "After following redirects the page is still delivered over plain HTTP.",
        remediation: "Serve the site over HTTPS with a valid certificate and redirect all HTTP traffic to it.",
    },
    FindingDetail {
        code: "SSL_VALID",
        title: "Certificate Valid",
        category: Category::Ssl,
        severity: Severity::Info,
        description: "The leaf certificate is valid for more than 30 days.",
        remediation: "No action required. Keep automated renewal in place.",
    },
    FindingDetail {
        code: "SSL_EXPIRED",
        title: "SSL Certificate Expired",
        category: Category::Ssl,
        severity: Severity::Critical,
        description: "The website's SSL certificate is expired. This will cause browsers to show prominent security warnings, block access, and destroy user trust.",
        remediation: "Renew the SSL certificate immediately. Implement automated renewal processes (e.g., via Let's Encrypt / Certbot) to prevent this from happening in the future.",
    },
    FindingDetail {
        code: "SSL_EXPIRES_IMMINENTLY",
        title: "SSL Certificate Expires Within a Week",
        category: Category::Ssl,
        severity: Severity::Critical,
        description: "The certificate expires in seven days or less. Once it does, browsers will block the site.",
        remediation: "Renew the certificate now and check why automated renewal has not already done so.",
    },
    FindingDetail {
        code: "SSL_EXPIRING_SOON",
        title: "SSL Certificate Expiring Soon",
        category: Category::Ssl,
        severity: Severity::Warning,
        description: "The SSL certificate will expire in less than 30 days. This is an early warning to prevent service disruption and loss of trust.",
        remediation: "Renew the SSL certificate before it expires. If you have automated renewals, verify that the system is functioning correctly.",
    },
    FindingDetail {
        code: "SSL_TLS13",
        title: "TLS 1.3 Negotiated",
        category: Category::Ssl,
        severity: Severity::Info,
        description: "The server negotiated TLS 1.3, the current and most secure protocol version.",
        remediation: "No action required.",
    },
    FindingDetail {
        code: "SSL_TLS12",
        title: "TLS 1.2 Negotiated",
        category: Category::Ssl,
        severity: Severity::Info,
        description: "The server negotiated TLS 1.2, which is secure with modern cipher suites.",
        remediation: "Consider enabling TLS 1.3 for better performance and forward secrecy by default.",
    },
    FindingDetail {
        code: "SSL_OBSOLETE_PROTOCOL",
        title: "Obsolete TLS Version",
        category: Category::Ssl,
        severity: Severity::Critical,
        description: "The server negotiated TLS 1.0 or 1.1. Both versions are deprecated and rejected by modern browsers.",
        remediation: "Disable TLS 1.0 and 1.1 in the server configuration and allow only TLS 1.2 and 1.3.",
    },
    FindingDetail {
        code: "SSL_INSECURE_PROTOCOL",
        title: "SSL Protocol in Use",
        category: Category::Ssl,
        severity: Severity::Critical,
        description: "The server negotiated an SSL protocol version. SSLv2 and SSLv3 are broken and trivially attackable.",
        remediation: "Disable every SSL version immediately and allow only TLS 1.2 and 1.3.",
    },
    // --- HTTP Headers ---
    FindingDetail {
        code: "HEADERS_HSTS_MISSING",
        title: "HSTS Header Missing",
        category: Category::Header,
        severity: Severity::Warning,
        description: "The HTTP Strict-Transport-Security (HSTS) header instructs browsers to only communicate with your site over HTTPS. It protects against protocol downgrade attacks and cookie hijacking.",
        remediation: "Add the 'Strict-Transport-Security' header to your web server responses. A strong value is 'max-age=31536000; includeSubDomains; preload'.",
    },
    FindingDetail {
        code: "HEADERS_CSP_MISSING",
        title: "CSP Header Missing",
        category: Category::Header,
        severity: Severity::Warning,
        description: "Content-Security-Policy (CSP) is a powerful security layer that helps prevent attacks like Cross-Site Scripting (XSS) and data injection by defining which resources a browser is allowed to load.",
        remediation: "Implement a Content-Security-Policy header that defines trusted sources for scripts, styles, and other assets. Start with a restrictive policy and gradually open it up as needed.",
    },
    FindingDetail {
        code: "HEADERS_X_FRAME_OPTIONS_MISSING",
        title: "X-Frame-Options Missing",
        category: Category::Header,
        severity: Severity::Warning,
        description: "This header protects your visitors against 'clickjacking' attacks, where an attacker loads your site in an invisible iframe to trick users into clicking on malicious content.",
        remediation: "Add the 'X-Frame-Options' header and set it to 'DENY' (no framing allowed) or 'SAMEORIGIN' (only you can frame your site).",
    },
    FindingDetail {
        code: "HEADERS_X_CONTENT_TYPE_OPTIONS_MISSING",
        title: "X-Content-Type-Options Missing",
        category: Category::Header,
        severity: Severity::Warning,
        description: "This header prevents browsers from trying to guess the content type of a file (MIME sniffing). This mitigates attacks where a file disguised as an image could be executed as a script.",
        remediation: "Add the 'X-Content-Type-Options' header and set its value to 'nosniff'.",
    },
    // --- Cookies ---
    FindingDetail {
        code: "COOKIE_SECURE_MISSING",
        title: "Cookie Without Secure Flag",
        category: Category::Cookie,
        severity: Severity::Warning,
        description: "A cookie set by an HTTPS site lacks the Secure flag, so the browser may also send it over plain HTTP where it can be intercepted.",
        remediation: "Add the 'Secure' attribute to every cookie set by the site.",
    },
    FindingDetail {
        code: "COOKIE_HTTPONLY_MISSING",
        title: "Cookie Without HttpOnly Flag",
        category: Category::Cookie,
        severity: Severity::Warning,
        description: "Scripts running in the page can read this cookie. A single XSS bug is then enough to steal sessions.",
        remediation: "Add the 'HttpOnly' attribute to every cookie that client-side code does not need to read, and always to session cookies.",
    },
    FindingDetail {
        code: "COOKIE_SAMESITE_MISSING",
        title: "Cookie Without SameSite Protection",
        category: Category::Cookie,
        severity: Severity::Warning,
        description: "The cookie has no SameSite attribute or uses SameSite=None, so it is attached to cross-site requests. This weakens protection against CSRF.",
        remediation: "Set 'SameSite=Lax' (or 'Strict' for sensitive cookies). Use 'None' only for cookies that genuinely need cross-site delivery, together with 'Secure'.",
    },
    // --- Exposed paths ---
    FindingDetail {
        code: "EXPOSED_CRITICAL",
        title: "Sensitive File Publicly Accessible",
        category: Category::ExposedPath,
        severity: Severity::Critical,
        description: "A file that should never be public (version control metadata, environment secrets, database dumps or backups) can be downloaded by anyone.",
        remediation: "Remove the file from the web root or deny access to it in the web server configuration, then rotate any credentials it contained.",
    },
    FindingDetail {
        code: "EXPOSED_ADMIN",
        title: "Administrative Interface Reachable",
        category: Category::ExposedPath,
        severity: Severity::Warning,
        description: "An administration panel is reachable from the public internet and exposed to brute-force and exploit attempts.",
        remediation: "Restrict the admin interface by IP allow-list or VPN, enforce strong authentication with MFA, and rate-limit login attempts.",
    },
    FindingDetail {
        code: "EXPOSED_BLOCKED",
        title: "Sensitive Path Exists but Blocked",
        category: Category::ExposedPath,
        severity: Severity::Warning,
        description: "The server answered 403 Forbidden, which confirms the path exists even though access is denied.",
        remediation: "Return 404 for paths that should not exist publicly, or remove them from the web root entirely.",
    },
    FindingDetail {
        code: "EXPOSED_PUBLIC",
        title: "Public File (Expected)",
        category: Category::ExposedPath,
        severity: Severity::Info,
        description: "A file that sites normally publish, such as robots.txt, sitemap.xml or an API entry point, is reachable.",
        remediation: "No action required. Make sure it does not list private paths or undocumented endpoints.",
    },
    // --- CMS ---
    FindingDetail {
        code: "CMS_DETECTED",
        title: "CMS Detected",
        category: Category::Cms,
        severity: Severity::Info,
        description: "The site runs on a known content management platform. Attackers target known platforms with automated exploit kits.",
        remediation: "Keep the platform core, themes and plugins up to date and remove unused extensions.",
    },
    FindingDetail {
        code: "CMS_NONE",
        title: "No Known CMS Detected",
        category: Category::Cms,
        severity: Severity::Info,
        description: "None of the known CMS signatures were found. This is not a negative signal.",
        remediation: "No action required.",
    },
    FindingDetail {
        code: "CMS_HARDENING",
        title: "CMS Hardening Advice",
        category: Category::Cms,
        severity: Severity::Warning,
        description: "A platform-specific hardening recommendation for the detected CMS.",
        remediation: "Follow the platform's official hardening guide and subscribe to its security advisories.",
    },
    // --- Vulnerability heuristics ---
    FindingDetail {
        code: "VULN_COOKIE_HTTPONLY",
        title: "Cookies Readable by Scripts",
        category: Category::Vulnerability,
        severity: Severity::Warning,
        description: "One or more cookies lack HttpOnly. Combined with an XSS flaw this allows session theft.",
        remediation: "Set HttpOnly on every session and authentication cookie.",
    },
    FindingDetail {
        code: "VULN_HSTS_MISSING",
        title: "No HSTS (Downgrade Risk)",
        category: Category::Vulnerability,
        severity: Severity::Warning,
        description: "Without HSTS an attacker on the network path can downgrade visitors to plain HTTP.",
        remediation: "Send 'Strict-Transport-Security: max-age=31536000; includeSubDomains' on every HTTPS response.",
    },
    FindingDetail {
        code: "VULN_CSP_MISSING",
        title: "No CSP (XSS Risk)",
        category: Category::Vulnerability,
        severity: Severity::Warning,
        description: "Without a Content-Security-Policy any injected script runs with full page privileges.",
        remediation: "Deploy a Content-Security-Policy, starting in report-only mode if needed.",
    },
    FindingDetail {
        code: "VULN_SERVER_DISCLOSED",
        title: "Server Software Disclosed",
        category: Category::Vulnerability,
        severity: Severity::Info,
        description: "The Server header reveals the web server software and possibly its version, which helps attackers pick matching exploits.",
        remediation: "Configure the web server to omit the version (e.g. 'server_tokens off' in nginx, 'ServerTokens Prod' in Apache).",
    },
    FindingDetail {
        code: "VULN_POWERED_BY_DISCLOSED",
        title: "Technology Stack Disclosed",
        category: Category::Vulnerability,
        severity: Severity::Info,
        description: "The X-Powered-By header reveals the application framework or language version.",
        remediation: "Remove the X-Powered-By header (e.g. 'expose_php = Off' in PHP, 'app.disable(\"x-powered-by\")' in Express).",
    },
];

/// Looks up a finding code.
pub fn get_finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{
        CertificateDetails, CmsReport, HeaderReport, ProtocolReport, VulnerabilityReport,
    };
    use crate::core::scanner::cookie_scanner::{analyze_cookies, parse_set_cookie};
    use crate::core::scanner::exposure_scanner::{analyze_exposure, PathClass};
    use crate::core::scanner::fingerprint_scanner::analyze_cms;
    use crate::core::scanner::headers_scanner::analyze_headers;
    use crate::core::scanner::protocol_scanner::analyze_protocol;
    use crate::core::scanner::ssl_scanner::analyze_certificate;
    use crate::core::scanner::vulnerability_scanner::analyze_vulnerabilities;
    use crate::core::models::Finding;
    use chrono::Utc;
    use std::collections::HashSet;

    fn certificate(days: i64, protocol: &str) -> CertificateDetails {
        CertificateDetails {
            hostname: "example.com".into(),
            subject: String::new(),
            issuer: String::new(),
            issuer_organization: None,
            serial_number: String::new(),
            subject_alt_names: Vec::new(),
            not_before: Utc::now(),
            not_after: Utc::now(),
            days_until_expiry: days,
            protocol_version: protocol.into(),
        }
    }

    fn emitted_findings() -> Vec<Finding> {
        let mut all = Vec::new();
        for (scheme, status, location) in [
            ("http", 301, Some("https://x/")),
            ("http", 302, Some("/x")),
            ("http", 200, None),
            ("https", 302, Some("https://x/")),
            ("https", 200, None),
        ] {
            let report = ProtocolReport {
                scheme: scheme.into(),
                status_code: status,
                redirect_location: location.map(str::to_string),
            };
            all.extend(analyze_protocol(&report).1);
        }
        for (days, protocol) in [(-1, "TLSv1.3"), (3, "TLSv1.2"), (20, "TLSv1"), (90, "SSLv3")] {
            all.extend(analyze_certificate(&certificate(days, protocol)).1);
        }
        all.extend(analyze_headers(&HeaderReport::default()).1);
        let cookies = vec![parse_set_cookie("a=1").unwrap()];
        all.extend(analyze_cookies(&cookies, true).1);
        all.extend(
            analyze_exposure(&[
                ("/.env", PathClass::Sensitive, 200),
                ("/admin", PathClass::Admin, 200),
                ("/db.sql", PathClass::Sensitive, 403),
                ("/robots.txt", PathClass::ExpectedPublic, 200),
            ])
            .1,
        );
        all.extend(analyze_cms(&CmsReport::default()).1);
        all.extend(
            analyze_cms(&CmsReport {
                cms: Some("WordPress".into()),
                warnings: vec!["WordPress: keep plugins and themes up to date".into()],
                ..Default::default()
            })
            .1,
        );
        all.extend(
            analyze_vulnerabilities(&VulnerabilityReport {
                cookies_without_http_only: vec!["a".into()],
                server: Some("nginx".into()),
                powered_by: Some("PHP".into()),
                ..Default::default()
            })
            .1,
        );
        all
    }

    #[test]
    fn every_emitted_code_is_documented_with_matching_metadata() {
        for finding in emitted_findings() {
            let detail = get_finding_detail(&finding.code)
                .unwrap_or_else(|| panic!("no knowledge base entry for {}", finding.code));
            assert_eq!(detail.severity, finding.severity, "severity of {}", finding.code);
            assert_eq!(detail.category, finding.category, "category of {}", finding.code);
        }
    }

    #[test]
    fn codes_are_unique_and_all_reachable() {
        let mut seen = HashSet::new();
        for detail in FINDINGS {
            assert!(seen.insert(detail.code), "duplicate code {}", detail.code);
        }
        let emitted: HashSet<String> = emitted_findings().into_iter().map(|f| f.code).collect();
        let network_only = ["SSL_BASIC_VALID", "SSL_BASIC_UPGRADED", "SSL_BASIC_MISSING"];
        for detail in FINDINGS {
            assert!(
                emitted.contains(detail.code) || network_only.contains(&detail.code),
                "{} is never emitted",
                detail.code
            );
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert!(get_finding_detail("NOPE").is_none());
    }
}
