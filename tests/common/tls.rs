// tests/common/tls.rs

//! A throwaway certificate authority and a TLS listener on 127.0.0.1 that
//! completes handshakes with a leaf issued by it.

use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;

use chrono::{DateTime, Duration, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::ssl::{SslAcceptor, SslMethod, SslOptions, SslVersion};
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509, X509Name, X509NameBuilder, X509Ref};

pub const CA_ORGANIZATION: &str = "Vanguard Test CA";

/// Protocol window the listener accepts.
#[derive(Debug, Clone, Copy)]
pub enum Protocols {
    Modern,
    Only(SslVersion),
}

pub struct TlsFixture {
    pub port: u16,
    pub ca_file: PathBuf,
    pub not_after: DateTime<Utc>,
}

impl TlsFixture {
    /// A clock at which the leaf has `days` whole days left.
    pub fn clock_with_days_left(&self, days: i64) -> DateTime<Utc> {
        self.not_after - Duration::days(days) - Duration::hours(1)
    }
}

fn key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

fn name(common_name: &str, organization: Option<&str>) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    if let Some(org) = organization {
        builder.append_entry_by_text("O", org).unwrap();
    }
    builder.append_entry_by_text("CN", common_name).unwrap();
    builder.build()
}

#[allow(clippy::too_many_arguments)]
fn certificate(
    serial: u32,
    subject: &X509Name,
    issuer: &X509Name,
    public: &PKey<Private>,
    signer: &PKey<Private>,
    issuer_cert: Option<&X509Ref>,
    not_after: i64,
    is_ca: bool,
) -> X509 {
    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(subject).unwrap();
    builder.set_issuer_name(issuer).unwrap();
    builder.set_pubkey(public).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(Utc::now().timestamp() - 86_400).unwrap())
        .unwrap();
    builder.set_not_after(&Asn1Time::from_unix(not_after).unwrap()).unwrap();

    if is_ca {
        builder.append_extension(BasicConstraints::new().critical().ca().build().unwrap()).unwrap();
        builder
            .append_extension(KeyUsage::new().critical().key_cert_sign().crl_sign().build().unwrap())
            .unwrap();
    } else {
        builder.append_extension(BasicConstraints::new().build().unwrap()).unwrap();
        let san = SubjectAlternativeName::new()
            .dns("localhost")
            .ip("127.0.0.1")
            .build(&builder.x509v3_context(issuer_cert, None))
            .unwrap();
        builder.append_extension(san).unwrap();
    }

    builder.sign(signer, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Starts a TLS listener whose leaf expires `valid_days` from now. The
/// accept loop runs on a detached thread for the rest of the test process.
pub fn start_tls_server(valid_days: i64, protocols: Protocols) -> TlsFixture {
    let not_after = Utc::now().timestamp() + valid_days * 86_400;

    let ca_key = key();
    let ca_name = name("Vanguard Test Root", Some(CA_ORGANIZATION));
    let ca = certificate(1, &ca_name, &ca_name, &ca_key, &ca_key, None, not_after + 86_400, true);

    let leaf_key = key();
    let leaf = certificate(2, &name("localhost", None), &ca_name, &leaf_key, &ca_key, Some(&*ca), not_after, false);

    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).unwrap();
    acceptor.set_private_key(&leaf_key).unwrap();
    acceptor.set_certificate(&leaf).unwrap();
    acceptor.add_extra_chain_cert(ca.clone()).unwrap();
    if let Protocols::Only(version) = protocols {
        acceptor.clear_options(SslOptions::NO_TLSV1 | SslOptions::NO_TLSV1_1);
        acceptor.set_min_proto_version(Some(version)).unwrap();
        acceptor.set_max_proto_version(Some(version)).unwrap();
        acceptor.set_security_level(0);
        acceptor.set_cipher_list("DEFAULT:@SECLEVEL=0").unwrap();
    }
    let acceptor = acceptor.build();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let ca_file = std::env::temp_dir().join(format!("vanguard-assess-ca-{}-{}.pem", std::process::id(), port));
    std::fs::write(&ca_file, ca.to_pem().unwrap()).unwrap();

    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let acceptor = acceptor.clone();
            thread::spawn(move || {
                if let Ok(mut tls) = acceptor.accept(stream) {
                    let _ = tls.shutdown();
                }
            });
        }
    });

    TlsFixture {
        port,
        ca_file,
        not_after: DateTime::from_timestamp(not_after, 0).unwrap(),
    }
}
