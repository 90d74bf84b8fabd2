//! Hostname probe tests against local fake SMTP servers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rustls::crypto::ring::default_provider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::RootCertStore;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

use super::*;
use crate::models::{CONNECTIVITY, STARTTLS, VERSION};

const GREETING: &[u8] = b"220 mx.test ESMTP ready\r\n";
const EHLO_WITH_STARTTLS: &[u8] = b"250-mx.test\r\n250-SIZE 10240000\r\n250 STARTTLS\r\n";

/// Serves exactly one connection with `handler` and returns the port.
async fn fake_server<F, Fut>(handler: F) -> u16
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            handler(stream).await;
        }
    });
    port
}

/// Reads one command line from the client.
async fn read_command(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    line
}

/// Plays the server side up to and including the 220 reply to STARTTLS.
async fn accept_starttls(stream: TcpStream) -> TcpStream {
    let mut reader = BufReader::new(stream);
    reader.get_mut().write_all(GREETING).await.unwrap();
    assert!(read_command(&mut reader).await.starts_with("EHLO "));
    reader.get_mut().write_all(EHLO_WITH_STARTTLS).await.unwrap();
    assert_eq!(read_command(&mut reader).await, "STARTTLS\r\n");
    reader.get_mut().write_all(b"220 go ahead\r\n").await.unwrap();
    reader.into_inner()
}

fn checker(timeout: Duration, port: u16) -> HostnameChecker {
    HostnameChecker::new(timeout).unwrap().with_port(port)
}

struct TestCert {
    der: CertificateDer<'static>,
    key: Vec<u8>,
}

fn localhost_cert() -> TestCert {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    TestCert {
        der: CertificateDer::from(cert.serialize_der().unwrap()),
        key: cert.serialize_private_key_der(),
    }
}

fn acceptor(cert: &TestCert) -> TlsAcceptor {
    let config = rustls::ServerConfig::builder_with_provider(Arc::new(default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(
            vec![cert.der.clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.key.clone())),
        )
        .unwrap();
    TlsAcceptor::from(Arc::new(config))
}

/// Full STARTTLS server presenting `cert`.
async fn tls_server(cert: &TestCert) -> u16 {
    let acceptor = acceptor(cert);
    fake_server(move |stream| async move {
        let stream = accept_starttls(stream).await;
        if let Ok(mut tls) = acceptor.accept(stream).await {
            let mut buf = [0u8; 64];
            let _ = tls.read(&mut buf).await;
        }
    })
    .await
}

#[tokio::test]
async fn test_connection_refused_is_connectivity_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = checker(Duration::from_secs(2), port)
        .check_hostname("example.com", "127.0.0.1")
        .await;

    assert_eq!(result.status(), Status::Failure);
    assert_eq!(result.checks().len(), 1);
    let connectivity = result.check(CONNECTIVITY).unwrap();
    assert!(connectivity.status().is_failure());
    assert!(connectivity.messages()[0].starts_with("Could not connect"));
    assert!(!result.could_connect());
}

#[tokio::test]
async fn test_server_without_starttls() {
    let port = fake_server(|stream| async move {
        let mut reader = BufReader::new(stream);
        reader.get_mut().write_all(GREETING).await.unwrap();
        read_command(&mut reader).await;
        reader
            .get_mut()
            .write_all(b"250-mx.test\r\n250 SIZE 10240000\r\n")
            .await
            .unwrap();
        // Hold the connection until the client gives up.
        let _ = read_command(&mut reader).await;
    })
    .await;

    let result = checker(Duration::from_secs(2), port)
        .check_hostname("example.com", "127.0.0.1")
        .await;

    assert_eq!(result.status(), Status::Failure);
    assert!(result.could_connect());
    assert!(!result.supports_starttls());
    assert_eq!(
        result.check(STARTTLS).unwrap().messages(),
        ["does not support STARTTLS"]
    );
    assert!(result.check(VERSION).is_none());
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let port = fake_server(|stream| async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    })
    .await;

    let started = std::time::Instant::now();
    let result = checker(Duration::from_millis(200), port)
        .check_hostname("example.com", "127.0.0.1")
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(result.status(), Status::Failure);
    assert!(result.could_connect());
    let starttls = result.check(STARTTLS).unwrap();
    assert!(
        starttls.messages()[0].contains("timed out"),
        "unexpected message {:?}",
        starttls.messages()
    );
}

#[tokio::test]
async fn test_rejected_greeting() {
    let port = fake_server(|mut stream| async move {
        stream
            .write_all(b"554 no service for you\r\n")
            .await
            .unwrap();
    })
    .await;

    let result = checker(Duration::from_secs(2), port)
        .check_hostname("example.com", "127.0.0.1")
        .await;

    let starttls = result.check(STARTTLS).unwrap();
    assert!(starttls.status().is_failure());
    assert!(starttls.messages()[0].contains("554"));
}

#[tokio::test]
async fn test_data_pipelined_after_starttls_reply_is_rejected() {
    let port = fake_server(|stream| async move {
        let mut reader = BufReader::new(stream);
        reader.get_mut().write_all(GREETING).await.unwrap();
        read_command(&mut reader).await;
        reader.get_mut().write_all(EHLO_WITH_STARTTLS).await.unwrap();
        read_command(&mut reader).await;
        reader
            .get_mut()
            .write_all(b"220 go ahead\r\n250 injected\r\n")
            .await
            .unwrap();
        let _ = read_command(&mut reader).await;
    })
    .await;

    let result = checker(Duration::from_secs(2), port)
        .check_hostname("example.com", "127.0.0.1")
        .await;

    let starttls = result.check(STARTTLS).unwrap();
    assert!(starttls.status().is_failure());
    assert_eq!(
        starttls.messages(),
        ["Server sent data before the TLS handshake"]
    );
}

#[tokio::test]
async fn test_close_after_starttls_fails_version() {
    let port = fake_server(|stream| async move {
        let stream = accept_starttls(stream).await;
        drop(stream);
    })
    .await;

    let result = checker(Duration::from_secs(2), port)
        .check_hostname("example.com", "127.0.0.1")
        .await;

    assert!(result.supports_starttls());
    let version = result.check(VERSION).unwrap();
    assert!(version.status().is_failure());
    assert!(version.messages()[0].starts_with("TLS handshake failed"));
    assert!(result.check(CERTIFICATE).is_none());
}

#[tokio::test]
async fn test_untrusted_certificate_fails_certificate_check_only() {
    let cert = localhost_cert();
    let port = tls_server(&cert).await;

    let result = checker(Duration::from_secs(5), port)
        .check_hostname("example.com", "localhost")
        .await;

    assert_eq!(result.check(CONNECTIVITY).unwrap().status(), Status::Success);
    assert_eq!(result.check(STARTTLS).unwrap().status(), Status::Success);
    assert_eq!(result.check(VERSION).unwrap().status(), Status::Success);
    let certificate = result.check(CERTIFICATE).unwrap();
    assert!(certificate.status().is_failure());
    assert_eq!(result.status(), Status::Failure);
}

#[tokio::test]
async fn test_trusted_certificate_succeeds() {
    let cert = localhost_cert();
    let port = tls_server(&cert).await;

    let mut roots = RootCertStore::empty();
    roots.add(cert.der.clone()).unwrap();
    let stats = Arc::new(ProcessingStats::new());
    let checker = HostnameChecker::with_tls_config(
        Duration::from_secs(5),
        TlsProbeConfig::with_roots(roots).unwrap(),
    )
    .with_port(port)
    .with_ehlo_hostname("probe.test")
    .with_stats(Arc::clone(&stats));

    let result = checker.check_hostname("example.com", "localhost").await;

    assert_eq!(result.status(), Status::Success, "{:?}", result.messages());
    assert_eq!(result.checks().len(), 4);
    assert_eq!(result.domain(), "example.com");
    assert_eq!(result.hostname(), "localhost");
    assert_eq!(stats.get_info_count(InfoType::HostnameProbed), 1);
    assert_eq!(stats.total_failures(), 0);
}

#[tokio::test]
async fn test_probe_failures_are_counted() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let stats = Arc::new(ProcessingStats::new());

    checker(Duration::from_secs(2), port)
        .with_stats(Arc::clone(&stats))
        .check_hostname("example.com", "127.0.0.1")
        .await;

    assert_eq!(stats.get_failure_count(FailureType::ConnectError), 1);
}
