//! The STARTTLS probe of a single MX hostname.
//!
//! Steps run in order and the first failing step ends the probe; every check
//! that ran is reported. All network I/O shares one deadline.

use std::future::Future;
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

use super::error::ProbeError;
use super::reply::{read_reply, Reply};
use crate::models::{CheckResult, Status, CERTIFICATE, CONNECTIVITY, STARTTLS, VERSION};
use crate::tls::{is_deprecated_version_error, TlsProbeConfig};

/// Probe parameters borrowed from the checker.
pub(crate) struct Probe<'a> {
    pub(crate) hostname: &'a str,
    pub(crate) port: u16,
    pub(crate) ehlo_hostname: &'a str,
    pub(crate) timeout: Duration,
    pub(crate) tls: &'a TlsProbeConfig,
}

/// Outcome of a probe: the checks that ran and what went wrong, if anything.
pub(crate) struct ProbeOutcome {
    pub(crate) checks: Vec<CheckResult>,
    pub(crate) error: Option<ProbeError>,
}

impl ProbeOutcome {
    fn stop(mut checks: Vec<CheckResult>, name: &str, error: ProbeError) -> Self {
        checks.push(CheckResult::failure(name, error.to_string()));
        ProbeOutcome {
            checks,
            error: Some(error),
        }
    }
}

impl Probe<'_> {
    pub(crate) async fn run(&self) -> ProbeOutcome {
        let deadline = Instant::now() + self.timeout;
        let mut checks = Vec::with_capacity(4);

        let stream = match self
            .within(deadline, "Connect", async {
                TcpStream::connect((self.hostname, self.port))
                    .await
                    .map_err(ProbeError::Connect)
            })
            .await
        {
            Ok(stream) => stream,
            Err(e) => return ProbeOutcome::stop(checks, CONNECTIVITY, e),
        };
        checks.push(CheckResult::success(CONNECTIVITY));

        let mut reader = BufReader::new(stream);
        if let Err(e) = self.negotiate_starttls(&mut reader, deadline).await {
            return ProbeOutcome::stop(checks, STARTTLS, e);
        }
        checks.push(CheckResult::success(STARTTLS));

        let server_name = match ServerName::try_from(self.hostname.to_string()) {
            Ok(name) => name,
            Err(e) => {
                checks.push(CheckResult::failure(
                    VERSION,
                    format!("{} is not a valid TLS server name: {e}", self.hostname),
                ));
                return ProbeOutcome {
                    checks,
                    error: None,
                };
            }
        };

        let connector = self.tls.connector();
        let handshake = self
            .within(deadline, "TLS handshake", async {
                connector
                    .connect(server_name, reader.into_inner())
                    .await
                    .map_err(|e| {
                        if is_deprecated_version_error(&e) {
                            ProbeError::DeprecatedVersion
                        } else {
                            ProbeError::Handshake(e)
                        }
                    })
            })
            .await;

        let mut tls_stream = match handshake {
            Ok(stream) => stream,
            Err(ProbeError::DeprecatedVersion) => {
                // Encryption still happens, just weakly; there is no session
                // this client accepts to validate a certificate against.
                let error = ProbeError::DeprecatedVersion;
                checks.push(CheckResult::warning(VERSION, error.to_string()));
                checks.push(CheckResult::failure(
                    CERTIFICATE,
                    "Could not validate certificate without a TLS 1.2+ session",
                ));
                return ProbeOutcome {
                    checks,
                    error: Some(error),
                };
            }
            Err(e) => return ProbeOutcome::stop(checks, VERSION, e),
        };

        let connection = tls_stream.get_ref().1;
        log::debug!(
            "{} negotiated {:?} with {:?}",
            self.hostname,
            connection.protocol_version(),
            connection
                .peer_certificates()
                .and_then(|certs| certs.first())
                .and_then(crate::tls::subject)
        );
        checks.push(CheckResult::success(VERSION));
        let certificate = self
            .tls
            .verify_certificate(self.hostname, connection.peer_certificates());
        if certificate.status() != Status::Success {
            log::debug!("{}: {:?}", self.hostname, certificate.messages());
        }
        checks.push(certificate);

        // Best-effort polite close; the verdict is already decided.
        let _ = timeout_at(deadline, async {
            tls_stream.write_all(b"QUIT\r\n").await?;
            tls_stream.shutdown().await
        })
        .await;

        ProbeOutcome {
            checks,
            error: None,
        }
    }

    async fn negotiate_starttls(
        &self,
        reader: &mut BufReader<TcpStream>,
        deadline: Instant,
    ) -> Result<(), ProbeError> {
        let greeting = self
            .within(deadline, "Greeting", read_reply(&mut *reader))
            .await?;
        expect_code(&greeting, 220, "greeting")?;

        let ehlo = format!("EHLO {}\r\n", self.ehlo_hostname);
        let reply = self.command(reader, deadline, "EHLO", ehlo.as_bytes()).await?;
        expect_code(&reply, 250, "EHLO")?;
        if !reply.has_extension("STARTTLS") {
            return Err(ProbeError::StarttlsUnsupported);
        }

        let reply = self
            .command(reader, deadline, "STARTTLS", b"STARTTLS\r\n")
            .await?;
        expect_code(&reply, 220, "STARTTLS")?;

        // Anything already buffered was sent before the handshake and would be
        // treated as part of the encrypted session by a naive client.
        if !reader.buffer().is_empty() {
            return Err(ProbeError::PipelinedData);
        }
        Ok(())
    }

    async fn command(
        &self,
        reader: &mut BufReader<TcpStream>,
        deadline: Instant,
        step: &'static str,
        line: &[u8],
    ) -> Result<Reply, ProbeError> {
        self.within(deadline, step, async {
            reader.get_mut().write_all(line).await?;
            read_reply(&mut *reader).await
        })
        .await
    }

    async fn within<T, F>(
        &self,
        deadline: Instant,
        step: &'static str,
        fut: F,
    ) -> Result<T, ProbeError>
    where
        F: Future<Output = Result<T, ProbeError>>,
    {
        timeout_at(deadline, fut)
            .await
            .map_err(|_| ProbeError::Timeout {
                step,
                timeout: self.timeout,
            })?
    }
}

fn expect_code(reply: &Reply, expected: u16, command: &'static str) -> Result<(), ProbeError> {
    if reply.code == expected {
        return Ok(());
    }
    Err(ProbeError::UnexpectedReply {
        command,
        code: reply.code,
        text: reply.text(),
    })
}
