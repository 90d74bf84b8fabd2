//! SMTP STARTTLS probing of individual MX hostnames.
//!
//! [`HostnameChecker`] connects to a mail server, upgrades the session with
//! STARTTLS and validates the negotiated TLS session. The outcome is always a
//! [`HostnameResult`]; network and protocol errors become failure-tier checks.
//!
//! Checks, in the order they run:
//! - `connectivity`: TCP connection to the SMTP port
//! - `starttls`: greeting, EHLO advertising STARTTLS, and a 220 reply to it
//! - `version`: TLS handshake at version 1.2 or later
//! - `certificate`: chain of trust, hostname match and expiry

mod error;
mod probe;
mod reply;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{DEFAULT_EHLO_HOSTNAME, SMTP_PORT};
use crate::error_handling::{FailureType, InfoType, InitializationError, ProcessingStats};
use crate::models::{HostnameResult, Status, CERTIFICATE};
use crate::tls::TlsProbeConfig;

use probe::{Probe, ProbeOutcome};

/// Produces a [`HostnameResult`] for one MX hostname of a domain.
#[async_trait]
pub trait HostnameCheck: Send + Sync {
    /// Probes `hostname` on behalf of `domain`. Never fails.
    async fn check_hostname(&self, domain: &str, hostname: &str) -> HostnameResult;
}

/// Live STARTTLS prober.
#[derive(Clone)]
pub struct HostnameChecker {
    timeout: Duration,
    port: u16,
    ehlo_hostname: String,
    tls: TlsProbeConfig,
    stats: Option<Arc<ProcessingStats>>,
}

impl HostnameChecker {
    /// A checker trusting the webpki roots, probing port 25.
    ///
    /// `timeout` bounds the whole probe of one hostname.
    pub fn new(timeout: Duration) -> Result<Self, InitializationError> {
        Ok(Self::with_tls_config(
            timeout,
            TlsProbeConfig::with_webpki_roots()?,
        ))
    }

    /// A checker using the given TLS settings.
    pub fn with_tls_config(timeout: Duration, tls: TlsProbeConfig) -> Self {
        HostnameChecker {
            timeout,
            port: SMTP_PORT,
            ehlo_hostname: DEFAULT_EHLO_HOSTNAME.to_string(),
            tls,
            stats: None,
        }
    }

    /// Probes `port` instead of 25.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Announces `name` in EHLO.
    pub fn with_ehlo_hostname(mut self, name: &str) -> Self {
        self.ehlo_hostname = name.to_string();
        self
    }

    /// Counts probe outcomes in `stats`.
    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    fn record(&self, outcome: &ProbeOutcome) {
        let Some(stats) = &self.stats else {
            return;
        };
        stats.increment_info(InfoType::HostnameProbed);
        if let Some(error) = &outcome.error {
            stats.increment_failure(error.failure_type());
            return;
        }
        match outcome
            .checks
            .iter()
            .find(|c| c.name() == CERTIFICATE)
            .map(|c| c.status())
        {
            Some(Status::Failure) => stats.increment_failure(FailureType::CertificateInvalid),
            Some(Status::Warning) => stats.increment_failure(FailureType::CertificateExpiringSoon),
            _ => {}
        }
    }
}

#[async_trait]
impl HostnameCheck for HostnameChecker {
    async fn check_hostname(&self, domain: &str, hostname: &str) -> HostnameResult {
        log::debug!("Probing {hostname}:{} for {domain}", self.port);

        let outcome = Probe {
            hostname,
            port: self.port,
            ehlo_hostname: &self.ehlo_hostname,
            timeout: self.timeout,
            tls: &self.tls,
        }
        .run()
        .await;
        self.record(&outcome);

        let result = HostnameResult::new(domain, hostname, outcome.checks);
        if result.status() != Status::Success {
            log::info!(
                "{hostname} ({domain}): {} - {}",
                result.status(),
                result.messages().join("; ")
            );
        }
        result
    }
}

#[cfg(test)]
mod tests;
