//! TLS configuration and certificate validation for STARTTLS probes.
//!
//! The probe handshake completes against any certificate chain so that a
//! broken chain can be reported as a `certificate` failure while the
//! negotiated protocol version is still assessed. Once the handshake is done,
//! [`TlsProbeConfig::verify_certificate`] validates the presented chain
//! against the configured roots and the MX hostname.
//!
//! Uses `tokio-rustls` for the handshake, `webpki-roots` for the trust store
//! and `x509-parser` for expiry inspection.

mod certificate;
mod verifier;

use std::io;
use std::sync::Arc;

use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::ring::default_provider;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{AlertDescription, CertificateError, ClientConfig, PeerIncompatible, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::config::CERT_EXPIRY_WARNING_DAYS;
use crate::error_handling::InitializationError;
use crate::models::{CheckResult, CERTIFICATE};

pub use certificate::{days_until_expiry, subject};
use verifier::DeferredVerifier;

/// Client TLS settings shared by every hostname probe.
#[derive(Clone)]
pub struct TlsProbeConfig {
    client: Arc<ClientConfig>,
    verifier: Arc<WebPkiServerVerifier>,
}

impl TlsProbeConfig {
    /// Trusts the Mozilla root program via `webpki-roots`.
    pub fn with_webpki_roots() -> Result<Self, InitializationError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_roots(roots)
    }

    /// Trusts exactly the given roots.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::TlsConfigError` if the store is empty or
    /// the provider does not support TLS 1.2/1.3.
    pub fn with_roots(roots: RootCertStore) -> Result<Self, InitializationError> {
        let provider: Arc<CryptoProvider> = Arc::new(default_provider());

        let verifier =
            WebPkiServerVerifier::builder_with_provider(Arc::new(roots), Arc::clone(&provider))
                .build()
                .map_err(|e| InitializationError::TlsConfigError(e.to_string()))?;

        let client = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| InitializationError::TlsConfigError(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DeferredVerifier::new(Arc::clone(
                &verifier,
            ))))
            .with_no_client_auth();

        Ok(TlsProbeConfig {
            client: Arc::new(client),
            verifier,
        })
    }

    /// Connector performing the probe handshake.
    pub fn connector(&self) -> TlsConnector {
        TlsConnector::from(Arc::clone(&self.client))
    }

    /// Validates the chain a server presented during the handshake.
    ///
    /// Produces the `certificate` check: a failure for an untrusted, expired,
    /// not-yet-valid or misnamed certificate, a warning when the leaf expires
    /// within the warning window, and success otherwise.
    pub fn verify_certificate(
        &self,
        hostname: &str,
        peer_certificates: Option<&[CertificateDer<'_>]>,
    ) -> CheckResult {
        let Some((end_entity, intermediates)) = peer_certificates.and_then(|c| c.split_first())
        else {
            return CheckResult::failure(CERTIFICATE, "Server presented no certificate");
        };

        let server_name = match ServerName::try_from(hostname.to_string()) {
            Ok(name) => name,
            Err(e) => {
                return CheckResult::failure(
                    CERTIFICATE,
                    format!("{hostname} is not a valid TLS server name: {e}"),
                )
            }
        };

        let now = UnixTime::now();
        if let Err(e) =
            self.verifier
                .verify_server_cert(end_entity, intermediates, &server_name, &[], now)
        {
            return CheckResult::failure(CERTIFICATE, describe_certificate_error(hostname, &e));
        }

        match days_until_expiry(end_entity, now.as_secs() as i64) {
            Ok(days) if days < CERT_EXPIRY_WARNING_DAYS => CheckResult::warning(
                CERTIFICATE,
                format!("Certificate for {hostname} expires in {days} days"),
            ),
            Ok(_) => CheckResult::success(CERTIFICATE),
            Err(e) => {
                // The chain already verified; expiry inspection is advisory.
                log::debug!("Skipping expiry check for {hostname}: {e}");
                CheckResult::success(CERTIFICATE)
            }
        }
    }
}

fn describe_certificate_error(hostname: &str, err: &rustls::Error) -> String {
    match err {
        rustls::Error::InvalidCertificate(CertificateError::NotValidForName) => {
            format!("Certificate is not valid for {hostname}")
        }
        rustls::Error::InvalidCertificate(CertificateError::Expired) => {
            "Certificate has expired".to_string()
        }
        rustls::Error::InvalidCertificate(CertificateError::NotValidYet) => {
            "Certificate is not valid yet".to_string()
        }
        rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer) => {
            "Certificate is not signed by a trusted root".to_string()
        }
        rustls::Error::NoCertificatesPresented => "Server presented no certificate".to_string(),
        other => format!("Certificate is invalid: {other}"),
    }
}

/// Whether a failed handshake means the server only offers TLS below 1.2.
///
/// tokio-rustls surfaces rustls errors wrapped in `io::Error`.
pub fn is_deprecated_version_error(err: &io::Error) -> bool {
    let Some(inner) = err
        .get_ref()
        .and_then(|e| e.downcast_ref::<rustls::Error>())
    else {
        return false;
    };
    matches!(
        inner,
        rustls::Error::PeerIncompatible(
            PeerIncompatible::ServerDoesNotSupportTls12Or13
                | PeerIncompatible::ServerTlsVersionIsDisabledByOurConfig
        ) | rustls::Error::AlertReceived(AlertDescription::ProtocolVersion)
    )
}
