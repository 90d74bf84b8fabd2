//! Leaf certificate inspection with `x509-parser`.

use rustls::pki_types::CertificateDer;

/// Seconds per day.
const DAY_SECS: i64 = 24 * 60 * 60;

/// Whole days between `now` (Unix seconds) and the certificate's `notAfter`.
///
/// Negative when the certificate has already expired.
pub fn days_until_expiry(cert: &CertificateDer<'_>, now: i64) -> Result<i64, String> {
    let (_, parsed) = x509_parser::parse_x509_certificate(cert.as_ref())
        .map_err(|e| format!("failed to parse certificate: {e}"))?;
    let not_after = parsed.validity().not_after.timestamp();
    Ok((not_after - now).div_euclid(DAY_SECS))
}

/// Subject distinguished name of the certificate, for log messages.
pub fn subject(cert: &CertificateDer<'_>) -> Option<String> {
    x509_parser::parse_x509_certificate(cert.as_ref())
        .ok()
        .map(|(_, parsed)| parsed.subject().to_string())
}
