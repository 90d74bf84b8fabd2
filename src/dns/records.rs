//! DNS record queries (MX, TXT).

use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::TokioAsyncResolver;

use super::normalize_hostname;
use crate::error_handling::DnsError;

/// Queries MX (mail exchanger) records for a domain.
///
/// Returns the exchange hostnames sorted by preference (lower preference =
/// higher priority), normalized and without the trailing dot. A name with no
/// MX records, or that does not exist, yields an empty vector.
pub async fn lookup_mx_records(
    domain: &str,
    resolver: &TokioAsyncResolver,
) -> Result<Vec<String>, DnsError> {
    match resolver.lookup(domain, RecordType::MX).await {
        Ok(lookup) => {
            let mut mx_records: Vec<(u16, String)> = lookup
                .iter()
                .filter_map(|rdata| {
                    if let RData::MX(mx) = rdata {
                        Some((mx.preference(), normalize_hostname(&mx.exchange().to_utf8())))
                    } else {
                        None
                    }
                })
                .filter(|(_, host)| !host.is_empty())
                .collect();
            mx_records.sort_by_key(|(priority, _)| *priority);
            Ok(mx_records.into_iter().map(|(_, host)| host).collect())
        }
        Err(e) => empty_or_error("MX", domain, e),
    }
}

/// Queries TXT (text) records for a name.
///
/// Records split into several character strings are joined back together.
pub async fn lookup_txt_records(
    name: &str,
    resolver: &TokioAsyncResolver,
) -> Result<Vec<String>, DnsError> {
    match resolver.lookup(name, RecordType::TXT).await {
        Ok(lookup) => {
            let txt_records: Vec<String> = lookup
                .iter()
                .filter_map(|rdata| {
                    if let RData::TXT(txt) = rdata {
                        Some(
                            txt.iter()
                                .map(|bytes| String::from_utf8_lossy(bytes).to_string())
                                .collect::<Vec<String>>()
                                .join(""),
                        )
                    } else {
                        None
                    }
                })
                .collect();
            Ok(txt_records)
        }
        Err(e) => empty_or_error("TXT", name, e),
    }
}

fn empty_or_error<T>(kind: &str, name: &str, e: ResolveError) -> Result<Vec<T>, DnsError> {
    // NXDomain is reported by hickory as NoRecordsFound with a response code
    if let ResolveErrorKind::NoRecordsFound { .. } = e.kind() {
        return Ok(Vec::new());
    }
    if matches!(e.kind(), ResolveErrorKind::Timeout) {
        log::warn!("{kind} record lookup timed out for {name}: {e}");
    } else {
        log::warn!("Failed to lookup {kind} records for {name}: {e}");
    }
    Err(DnsError::new(name, e.to_string()))
}
