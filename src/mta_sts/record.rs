//! `_mta-sts` TXT record discovery.

use std::sync::OnceLock;

use regex::Regex;

fn record_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^v=STSv1;\s*id=([A-Za-z0-9]{1,32})\s*(;.*)?$").ok())
        .as_ref()
}

/// Extracts the policy `id` from the TXT strings published at `_mta-sts.<domain>`.
///
/// Exactly one record starting with `v=STSv1` must be present and well
/// formed; the error explains what senders would see otherwise.
pub fn find_record_id(records: &[String]) -> Result<String, String> {
    let candidates: Vec<&str> = records
        .iter()
        .map(|r| r.trim())
        .filter(|r| r.starts_with("v=STSv1"))
        .collect();

    match candidates.as_slice() {
        [] => Err("No MTA-STS TXT record found".to_string()),
        [record] => record_regex()
            .and_then(|re| re.captures(record))
            .and_then(|caps| caps.get(1))
            .map(|id| id.as_str().to_string())
            .ok_or_else(|| format!("Malformed MTA-STS TXT record {record:?}")),
        _ => Err(format!(
            "Found {} MTA-STS TXT records; exactly one is allowed",
            candidates.len()
        )),
    }
}
