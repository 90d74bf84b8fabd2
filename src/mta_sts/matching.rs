//! MX host pattern matching and policy/DNS cross-validation.

use std::collections::BTreeMap;

use crate::dns::normalize_hostname;
use crate::models::{CheckResult, HostnameResult, MtaStsMode, Status, MTA_STS_MX_CONSISTENCY};

/// Whether `hostname` matches an MX pattern.
///
/// Patterns are exact names or a leading wildcard label (`*.example.com`)
/// that stands for exactly one extra label. Comparison ignores case and a
/// trailing dot.
pub fn mx_pattern_matches(pattern: &str, hostname: &str) -> bool {
    let pattern = normalize_hostname(pattern);
    let hostname = normalize_hostname(hostname);
    if pattern.is_empty() || hostname.is_empty() {
        return false;
    }

    match pattern.strip_prefix("*.") {
        Some(suffix) => match hostname.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest == suffix,
            None => false,
        },
        None => pattern == hostname,
    }
}

/// Whether any of `patterns` matches `hostname`.
pub fn matches_any<S: AsRef<str>>(patterns: &[S], hostname: &str) -> bool {
    patterns
        .iter()
        .any(|p| mx_pattern_matches(p.as_ref(), hostname))
}

/// Cross-validates the policy's MX patterns against the probed MX hosts.
///
/// Only hosts whose probe did not fail count as serving mail: every pattern
/// must match one of them and each of them must be covered by a pattern.
/// Returns `None` for mode `none`, where the policy asserts nothing.
pub fn mx_consistency_check(
    mode: MtaStsMode,
    patterns: &[String],
    hostname_results: &BTreeMap<String, HostnameResult>,
) -> Option<CheckResult> {
    if mode == MtaStsMode::None {
        return None;
    }

    let working: Vec<&str> = hostname_results
        .values()
        .filter(|r| r.status() != Status::Failure)
        .map(HostnameResult::hostname)
        .collect();

    let mut problems = Vec::new();
    for pattern in patterns {
        if !working.iter().any(|h| mx_pattern_matches(pattern, h)) {
            problems.push(format!(
                "{pattern} appears in the MTA-STS policy but matches no working MX host"
            ));
        }
    }
    for hostname in &working {
        if !matches_any(patterns, hostname) {
            problems.push(format!(
                "{hostname} appears in the MX records but not in the MTA-STS policy"
            ));
        }
    }

    if problems.is_empty() {
        return Some(CheckResult::success(MTA_STS_MX_CONSISTENCY));
    }
    let message = problems.join("; ");
    Some(match mode {
        MtaStsMode::Enforce => CheckResult::failure(MTA_STS_MX_CONSISTENCY, message),
        _ => CheckResult::warning(MTA_STS_MX_CONSISTENCY, message),
    })
}
