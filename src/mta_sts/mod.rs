//! MTA-STS policy discovery and validation (RFC 8461).
//!
//! A policy is usable when its file can be fetched over HTTPS and parsed.
//! Anything short of that yields `None`: the domain is judged without
//! MTA-STS rather than failed. A usable policy is then checked for:
//! - `mta-sts-text`: a well-formed `_mta-sts` TXT record (warning if missing)
//! - `mta-sts-policy-file`: served as `text/plain` (warning otherwise)
//! - `mta-sts-mx-consistency`: policy MX patterns agree with the probed MX hosts

mod fetch;
mod matching;
mod policy;
mod record;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DEFAULT_MTA_STS_POLICY_URL;
use crate::dns::DnsResolver;
use crate::error_handling::{FailureType, InfoType, ProcessingStats};
use crate::models::{
    CheckResult, HostnameResult, MtaStsResult, Status, MTA_STS_MX_CONSISTENCY,
    MTA_STS_POLICY_FILE, MTA_STS_TEXT,
};

pub use matching::{matches_any, mx_consistency_check, mx_pattern_matches};
pub use policy::{parse_policy, MtaStsPolicy, PolicyParseError};
pub use record::find_record_id;

use fetch::{fetch_policy, is_text_plain};

/// Produces the MTA-STS verdict for a domain.
#[async_trait]
pub trait MtaStsCheck: Send + Sync {
    /// Validates `domain`'s policy against the already probed MX hosts.
    ///
    /// `None` means no usable policy was found.
    async fn check_mta_sts(
        &self,
        domain: &str,
        hostname_results: &BTreeMap<String, HostnameResult>,
    ) -> Option<MtaStsResult>;
}

/// Live MTA-STS checker using HTTPS and DNS.
pub struct MtaStsChecker {
    client: reqwest::Client,
    resolver: Arc<dyn DnsResolver>,
    policy_url: String,
    stats: Option<Arc<ProcessingStats>>,
}

impl MtaStsChecker {
    /// A checker fetching from `https://mta-sts.<domain>/.well-known/mta-sts.txt`.
    pub fn new(client: reqwest::Client, resolver: Arc<dyn DnsResolver>) -> Self {
        MtaStsChecker {
            client,
            resolver,
            policy_url: DEFAULT_MTA_STS_POLICY_URL.to_string(),
            stats: None,
        }
    }

    /// Fetches policies from `template`, with `{domain}` replaced by the domain.
    pub fn with_policy_url(mut self, template: &str) -> Self {
        self.policy_url = template.to_string();
        self
    }

    /// Counts outcomes in `stats`.
    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Policy URL for `domain`.
    pub fn policy_url_for(&self, domain: &str) -> String {
        self.policy_url.replace("{domain}", domain)
    }

    async fn text_record_check(&self, domain: &str) -> (CheckResult, Option<String>) {
        match self.resolver.lookup_txt(&format!("_mta-sts.{domain}")).await {
            Ok(records) => match find_record_id(&records) {
                Ok(id) => (CheckResult::success(MTA_STS_TEXT), Some(id)),
                Err(reason) => (CheckResult::warning(MTA_STS_TEXT, reason), None),
            },
            Err(e) => (CheckResult::warning(MTA_STS_TEXT, e.to_string()), None),
        }
    }

    fn count(&self, failure: Option<FailureType>, info: Option<InfoType>) {
        if let Some(stats) = &self.stats {
            if let Some(failure) = failure {
                stats.increment_failure(failure);
            }
            if let Some(info) = info {
                stats.increment_info(info);
            }
        }
    }
}

fn policy_file_check(content_type: Option<&str>) -> CheckResult {
    if is_text_plain(content_type) {
        CheckResult::success(MTA_STS_POLICY_FILE)
    } else {
        CheckResult::warning(
            MTA_STS_POLICY_FILE,
            format!(
                "Policy file served as {}, expected text/plain",
                content_type.unwrap_or("no content type")
            ),
        )
    }
}

#[async_trait]
impl MtaStsCheck for MtaStsChecker {
    async fn check_mta_sts(
        &self,
        domain: &str,
        hostname_results: &BTreeMap<String, HostnameResult>,
    ) -> Option<MtaStsResult> {
        let url = self.policy_url_for(domain);
        let (fetched, (text_check, record_id)) =
            tokio::join!(fetch_policy(&self.client, &url), self.text_record_check(domain));

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                log::debug!("No MTA-STS policy for {domain} at {url}: {e}");
                self.count(Some(FailureType::MtaStsPolicyUnavailable), None);
                return None;
            }
        };
        let policy = match parse_policy(&fetched.body) {
            Ok(policy) => policy,
            Err(e) => {
                log::info!("Ignoring unparsable MTA-STS policy for {domain}: {e}");
                self.count(Some(FailureType::MtaStsPolicyUnavailable), None);
                return None;
            }
        };

        let mut checks = vec![
            text_check,
            policy_file_check(fetched.content_type.as_deref()),
        ];
        if let Some(consistency) = mx_consistency_check(policy.mode, &policy.mx, hostname_results)
        {
            checks.push(consistency);
        }

        let result = MtaStsResult::new(policy.mode, policy.mx, policy.max_age, record_id, checks);
        let inconsistent = result
            .check(MTA_STS_MX_CONSISTENCY)
            .is_some_and(|c| c.status() != Status::Success);
        self.count(
            inconsistent.then_some(FailureType::MtaStsInconsistent),
            Some(InfoType::MtaStsPolicyFound),
        );
        log::debug!(
            "MTA-STS policy for {domain}: mode={} status={}",
            result.mode(),
            result.status()
        );
        Some(result)
    }
}
