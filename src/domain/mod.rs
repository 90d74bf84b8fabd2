//! Domain-level orchestration.
//!
//! [`DomainChecker`] turns a domain name into a [`DomainResult`]:
//! 1. resolve and deduplicate the MX hostnames
//! 2. narrow them to the expected hostnames, when given
//! 3. probe each hostname (through the scan cache) with bounded concurrency
//! 4. validate the MTA-STS policy against the probe results
//!
//! DNS failures and empty answers are verdicts, not errors: the domain is
//! reported as having no mail service.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::cache::ScanStore;
use crate::config::DEFAULT_HOSTNAME_CONCURRENCY;
use crate::dns::{normalize_hostname, DnsResolver};
use crate::error_handling::{FailureType, InfoType, ProcessingStats};
use crate::models::{DomainResult, HostnameResult};
use crate::mta_sts::{matches_any, MtaStsCheck};
use crate::smtp::HostnameCheck;
use crate::validator::DomainCheck;

/// Message for domains without usable MX records.
pub const NO_MX_RECORDS: &str = "No MX records found";

/// Message for domains whose MX set misses every expected hostname.
pub const NO_MATCHING_HOSTNAMES: &str =
    "none of the MX hostnames match the expected hostnames";

/// Checks whole mail domains.
#[derive(Clone)]
pub struct DomainChecker {
    resolver: Arc<dyn DnsResolver>,
    hostname_checker: Arc<dyn HostnameCheck>,
    mta_sts_checker: Arc<dyn MtaStsCheck>,
    cache: Option<Arc<dyn ScanStore>>,
    concurrency: usize,
    stats: Option<Arc<ProcessingStats>>,
}

impl DomainChecker {
    /// A checker without a cache that probes up to 8 hostnames at once.
    pub fn new(
        resolver: Arc<dyn DnsResolver>,
        hostname_checker: Arc<dyn HostnameCheck>,
        mta_sts_checker: Arc<dyn MtaStsCheck>,
    ) -> Self {
        DomainChecker {
            resolver,
            hostname_checker,
            mta_sts_checker,
            cache: None,
            concurrency: DEFAULT_HOSTNAME_CONCURRENCY,
            stats: None,
        }
    }

    /// Reads and writes hostname results through `cache`.
    pub fn with_cache(mut self, cache: Arc<dyn ScanStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Bounds concurrent hostname probes per domain. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Counts outcomes in `stats`.
    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Checks `domain`, optionally probing only MX hostnames that match one
    /// of `expected_hostnames` (exact names or `*.` wildcard patterns).
    ///
    /// An empty expected list places no restriction, like `None`.
    pub async fn check_domain(
        &self,
        domain: &str,
        expected_hostnames: Option<&[String]>,
    ) -> DomainResult {
        let domain = normalize_hostname(domain);
        let result = self.check_normalized(&domain, expected_hostnames).await;
        self.count_info(InfoType::DomainChecked);
        log::debug!("Checked {domain}: {}", result.status());
        result
    }

    async fn check_normalized(
        &self,
        domain: &str,
        expected_hostnames: Option<&[String]>,
    ) -> DomainResult {
        let mx_hostnames = match self.resolver.lookup_mx(domain).await {
            Ok(hosts) => dedupe(hosts),
            Err(e) => {
                log::warn!("MX lookup for {domain} failed: {e}");
                self.count_failure(FailureType::MxLookupError);
                Vec::new()
            }
        };
        if mx_hostnames.is_empty() {
            self.count_failure(FailureType::NoMxRecords);
            return DomainResult::without_mail_service(domain, NO_MX_RECORDS);
        }

        let preferred: Vec<String> = match expected_hostnames {
            Some(patterns) if !patterns.is_empty() => mx_hostnames
                .iter()
                .filter(|host| matches_any(patterns, host))
                .cloned()
                .collect(),
            _ => mx_hostnames.clone(),
        };
        if preferred.is_empty() {
            return DomainResult::no_matching_hostnames(
                domain,
                mx_hostnames,
                NO_MATCHING_HOSTNAMES,
            );
        }

        let hostname_results: BTreeMap<String, HostnameResult> = stream::iter(preferred.clone())
            .map(|hostname| async move {
                let result = self.scan_hostname(domain, &hostname).await;
                (hostname, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mta_sts = self
            .mta_sts_checker
            .check_mta_sts(domain, &hostname_results)
            .await;

        DomainResult::from_checks(domain, mx_hostnames, preferred, hostname_results, mta_sts)
    }

    /// Returns a fresh cached result for `hostname`, or probes it and
    /// stores the outcome. Cache errors never change the verdict.
    async fn scan_hostname(&self, domain: &str, hostname: &str) -> HostnameResult {
        let Some(cache) = &self.cache else {
            return self.hostname_checker.check_hostname(domain, hostname).await;
        };

        match cache.get_hostname_scan(hostname).await {
            Ok(Some(cached)) => {
                log::debug!("Using cached scan of {hostname} for {domain}");
                self.count_info(InfoType::CacheHit);
                return HostnameResult::observed_at(
                    domain,
                    hostname,
                    cached.checks().to_vec(),
                    cached.timestamp(),
                );
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("Could not read cached scan of {hostname}: {e}");
                self.count_failure(FailureType::CacheReadError);
            }
        }

        let result = self.hostname_checker.check_hostname(domain, hostname).await;
        if let Err(e) = cache.put_hostname_scan(hostname, &result).await {
            log::warn!("Could not cache scan of {hostname}: {e}");
            self.count_failure(FailureType::CacheWriteError);
        }
        result
    }

    fn count_failure(&self, failure: FailureType) {
        if let Some(stats) = &self.stats {
            stats.increment_failure(failure);
        }
    }

    fn count_info(&self, info: InfoType) {
        if let Some(stats) = &self.stats {
            stats.increment_info(info);
        }
    }
}

#[async_trait]
impl DomainCheck for DomainChecker {
    async fn check(&self, domain: &str, hostnames: &[String]) -> DomainResult {
        self.check_domain(domain, Some(hostnames)).await
    }
}

/// Normalizes hostnames and drops repeats, keeping first-seen order.
fn dedupe(hosts: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    hosts
        .into_iter()
        .map(|h| normalize_hostname(&h))
        .filter(|h| !h.is_empty() && seen.insert(h.clone()))
        .collect()
}
