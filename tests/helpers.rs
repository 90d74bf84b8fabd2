// Shared test helpers: fake collaborators for the domain checker and CSV builders.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use starttls_check::dns::DnsResolver;
use starttls_check::error_handling::DnsError;
use starttls_check::models::{CheckResult, HostnameResult, MtaStsResult, CONNECTIVITY, STARTTLS};
use starttls_check::mta_sts::MtaStsCheck;
use starttls_check::smtp::HostnameCheck;
use starttls_check::{DomainChecker, PipelineConfig};

/// Resolver giving every domain a single `mx.<domain>` host.
pub struct EchoResolver;

#[async_trait]
impl DnsResolver for EchoResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        Ok(vec![format!("mx.{domain}")])
    }

    async fn lookup_txt(&self, _: &str) -> Result<Vec<String>, DnsError> {
        Ok(Vec::new())
    }
}

/// Hostname checker that succeeds after yielding, counting its calls.
#[derive(Default)]
pub struct CountingHostnameChecker {
    pub calls: AtomicUsize,
}

#[async_trait]
impl HostnameCheck for CountingHostnameChecker {
    async fn check_hostname(&self, domain: &str, hostname: &str) -> HostnameResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        HostnameResult::new(
            domain,
            hostname,
            vec![
                CheckResult::success(CONNECTIVITY),
                CheckResult::success(STARTTLS),
            ],
        )
    }
}

/// MTA-STS checker for domains without a policy.
pub struct NoPolicy;

#[async_trait]
impl MtaStsCheck for NoPolicy {
    async fn check_mta_sts(
        &self,
        _: &str,
        _: &BTreeMap<String, HostnameResult>,
    ) -> Option<MtaStsResult> {
        None
    }
}

/// A domain checker over fakes, plus the hostname checker for call counts.
#[allow(dead_code)] // Used by other test files
pub fn fake_checker() -> (Arc<DomainChecker>, Arc<CountingHostnameChecker>) {
    let hosts = Arc::new(CountingHostnameChecker::default());
    let checker = DomainChecker::new(Arc::new(EchoResolver), hosts.clone(), Arc::new(NoPolicy));
    (Arc::new(checker), hosts)
}

/// Pipeline config with `pool_size` workers.
#[allow(dead_code)] // Used by other test files
pub fn pool(pool_size: usize) -> PipelineConfig {
    PipelineConfig::new(pool_size).expect("valid pool size")
}

/// CSV reader over `n` rows of `domain<i>.test`.
#[allow(dead_code)] // Used by other test files
pub fn domain_rows(n: usize) -> csv::Reader<Cursor<Vec<u8>>> {
    let input: String = (0..n).map(|i| format!("domain{i}.test\n")).collect();
    csv_reader(&input)
}

/// Headerless, flexible CSV reader over `input`.
#[allow(dead_code)] // Used by other test files
pub fn csv_reader(input: &str) -> csv::Reader<Cursor<Vec<u8>>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(input.as_bytes().to_vec()))
}
