use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tokio::time::timeout;

use super::*;
use crate::dns::StaticResolver;
use crate::domain::DomainChecker;
use crate::models::{CheckResult, HostnameResult, MtaStsResult, Status, CONNECTIVITY};
use crate::mta_sts::MtaStsCheck;
use crate::smtp::HostnameCheck;

fn passing(domain: &str) -> DomainResult {
    let hostname = format!("mx.{domain}");
    let mut results = BTreeMap::new();
    results.insert(
        hostname.clone(),
        HostnameResult::new(domain, &hostname, vec![CheckResult::success(CONNECTIVITY)]),
    );
    DomainResult::from_checks(domain, vec![hostname.clone()], vec![hostname], results, None)
}

fn failing(domain: &str) -> DomainResult {
    DomainResult::without_mail_service(domain, "No MX records found")
}

fn store(domains: &[&str]) -> Arc<MemoryPolicyStore> {
    Arc::new(MemoryPolicyStore::new(
        domains
            .iter()
            .map(|d| (d.to_string(), vec!["hostname".to_string()])),
    ))
}

/// Signals every call and fails the domains named "fail" and "error".
struct SignallingCheck {
    calls: mpsc::UnboundedSender<(String, Vec<String>)>,
}

#[async_trait]
impl DomainCheck for SignallingCheck {
    async fn check(&self, domain: &str, hostnames: &[String]) -> DomainResult {
        let _ = self.calls.send((domain.to_string(), hostnames.to_vec()));
        if domain == "fail" || domain == "error" {
            failing(domain)
        } else {
            passing(domain)
        }
    }
}

struct CountingCheck(AtomicUsize);

#[async_trait]
impl DomainCheck for CountingCheck {
    async fn check(&self, domain: &str, _: &[String]) -> DomainResult {
        self.0.fetch_add(1, Ordering::SeqCst);
        passing(domain)
    }
}

struct BrokenStore;

#[async_trait]
impl DomainPolicyStore for BrokenStore {
    async fn domains_to_validate(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("database is down".to_string()))
    }

    async fn hostnames_for_domain(&self, _: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("database is down".to_string()))
    }
}

#[tokio::test]
async fn test_regular_validation_calls_check() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = Validator::new(
        "mock",
        Duration::from_millis(100),
        store(&["a"]),
        Arc::new(SignallingCheck { calls: tx }),
    )
    .start();

    let (domain, hostnames) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("check was not called within a second")
        .unwrap();
    assert_eq!(domain, "a");
    assert_eq!(hostnames, vec!["hostname"]);
    handle.stop().await;
}

#[tokio::test]
async fn test_regular_validation_reports_failures() {
    let (calls, _calls_rx) = mpsc::unbounded_channel();
    let (reports_tx, mut reports) = mpsc::unbounded_channel();
    let reporter = move |name: &str, domain: &str, result: &DomainResult| {
        assert_eq!(name, "mock");
        assert_eq!(result.status(), Status::Failure);
        let _ = reports_tx.send(domain.to_string());
    };

    let handle = Validator::new(
        "mock",
        Duration::from_millis(100),
        store(&["fail", "error", "normal"]),
        Arc::new(SignallingCheck { calls }),
    )
    .with_reporter(Arc::new(reporter))
    .start();

    let mut received = HashSet::new();
    for _ in 0..4 {
        let domain = timeout(Duration::from_secs(1), reports.recv())
            .await
            .expect("timed out waiting for reports")
            .unwrap();
        received.insert(domain);
    }
    handle.stop().await;

    assert!(received.contains("fail"));
    assert!(received.contains("error"));
    assert!(!received.contains("normal"));
}

#[tokio::test]
async fn test_validate_once_counts_reports() {
    let (calls, mut calls_rx) = mpsc::unbounded_channel();
    let reported = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reported);
    let validator = Validator::new(
        "once",
        Duration::from_secs(60),
        store(&["fail", "normal"]),
        Arc::new(SignallingCheck { calls }),
    )
    .with_reporter(Arc::new(move |_: &str, _: &str, _: &DomainResult| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    assert_eq!(validator.validate_once().await, 1);
    assert_eq!(reported.load(Ordering::SeqCst), 1);
    // Domains are visited in sorted order.
    assert_eq!(calls_rx.recv().await.unwrap().0, "fail");
    assert_eq!(calls_rx.recv().await.unwrap().0, "normal");
}

struct ReachableHosts;

#[async_trait]
impl HostnameCheck for ReachableHosts {
    async fn check_hostname(&self, domain: &str, hostname: &str) -> HostnameResult {
        HostnameResult::new(domain, hostname, vec![CheckResult::success(CONNECTIVITY)])
    }
}

struct NoPolicy;

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

#[tokio::test]
async fn test_domain_without_expected_hostnames_is_not_reported() {
    let resolver = StaticResolver::new().with_mx("example.com", ["mx.example.com"]);
    let checker = DomainChecker::new(
        Arc::new(resolver),
        Arc::new(ReachableHosts),
        Arc::new(NoPolicy),
    );
    let store = Arc::new(MemoryPolicyStore::new([(
        "example.com".to_string(),
        Vec::<String>::new(),
    )]));
    let reported = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reported);
    let validator = Validator::new("empty", Duration::from_secs(60), store, Arc::new(checker))
        .with_reporter(Arc::new(move |_: &str, _: &str, _: &DomainResult| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

    assert_eq!(validator.validate_once().await, 0);
    assert_eq!(reported.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_errors_skip_the_pass() {
    let check = Arc::new(CountingCheck(AtomicUsize::new(0)));
    let validator = Validator::new(
        "broken",
        Duration::from_secs(60),
        Arc::new(BrokenStore),
        check.clone(),
    );
    assert_eq!(validator.validate_once().await, 0);
    assert_eq!(check.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stop_ends_the_loop() {
    let check = Arc::new(CountingCheck(AtomicUsize::new(0)));
    let handle = Validator::new(
        "stoppable",
        Duration::from_millis(10),
        store(&["a"]),
        check.clone(),
    )
    .start();
    assert_eq!(handle.name(), "stoppable");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.is_running());
    handle.stop().await;

    let after_stop = check.0.load(Ordering::SeqCst);
    assert!(after_stop >= 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(check.0.load(Ordering::SeqCst), after_stop);
}

#[tokio::test]
async fn test_independent_validators_do_not_interfere() {
    let first = Arc::new(CountingCheck(AtomicUsize::new(0)));
    let second = Arc::new(CountingCheck(AtomicUsize::new(0)));
    let a = Validator::new(
        "first",
        Duration::from_millis(10),
        store(&["a", "b"]),
        first.clone(),
    )
    .start();
    let b = Validator::new("second", Duration::from_millis(10), store(&["a"]), second.clone())
        .start();

    tokio::time::sleep(Duration::from_millis(60)).await;
    a.stop().await;
    assert!(b.is_running());
    b.stop().await;

    assert!(first.0.load(Ordering::SeqCst) >= 2);
    assert!(second.0.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_memory_policy_store_from_json() {
    let store = MemoryPolicyStore::from_json(
        r#"{"Example.com": ["mx1.example.com", "*.example.net"], "b.org": []}"#,
    )
    .unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.domains_to_validate().await.unwrap(),
        vec!["b.org", "example.com"]
    );
    assert_eq!(
        store.hostnames_for_domain("example.com").await.unwrap(),
        vec!["mx1.example.com", "*.example.net"]
    );
    assert!(store.hostnames_for_domain("missing.org").await.is_err());
    assert!(MemoryPolicyStore::from_json("[1, 2]").is_err());
}

#[test]
fn test_zero_interval_is_clamped() {
    let check = Arc::new(CountingCheck(AtomicUsize::new(0)));
    let validator = Validator::new("zero", Duration::ZERO, store(&[]), check);
    assert_eq!(validator.interval(), MIN_INTERVAL);
}
