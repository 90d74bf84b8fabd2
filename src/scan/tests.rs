//! Pipeline and handler tests with in-process fakes.

use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};

use async_trait::async_trait;

use super::*;
use crate::dns::DnsResolver;
use crate::error_handling::DnsError;
use crate::models::{CheckResult, HostnameResult, MtaStsMode, MtaStsResult, Status, CONNECTIVITY};
use crate::mta_sts::MtaStsCheck;
use crate::smtp::HostnameCheck;

/// Every domain has `mx.<domain>` except those starting with "nomx".
struct EchoResolver;

#[async_trait]
impl DnsResolver for EchoResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        if domain.starts_with("nomx") {
            Ok(Vec::new())
        } else {
            Ok(vec![format!("mx.{domain}")])
        }
    }

    async fn lookup_txt(&self, _: &str) -> Result<Vec<String>, DnsError> {
        Ok(Vec::new())
    }
}

struct AlwaysUp;

#[async_trait]
impl HostnameCheck for AlwaysUp {
    async fn check_hostname(&self, domain: &str, hostname: &str) -> HostnameResult {
        tokio::task::yield_now().await;
        HostnameResult::new(domain, hostname, vec![CheckResult::success(CONNECTIVITY)])
    }
}

/// Enforce for domains starting with "enforce", testing for "testing".
struct ModeByPrefix;

#[async_trait]
impl MtaStsCheck for ModeByPrefix {
    async fn check_mta_sts(
        &self,
        domain: &str,
        _: &BTreeMap<String, HostnameResult>,
    ) -> Option<MtaStsResult> {
        let mode = if domain.starts_with("enforce") {
            MtaStsMode::Enforce
        } else if domain.starts_with("testing") {
            MtaStsMode::Testing
        } else {
            return None;
        };
        Some(MtaStsResult::new(mode, vec![format!("mx.{domain}")], 86400, None, Vec::new()))
    }
}

fn pipeline(pool_size: usize) -> BatchScanPipeline {
    let checker = DomainChecker::new(
        Arc::new(EchoResolver),
        Arc::new(AlwaysUp),
        Arc::new(ModeByPrefix),
    );
    BatchScanPipeline::new(Arc::new(checker), PipelineConfig::new(pool_size).unwrap())
}

fn reader(input: &str) -> csv::Reader<io::Cursor<Vec<u8>>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(io::Cursor::new(input.as_bytes().to_vec()))
}

fn passing(domain: &str, mode: Option<MtaStsMode>) -> DomainResult {
    let hostname = format!("mx.{domain}");
    let mut hosts = BTreeMap::new();
    hosts.insert(
        hostname.clone(),
        HostnameResult::new(domain, &hostname, vec![CheckResult::success(CONNECTIVITY)]),
    );
    let mta_sts = mode.map(|m| MtaStsResult::new(m, Vec::new(), 1, None, Vec::new()));
    DomainResult::from_checks(domain, vec![hostname.clone()], vec![hostname], hosts, mta_sts)
}

#[tokio::test]
async fn test_every_row_is_handled_once() {
    let input: String = (0..50).map(|i| format!("domain{i}.test\n")).collect();
    let mut results: Vec<DomainResult> = Vec::new();
    let summary = pipeline(4).run(reader(&input), 0, &mut results).await.unwrap();

    assert_eq!(summary.rows_read, 50);
    assert_eq!(summary.domains_checked, 50);
    assert!(!summary.cancelled);
    let domains: HashSet<&str> = results.iter().map(|r| r.domain()).collect();
    assert_eq!(domains.len(), 50);
    assert!(results.iter().all(|r| r.status() == Status::Success));
}

#[tokio::test]
async fn test_rows_without_domain_are_skipped() {
    let input = "1,a.test\n2\n3,  \n4,b.test\n";
    let mut results: Vec<DomainResult> = Vec::new();
    let summary = pipeline(2).run(reader(input), 1, &mut results).await.unwrap();

    assert_eq!(summary.rows_read, 4);
    assert_eq!(summary.rows_skipped, 2);
    assert_eq!(summary.domains_checked, 2);
}

#[tokio::test]
async fn test_read_error_is_fatal() {
    // Strict readers reject rows with a different field count.
    let strict = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(io::Cursor::new(b"a.test\nb.test,extra\nc.test\n".to_vec()));
    let mut results: Vec<DomainResult> = Vec::new();
    let err = pipeline(2).run(strict, 0, &mut results).await.unwrap_err();

    match err {
        ScanError::InputRead { row, .. } => assert_eq!(row, 2),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(results.len() <= 1);
}

#[tokio::test]
async fn test_external_cancellation() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let input: String = (0..20).map(|i| format!("domain{i}.test\n")).collect();
    let mut results: Vec<DomainResult> = Vec::new();
    let summary = pipeline(2)
        .with_cancellation(cancel)
        .run(reader(&input), 0, &mut results)
        .await
        .unwrap();
    assert!(summary.cancelled);
    assert!(summary.domains_checked < 20);
}

#[tokio::test]
async fn test_totals_through_pipeline() {
    let input = "enforce1.test\ntesting1.test\nplain.test\nnomx.test\nenforce2.test\n";
    let mut totals = DomainTotals::new("fixture.csv");
    pipeline(3).run(reader(input), 0, &mut totals).await.unwrap();

    assert_eq!(totals.attempted, 5);
    assert_eq!(totals.with_mxs, 4);
    let mut enforce = totals.mta_sts_enforce.clone();
    enforce.sort();
    assert_eq!(enforce, ["enforce1.test", "enforce2.test"]);
    assert_eq!(totals.mta_sts_testing, ["testing1.test"]);
}

#[test]
fn test_pipeline_config() {
    assert_eq!(PipelineConfig::default().pool_size, 16);
    assert_eq!(PipelineConfig::new(1).unwrap().pool_size, 1);
    assert!(PipelineConfig::new(0).is_err());
    assert!(PipelineConfig::new(MAX_POOL_SIZE + 1).is_err());
}

#[test]
fn test_totals_display() {
    let mut totals = DomainTotals::new("top-1m.csv");
    totals.handle_domain(passing("a.test", Some(MtaStsMode::Enforce)));
    totals.handle_domain(passing("b.test", Some(MtaStsMode::None)));
    totals.handle_domain(DomainResult::without_mail_service("c.test", "No MX records found"));

    let text = totals.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "time\tsource\tattempted\twith_mxs\tmta_sts_testing\tmta_sts_enforce"
    );
    let fields: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(&fields[1..], ["top-1m.csv", "3", "2", "0", "1"]);
}

#[test]
fn test_json_lines_writer() {
    let mut writer = JsonLinesWriter::new(Vec::new());
    writer.handle_domain(passing("a.test", None));
    writer.handle_domain(DomainResult::without_mail_service("b.test", "No MX records found"));
    assert_eq!(writer.written(), 2);

    let output = String::from_utf8(writer.into_inner()).unwrap();
    let parsed: Vec<DomainResult> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(parsed[0].domain(), "a.test");
    assert_eq!(parsed[1].status(), Status::Failure);
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::BrokenPipe))
    }
}

struct Full;

impl Write for Full {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_json_lines_writer_errors() {
    let mut piped = JsonLinesWriter::new(BrokenPipe);
    piped.handle_domain(passing("a.test", None));
    assert_eq!(piped.errors(), 0);
    assert!(piped.flush().is_ok());

    let mut full = JsonLinesWriter::new(Full);
    full.handle_domain(passing("a.test", None));
    assert_eq!(full.errors(), 1);
    assert_eq!(full.written(), 0);
}
