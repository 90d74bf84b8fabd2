//! Top-level runs behind the command-line subcommands.
//!
//! Each function initializes what it needs from a [`Config`], does its work
//! and prints failure statistics at the end.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use log::info;
use tokio_util::sync::CancellationToken;

use crate::app::{log_domain_result, print_failure_statistics, print_scan_summary};
use crate::config::{Config, OutputFormat};
use crate::error_handling::ProcessingStats;
use crate::initialization::init_domain_checker;
use crate::policy_list::{policy_list_check, StaticPolicyList};
use crate::scan::{
    BatchScanPipeline, DomainTotals, JsonLinesWriter, PipelineConfig, ResultHandler,
    ScanSummary,
};
use crate::validator::{MemoryPolicyStore, Validator};

/// Options for [`run_batch_scan`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// CSV file with one domain per row.
    pub file: PathBuf,
    /// Zero-based column holding the domain.
    pub column: usize,
    /// Whether the first row is a header.
    pub has_headers: bool,
    /// How results are reported.
    pub output: OutputFormat,
    /// Label for the totals report; defaults to the file name.
    pub source: Option<String>,
}

/// Checks `domains` and writes one JSON result per line to stdout.
///
/// With `policy_list` set, each domain's membership in that list is logged
/// as well. Returns the number of domains whose verdict was not a success.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a resource cannot be
/// initialized or the policy list cannot be read.
pub async fn run_checks(
    config: &Config,
    domains: &[String],
    policy_list: Option<&Path>,
) -> Result<usize> {
    config.validate().context("Invalid configuration")?;
    let list = policy_list
        .map(|path| {
            StaticPolicyList::from_json_file(path)
                .with_context(|| format!("Failed to load policy list {}", path.display()))
        })
        .transpose()?;

    let stats = Arc::new(ProcessingStats::new());
    let checker = init_domain_checker(config, Arc::clone(&stats))
        .await
        .context("Failed to initialize domain checker")?;

    let mut writer = JsonLinesWriter::new(io::stdout());
    let mut failed = 0;
    let mut results = stream::iter(domains.iter())
        .map(|domain| checker.check_domain(domain, None))
        .buffered(config.pool_size.max(1));
    while let Some(result) = results.next().await {
        log_domain_result(&result);
        if let Some(list) = &list {
            let membership = policy_list_check(result.domain(), list);
            info!(
                "{}: {} {}{}",
                result.domain(),
                membership.name(),
                membership.status(),
                membership
                    .messages()
                    .first()
                    .map(|m| format!(" ({m})"))
                    .unwrap_or_default()
            );
        }
        if !result.status().is_success() {
            failed += 1;
        }
        writer.handle_domain(result);
    }
    writer.flush().context("Failed to flush output")?;

    print_failure_statistics(&stats);
    Ok(failed)
}

/// Checks every domain in a CSV file with the batch pipeline.
///
/// Totals are printed as a tab-separated report; JSON lines are written to
/// stdout as results complete.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the input cannot be
/// opened or fails while being read, or a resource cannot be initialized.
pub async fn run_batch_scan(
    config: &Config,
    options: &ScanOptions,
    cancel: CancellationToken,
) -> Result<ScanSummary> {
    config.validate().context("Invalid configuration")?;
    let pipeline_config = PipelineConfig::new(config.pool_size).context("Invalid pool size")?;

    let reader = csv::ReaderBuilder::new()
        .has_headers(options.has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&options.file)
        .with_context(|| format!("Failed to open input file {}", options.file.display()))?;

    let stats = Arc::new(ProcessingStats::new());
    let checker = init_domain_checker(config, Arc::clone(&stats))
        .await
        .context("Failed to initialize domain checker")?;
    let pipeline = BatchScanPipeline::new(Arc::new(checker), pipeline_config)
        .with_cancellation(cancel);
    info!(
        "Scanning {} with {} workers",
        options.file.display(),
        pipeline_config.pool_size
    );

    let summary = match options.output {
        OutputFormat::Totals => {
            let source = options.source.clone().unwrap_or_else(|| {
                options
                    .file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let mut totals = DomainTotals::new(source);
            let summary = pipeline
                .run(reader, options.column, &mut totals)
                .await
                .context("Batch scan failed")?;
            print!("{totals}");
            summary
        }
        OutputFormat::Jsonl => {
            let mut writer = JsonLinesWriter::new(io::stdout());
            let summary = pipeline
                .run(reader, options.column, &mut writer)
                .await
                .context("Batch scan failed")?;
            writer.flush().context("Failed to flush output")?;
            summary
        }
    };
    io::stdout().flush().context("Failed to flush output")?;

    print_scan_summary(&summary);
    print_failure_statistics(&stats);
    Ok(summary)
}

/// Revalidates the domains in a policy file every `interval` until
/// `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the policy file cannot
/// be loaded or a resource cannot be initialized.
pub async fn run_validation(
    config: &Config,
    policies: &Path,
    name: &str,
    interval: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let store = MemoryPolicyStore::from_json_file(policies)
        .with_context(|| format!("Failed to load policies from {}", policies.display()))?;
    info!("Loaded {} domains from {}", store.len(), policies.display());

    let stats = Arc::new(ProcessingStats::new());
    let checker = init_domain_checker(config, Arc::clone(&stats))
        .await
        .context("Failed to initialize domain checker")?;

    let handle = Validator::new(name, interval, Arc::new(store), Arc::new(checker)).start();
    shutdown.cancelled().await;
    info!("Stopping validator {}", handle.name());
    handle.stop().await;

    print_failure_statistics(&stats);
    Ok(())
}
