//! Batch scanning of domain lists.
//!
//! [`BatchScanPipeline::run`] wires three stages together:
//! - one blocking producer reading CSV rows into a bounded work queue
//! - `pool_size` workers sharing that queue, each running the
//!   [`DomainChecker`] and sending results on
//! - the calling task, which hands every result to the [`ResultHandler`]
//!   one at a time, in completion order
//!
//! The results queue closes once every worker has dropped its sender, so
//! the collector sees each result exactly once and then returns. A CSV read
//! error other than end of input cancels the whole run.

mod handlers;

use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{DEFAULT_POOL_SIZE, MAX_POOL_SIZE, WORK_QUEUE_DEPTH_PER_WORKER};
use crate::domain::DomainChecker;
use crate::error_handling::{ConfigError, ScanError};
use crate::models::DomainResult;

pub use handlers::{DomainTotals, JsonLinesWriter};

/// Consumes domain results one at a time.
///
/// Calls are strictly sequential, so implementations need no locking.
pub trait ResultHandler {
    /// Handles one finished domain.
    fn handle_domain(&mut self, result: DomainResult);
}

impl<H: ResultHandler + ?Sized> ResultHandler for &mut H {
    fn handle_domain(&mut self, result: DomainResult) {
        (**self).handle_domain(result)
    }
}

impl<H: ResultHandler + ?Sized> ResultHandler for Box<H> {
    fn handle_domain(&mut self, result: DomainResult) {
        (**self).handle_domain(result)
    }
}

/// Collects every result.
impl ResultHandler for Vec<DomainResult> {
    fn handle_domain(&mut self, result: DomainResult) {
        self.push(result);
    }
}

/// Worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker tasks.
    pub pool_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl PipelineConfig {
    /// A pool of `pool_size` workers.
    pub fn new(pool_size: usize) -> Result<Self, ConfigError> {
        if pool_size == 0 || pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::OutOfRange {
                name: "pool_size",
                value: pool_size as u64,
                min: 1,
                max: MAX_POOL_SIZE as u64,
            });
        }
        Ok(PipelineConfig { pool_size })
    }
}

/// Counters from one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Data rows read from the input.
    pub rows_read: usize,
    /// Rows without a usable domain.
    pub rows_skipped: usize,
    /// Results delivered to the handler.
    pub domains_checked: usize,
    /// Whether the run was stopped from outside before the input ran out.
    pub cancelled: bool,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct ProducerCounts {
    rows_read: usize,
    rows_skipped: usize,
}

/// Runs a [`DomainChecker`] over CSV input with a fixed worker pool.
pub struct BatchScanPipeline {
    checker: Arc<DomainChecker>,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl BatchScanPipeline {
    /// A pipeline checking domains with `checker`.
    pub fn new(checker: Arc<DomainChecker>, config: PipelineConfig) -> Self {
        BatchScanPipeline {
            checker,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops the run early when `cancel` fires. Results already produced
    /// are still delivered.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Worker pool settings.
    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// Checks the domain in column `column` of every row of `reader`.
    ///
    /// Rows without that column, or with an empty value there, are skipped.
    /// Every other row yields exactly one `handle_domain` call.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InputRead` if the input fails before its end; the
    /// workers are cancelled and results finished so far are still handled.
    /// Returns `ScanError::TaskFailed` if a pipeline task panics.
    pub async fn run<R, H>(
        &self,
        reader: csv::Reader<R>,
        column: usize,
        handler: &mut H,
    ) -> Result<ScanSummary, ScanError>
    where
        R: Read + Send + 'static,
        H: ResultHandler + ?Sized,
    {
        let start = Instant::now();
        let pool_size = self.config.pool_size.max(1);
        // Fatal input errors cancel this run only, not the caller's token.
        let cancel = self.cancel.child_token();

        let (work_tx, work_rx) = mpsc::channel::<String>(pool_size * WORK_QUEUE_DEPTH_PER_WORKER);
        let (results_tx, mut results_rx) =
            mpsc::channel::<DomainResult>(pool_size * WORK_QUEUE_DEPTH_PER_WORKER);

        let producer = {
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || produce(reader, column, work_tx, cancel))
        };

        let work_rx = Arc::new(Mutex::new(work_rx));
        let mut workers = JoinSet::new();
        for id in 0..pool_size {
            workers.spawn(work(
                id,
                Arc::clone(&self.checker),
                Arc::clone(&work_rx),
                results_tx.clone(),
                cancel.clone(),
            ));
        }
        // Only the workers hold senders now.
        drop(results_tx);
        drop(work_rx);

        let mut domains_checked = 0;
        while let Some(result) = results_rx.recv().await {
            handler.handle_domain(result);
            domains_checked += 1;
        }

        let mut worker_failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("Scan worker failed: {e}");
                worker_failure.get_or_insert(e);
            }
        }

        let counts = producer.await??;
        if let Some(e) = worker_failure {
            return Err(ScanError::TaskFailed(e));
        }

        let summary = ScanSummary {
            rows_read: counts.rows_read,
            rows_skipped: counts.rows_skipped,
            domains_checked,
            cancelled: self.cancel.is_cancelled(),
            elapsed: start.elapsed(),
        };
        info!(
            "Scanned {} domains ({} rows, {} skipped) in {:.1}s",
            summary.domains_checked,
            summary.rows_read,
            summary.rows_skipped,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}

/// Reads rows and queues their domains until the input or the workers end.
fn produce<R: Read>(
    mut reader: csv::Reader<R>,
    column: usize,
    work_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) -> Result<ProducerCounts, ScanError> {
    let mut counts = ProducerCounts::default();
    for record in reader.records() {
        if cancel.is_cancelled() {
            debug!("Input reader stopping: scan cancelled");
            break;
        }
        let row = counts.rows_read + 1;
        let record = match record {
            Ok(record) => record,
            Err(source) => {
                cancel.cancel();
                return Err(ScanError::InputRead { row, source });
            }
        };
        counts.rows_read = row;

        let domain = record.get(column).map(str::trim).unwrap_or_default();
        if domain.is_empty() {
            warn!("Skipping row {row}: no domain in column {column}");
            counts.rows_skipped += 1;
            continue;
        }
        if work_tx.blocking_send(domain.to_string()).is_err() {
            // Every worker has exited.
            break;
        }
    }
    Ok(counts)
}

/// Pulls domains from the shared queue until it is empty or the run is cancelled.
async fn work(
    id: usize,
    checker: Arc<DomainChecker>,
    work_rx: Arc<Mutex<mpsc::Receiver<String>>>,
    results_tx: mpsc::Sender<DomainResult>,
    cancel: CancellationToken,
) {
    let mut handled = 0usize;
    loop {
        let next = {
            let mut queue = work_rx.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                domain = queue.recv() => domain,
            }
        };
        let Some(domain) = next else {
            break;
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = checker.check_domain(&domain, None) => result,
        };
        if results_tx.send(result).await.is_err() {
            break;
        }
        handled += 1;
    }
    debug!("Scan worker {id} finished after {handled} domains");
}

#[cfg(test)]
mod tests;
