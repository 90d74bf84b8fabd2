//! Periodic revalidation of known domains.
//!
//! A [`Validator`] owns one timer. On every tick it asks its
//! [`DomainPolicyStore`] which domains to revalidate, checks each one against
//! its expected MX hostnames and hands every non-success verdict to its
//! [`FailureReporter`]. Validators share nothing, so several can run side by
//! side on overlapping domain sets.
//!
//! [`Validator::start`] consumes the validator; the returned
//! [`ValidatorHandle`] is the only way to stop it, and a stopped validator
//! cannot be restarted.

mod store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error_handling::StoreError;
use crate::models::DomainResult;

pub use store::MemoryPolicyStore;

/// Shortest accepted tick interval.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Source of the domains a validator re-checks.
#[async_trait]
pub trait DomainPolicyStore: Send + Sync {
    /// Domains due for revalidation.
    async fn domains_to_validate(&self) -> Result<Vec<String>, StoreError>;

    /// Expected MX hostnames (or patterns) for `domain`, in order.
    async fn hostnames_for_domain(&self, domain: &str) -> Result<Vec<String>, StoreError>;
}

/// Checks a domain against its expected hostnames.
///
/// Problems surface only through the verdict's status.
#[async_trait]
pub trait DomainCheck: Send + Sync {
    /// Verdict for `domain` restricted to `hostnames`.
    async fn check(&self, domain: &str, hostnames: &[String]) -> DomainResult;
}

/// Receives verdicts that are not a success.
pub trait FailureReporter: Send + Sync {
    /// Called with the validator name, the domain and its verdict.
    fn report(&self, validator: &str, domain: &str, result: &DomainResult);
}

impl<F> FailureReporter for F
where
    F: Fn(&str, &str, &DomainResult) + Send + Sync,
{
    fn report(&self, validator: &str, domain: &str, result: &DomainResult) {
        self(validator, domain, result)
    }
}

/// Reports failures as log warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, validator: &str, domain: &str, result: &DomainResult) {
        let detail = result
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| summarize(result));
        log::warn!(
            "[{validator}] {domain} failed revalidation ({}): {detail}",
            result.status()
        );
    }
}

fn summarize(result: &DomainResult) -> String {
    let messages: Vec<String> = result
        .hostname_results()
        .values()
        .flat_map(|h| h.messages())
        .chain(
            result
                .mta_sts()
                .into_iter()
                .flat_map(|m| m.result().all_messages()),
        )
        .collect();
    if messages.is_empty() {
        "no details".to_string()
    } else {
        messages.join("; ")
    }
}

/// A named periodic revalidation job.
pub struct Validator {
    name: String,
    interval: Duration,
    store: Arc<dyn DomainPolicyStore>,
    checker: Arc<dyn DomainCheck>,
    reporter: Arc<dyn FailureReporter>,
}

impl Validator {
    /// A validator that logs failures as warnings.
    pub fn new(
        name: impl Into<String>,
        interval: Duration,
        store: Arc<dyn DomainPolicyStore>,
        checker: Arc<dyn DomainCheck>,
    ) -> Self {
        Validator {
            name: name.into(),
            interval: interval.max(MIN_INTERVAL),
            store,
            checker,
            reporter: Arc::new(LogReporter),
        }
    }

    /// Sends failures to `reporter` instead of the log.
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Name used in logs and reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time between passes.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the validation loop on the current tokio runtime.
    pub fn start(self) -> ValidatorHandle {
        let cancel = CancellationToken::new();
        let name = self.name.clone();
        let task = tokio::spawn(self.run(cancel.clone()));
        ValidatorHandle { name, cancel, task }
    }

    /// Runs passes every interval until `cancel` fires.
    ///
    /// The first pass starts immediately. A pass that overruns the interval
    /// delays the next one rather than triggering a burst.
    pub async fn run(self, cancel: CancellationToken) {
        log::info!(
            "Validator {} started, interval {:?}",
            self.name,
            self.interval
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                reported = self.validate_once() => {
                    log::debug!("Validator {} pass reported {reported} failures", self.name);
                }
            }
        }
        log::info!("Validator {} stopped", self.name);
    }

    /// Runs one pass and returns the number of failures reported.
    ///
    /// Store errors are logged: a failed domain listing skips the pass, a
    /// failed hostname lookup skips that domain.
    pub async fn validate_once(&self) -> usize {
        let domains = match self.store.domains_to_validate().await {
            Ok(domains) => domains,
            Err(e) => {
                log::warn!("Validator {} could not list domains: {e}", self.name);
                return 0;
            }
        };

        let mut reported = 0;
        for domain in domains {
            let hostnames = match self.store.hostnames_for_domain(&domain).await {
                Ok(hostnames) => hostnames,
                Err(e) => {
                    log::warn!(
                        "Validator {} could not load hostnames for {domain}: {e}",
                        self.name
                    );
                    continue;
                }
            };
            let result = self.checker.check(&domain, &hostnames).await;
            if !result.status().is_success() {
                self.reporter.report(&self.name, &domain, &result);
                reported += 1;
            }
        }
        reported
    }
}

/// Handle to a running [`Validator`].
pub struct ValidatorHandle {
    name: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ValidatorHandle {
    /// Name of the validator.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops the loop and waits for it to finish.
    ///
    /// A pass in progress is abandoned at its next await point.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            log::warn!("Validator {} ended abnormally: {e}", self.name);
        }
    }
}

#[cfg(test)]
mod tests;
