use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::check::{CheckResult, Status, CONNECTIVITY, STARTTLS};

/// All checks run against one MX hostname, stamped with the probe time.
///
/// The overall status is the worst status among the checks. Stores and the
/// scan cache key these by hostname.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostnameResult {
    domain: String,
    hostname: String,
    status: Status,
    checks: Vec<CheckResult>,
    timestamp: DateTime<Utc>,
}

impl HostnameResult {
    /// Builds a result observed now.
    pub fn new(
        domain: impl Into<String>,
        hostname: impl Into<String>,
        checks: Vec<CheckResult>,
    ) -> Self {
        Self::observed_at(domain, hostname, checks, Utc::now())
    }

    /// Builds a result with an explicit probe timestamp.
    pub fn observed_at(
        domain: impl Into<String>,
        hostname: impl Into<String>,
        checks: Vec<CheckResult>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let status = Status::worst(checks.iter().map(CheckResult::status));
        HostnameResult {
            domain: domain.into(),
            hostname: hostname.into(),
            status,
            checks,
            timestamp,
        }
    }

    /// Mail domain the probe was run for.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Probed MX hostname.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Worst status among the checks.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Individual checks in the order they ran.
    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    /// Looks up a check by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name() == name)
    }

    /// When the probe finished.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Diagnostic messages from every check.
    pub fn messages(&self) -> Vec<String> {
        self.checks.iter().flat_map(CheckResult::all_messages).collect()
    }

    /// Whether the TCP connection to the SMTP port succeeded.
    pub fn could_connect(&self) -> bool {
        self.check(CONNECTIVITY)
            .is_some_and(|c| c.status().is_success())
    }

    /// Whether the server accepted STARTTLS.
    pub fn supports_starttls(&self) -> bool {
        self.check(STARTTLS).is_some_and(|c| c.status().is_success())
    }
}
