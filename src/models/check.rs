//! Generic check outcome and severity tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// TCP connection to the SMTP port.
pub const CONNECTIVITY: &str = "connectivity";
/// STARTTLS advertised and accepted.
pub const STARTTLS: &str = "starttls";
/// Negotiated TLS protocol version.
pub const VERSION: &str = "version";
/// Certificate chain and hostname validation.
pub const CERTIFICATE: &str = "certificate";
/// Aggregate MTA-STS check.
pub const MTA_STS: &str = "mta-sts";
/// `_mta-sts` TXT record.
pub const MTA_STS_TEXT: &str = "mta-sts-text";
/// Well-known policy file.
pub const MTA_STS_POLICY_FILE: &str = "mta-sts-policy-file";
/// Policy MX patterns against the probed MX hostnames.
pub const MTA_STS_MX_CONSISTENCY: &str = "mta-sts-mx-consistency";
/// Membership on the published policy list.
pub const POLICY_LIST: &str = "policy-list";

/// Severity tier of a check, ordered from best to worst.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The check passed.
    #[default]
    Success,
    /// Functional, but deviates from best practice.
    Warning,
    /// The check failed.
    Failure,
}

impl Status {
    /// Returns the most severe status, or `Success` for an empty input.
    pub fn worst<I>(statuses: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        statuses.into_iter().max().unwrap_or_default()
    }

    /// Whether this is the success tier.
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Whether this is the failure tier.
    pub fn is_failure(self) -> bool {
        self == Status::Failure
    }

    /// Lowercase name used in logs and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Warning => "warning",
            Status::Failure => "failure",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one named check.
///
/// Severity and message are fixed together by the constructor that is used
/// (`success`, `warning`, `failure` or `aggregate`); there are no setters, so
/// a result can never be widened after it has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    name: String,
    status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    checks: Vec<CheckResult>,
}

impl CheckResult {
    fn with_status(name: impl Into<String>, status: Status, messages: Vec<String>) -> Self {
        CheckResult {
            name: name.into(),
            status,
            messages,
            checks: Vec::new(),
        }
    }

    /// A passing check.
    pub fn success(name: impl Into<String>) -> Self {
        Self::with_status(name, Status::Success, Vec::new())
    }

    /// A warning-tier check carrying a diagnostic message.
    pub fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, Status::Warning, vec![message.into()])
    }

    /// A failure-tier check carrying a diagnostic message.
    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_status(name, Status::Failure, vec![message.into()])
    }

    /// A parent check whose status is the worst of its sub-checks.
    pub fn aggregate(name: impl Into<String>, checks: Vec<CheckResult>) -> Self {
        let status = Status::worst(checks.iter().map(CheckResult::status));
        CheckResult {
            name: name.into(),
            status,
            messages: Vec::new(),
            checks,
        }
    }

    /// Check identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Severity tier.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Messages attached directly to this check.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Sub-checks, in the order they ran.
    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    /// Finds a direct sub-check by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Messages of this check and all sub-checks, depth-first.
    pub fn all_messages(&self) -> Vec<String> {
        let mut out = self.messages.clone();
        for check in &self.checks {
            out.extend(check.all_messages());
        }
        out
    }
}
