use std::fmt;

use serde::{Deserialize, Serialize};

use super::check::{CheckResult, Status, MTA_STS};

/// Policy mode declared in an MTA-STS policy file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MtaStsMode {
    /// Policy is disabled.
    None,
    /// Report-only.
    Testing,
    /// Senders must use validated TLS.
    Enforce,
}

impl MtaStsMode {
    /// Parses the `mode` value of a policy file.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(MtaStsMode::None),
            "testing" => Some(MtaStsMode::Testing),
            "enforce" => Some(MtaStsMode::Enforce),
            _ => None,
        }
    }

    /// Wire value of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            MtaStsMode::None => "none",
            MtaStsMode::Testing => "testing",
            MtaStsMode::Enforce => "enforce",
        }
    }
}

impl fmt::Display for MtaStsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain's MTA-STS policy together with the checks run against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtaStsResult {
    mode: MtaStsMode,
    mxs: Vec<String>,
    max_age: u64,
    record_id: Option<String>,
    result: CheckResult,
}

impl MtaStsResult {
    /// Wraps a parsed policy and its checks.
    pub fn new(
        mode: MtaStsMode,
        mxs: Vec<String>,
        max_age: u64,
        record_id: Option<String>,
        checks: Vec<CheckResult>,
    ) -> Self {
        MtaStsResult {
            mode,
            mxs,
            max_age,
            record_id,
            result: CheckResult::aggregate(MTA_STS, checks),
        }
    }

    /// Declared policy mode.
    pub fn mode(&self) -> MtaStsMode {
        self.mode
    }

    /// MX patterns listed in the policy.
    pub fn mxs(&self) -> &[String] {
        &self.mxs
    }

    /// Policy lifetime in seconds.
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    /// `id` field of the `_mta-sts` TXT record, when one was found.
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    /// Aggregate check with one sub-check per validation step.
    pub fn result(&self) -> &CheckResult {
        &self.result
    }

    /// Worst status among the validation steps.
    pub fn status(&self) -> Status {
        self.result.status()
    }

    /// Looks up a validation step by name.
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.result.check(name)
    }
}
