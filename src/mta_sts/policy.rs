//! MTA-STS policy file parsing (RFC 8461 section 3.2).

use thiserror::Error;

use crate::config::MAX_MTA_STS_MAX_AGE;
use crate::dns::normalize_hostname;
use crate::models::MtaStsMode;

/// A parsed `mta-sts.txt` policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtaStsPolicy {
    /// Declared mode.
    pub mode: MtaStsMode,
    /// Lifetime in seconds.
    pub max_age: u64,
    /// MX host patterns, normalized.
    pub mx: Vec<String>,
}

/// Why a policy body was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyParseError {
    #[error("line {0:?} is not a key: value pair")]
    MalformedLine(String),
    #[error("missing version")]
    MissingVersion,
    #[error("unsupported version {0:?}")]
    UnsupportedVersion(String),
    #[error("missing mode")]
    MissingMode,
    #[error("invalid mode {0:?}")]
    InvalidMode(String),
    #[error("missing max_age")]
    MissingMaxAge,
    #[error("invalid max_age {0:?}")]
    InvalidMaxAge(String),
    #[error("max_age {0} exceeds {MAX_MTA_STS_MAX_AGE}")]
    MaxAgeTooLarge(u64),
    #[error("mode {0} requires at least one mx entry")]
    MissingMx(MtaStsMode),
}

/// Parses a policy body. Unknown keys are ignored; for repeated scalar keys
/// the first occurrence wins.
pub fn parse_policy(body: &str) -> Result<MtaStsPolicy, PolicyParseError> {
    let mut version = None;
    let mut mode = None;
    let mut max_age = None;
    let mut mx = Vec::new();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| PolicyParseError::MalformedLine(line.to_string()))?;
        let value = value.trim();
        match key.trim() {
            "version" => {
                version.get_or_insert(value);
            }
            "mode" => {
                mode.get_or_insert(value);
            }
            "max_age" => {
                max_age.get_or_insert(value);
            }
            "mx" => mx.push(normalize_hostname(value)),
            _ => {}
        }
    }

    match version {
        None => return Err(PolicyParseError::MissingVersion),
        Some("STSv1") => {}
        Some(other) => return Err(PolicyParseError::UnsupportedVersion(other.to_string())),
    }

    let mode = mode.ok_or(PolicyParseError::MissingMode)?;
    let mode =
        MtaStsMode::parse(mode).ok_or_else(|| PolicyParseError::InvalidMode(mode.to_string()))?;

    let max_age = max_age.ok_or(PolicyParseError::MissingMaxAge)?;
    let max_age: u64 = max_age
        .parse()
        .map_err(|_| PolicyParseError::InvalidMaxAge(max_age.to_string()))?;
    if max_age > MAX_MTA_STS_MAX_AGE {
        return Err(PolicyParseError::MaxAgeTooLarge(max_age));
    }

    mx.retain(|m| !m.is_empty());
    if mx.is_empty() && mode != MtaStsMode::None {
        return Err(PolicyParseError::MissingMx(mode));
    }

    Ok(MtaStsPolicy { mode, max_age, mx })
}
