//! Configuration types.
//!
//! This module defines the library [`Config`] struct and the enums shared with
//! command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::config::constants::{
    DEFAULT_CACHE_EXPIRY_SECS, DEFAULT_EHLO_HOSTNAME, DEFAULT_HOSTNAME_CONCURRENCY,
    DEFAULT_MTA_STS_POLICY_URL, DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT_SECS, MAX_POOL_SIZE,
    MAX_TIMEOUT_SECS, SMTP_PORT,
};
use crate::error_handling::ConfigError;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Library configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use starttls_check::Config;
///
/// let config = Config {
///     timeout_seconds: 5,
///     pool_size: 32,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level
    pub log_level: LogLevel,

    /// Log format
    pub log_format: LogFormat,

    /// Timeout for one hostname probe and for the MTA-STS fetch, in seconds
    pub timeout_seconds: u64,

    /// Number of batch scan workers
    pub pool_size: usize,

    /// Concurrent hostname probes within one domain
    pub hostname_concurrency: usize,

    /// How long a cached hostname scan stays fresh, in seconds
    pub cache_expiry_seconds: u64,

    /// SQLite file backing the scan cache; in-memory when unset
    pub cache_db_path: Option<PathBuf>,

    /// Port probed on each MX hostname
    pub smtp_port: u16,

    /// Name announced in EHLO
    pub ehlo_hostname: String,

    /// Policy URL template; `{domain}` is replaced by the mail domain
    pub mta_sts_policy_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            pool_size: DEFAULT_POOL_SIZE,
            hostname_concurrency: DEFAULT_HOSTNAME_CONCURRENCY,
            cache_expiry_seconds: DEFAULT_CACHE_EXPIRY_SECS,
            cache_db_path: None,
            smtp_port: SMTP_PORT,
            ehlo_hostname: DEFAULT_EHLO_HOSTNAME.to_string(),
            mta_sts_policy_url: DEFAULT_MTA_STS_POLICY_URL.to_string(),
        }
    }
}

impl Config {
    /// Probe timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Cache freshness window as a `Duration`.
    pub fn cache_expiry(&self) -> Duration {
        Duration::from_secs(self.cache_expiry_seconds)
    }

    /// Checks every setting against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("timeout_seconds", self.timeout_seconds, 1, MAX_TIMEOUT_SECS)?;
        check_range("pool_size", self.pool_size as u64, 1, MAX_POOL_SIZE as u64)?;
        check_range(
            "hostname_concurrency",
            self.hostname_concurrency as u64,
            1,
            MAX_POOL_SIZE as u64,
        )?;
        check_range("smtp_port", u64::from(self.smtp_port), 1, u64::from(u16::MAX))?;

        if self.ehlo_hostname.trim().is_empty() || self.ehlo_hostname.contains(char::is_whitespace)
        {
            return Err(ConfigError::Invalid {
                name: "ehlo_hostname",
                reason: format!("{:?} is not a hostname", self.ehlo_hostname),
            });
        }
        if !self.mta_sts_policy_url.contains("{domain}") {
            return Err(ConfigError::Invalid {
                name: "mta_sts_policy_url",
                reason: "template must contain {domain}".to_string(),
            });
        }
        Ok(())
    }
}

fn check_range(name: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Parses a `CONNECTION_POOL_SIZE` value.
///
/// Unset, non-numeric, zero and oversized values all fall back to the
/// default pool size.
pub fn pool_size_or_default(raw: Option<&str>) -> usize {
    match raw.map(str::trim).map(str::parse::<usize>) {
        Some(Ok(size)) if (1..=MAX_POOL_SIZE).contains(&size) => size,
        Some(_) => {
            log::warn!(
                "Ignoring invalid pool size {:?}; using {}",
                raw.unwrap_or_default(),
                DEFAULT_POOL_SIZE
            );
            DEFAULT_POOL_SIZE
        }
        None => DEFAULT_POOL_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.pool_size, 16);
        assert_eq!(config.hostname_concurrency, 8);
        assert_eq!(config.cache_expiry(), Duration::from_secs(600));
        assert_eq!(config.smtp_port, 25);
        assert_eq!(config.ehlo_hostname, "localhost");
        assert!(config.cache_db_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                name: "timeout_seconds",
                value: 0,
                min: 1,
                max: MAX_TIMEOUT_SECS,
            })
        );
    }

    #[test]
    fn test_validate_rejects_template_without_placeholder() {
        let config = Config {
            mta_sts_policy_url: "https://example.com/policy.txt".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                name: "mta_sts_policy_url",
                ..
            })
        ));
    }

    #[test]
    fn test_pool_size_or_default() {
        assert_eq!(pool_size_or_default(None), DEFAULT_POOL_SIZE);
        assert_eq!(pool_size_or_default(Some("4")), 4);
        assert_eq!(pool_size_or_default(Some(" 32 ")), 32);
        assert_eq!(pool_size_or_default(Some("0")), DEFAULT_POOL_SIZE);
        assert_eq!(pool_size_or_default(Some("lots")), DEFAULT_POOL_SIZE);
        assert_eq!(pool_size_or_default(Some("-3")), DEFAULT_POOL_SIZE);
        assert_eq!(pool_size_or_default(Some("1024")), MAX_POOL_SIZE);
        assert_eq!(pool_size_or_default(Some("5000")), DEFAULT_POOL_SIZE);
    }
}
