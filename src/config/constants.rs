//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the application,
//! including timeouts, size limits, and other operational parameters.

/// Per-probe network timeout in seconds.
/// Applies to the whole SMTP/STARTTLS probe of one hostname and to the MTA-STS fetch.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Upper bound accepted by `Config::validate`.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Number of batch workers when `CONNECTION_POOL_SIZE` is unset or invalid.
pub const DEFAULT_POOL_SIZE: usize = 16;
/// Upper bound accepted by `Config::validate`.
pub const MAX_POOL_SIZE: usize = 1024;
/// Environment variable holding the batch worker count.
pub const POOL_SIZE_ENV: &str = "CONNECTION_POOL_SIZE";
/// Work queue slots per batch worker.
pub const WORK_QUEUE_DEPTH_PER_WORKER: usize = 2;

/// Concurrent hostname probes within one domain check.
/// MX sets are small, so this only guards against pathological records.
pub const DEFAULT_HOSTNAME_CONCURRENCY: usize = 8;

/// How long a cached hostname scan is reused, in seconds (10 minutes).
pub const DEFAULT_CACHE_EXPIRY_SECS: u64 = 600;

/// Default revalidation interval for `validate` runs, in seconds (1 day).
pub const DEFAULT_VALIDATION_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Log a progress line every this many domains in a batch run.
pub const PROGRESS_LOG_EVERY: usize = 1000;

// SMTP
/// SMTP port probed on every MX hostname.
pub const SMTP_PORT: u16 = 25;
/// Name announced in EHLO.
pub const DEFAULT_EHLO_HOSTNAME: &str = "localhost";
/// Maximum bytes accepted for one SMTP reply line (RFC 5321 text line limit).
pub const MAX_SMTP_LINE_BYTES: usize = 1000;
/// Maximum lines accepted in one multi-line SMTP reply.
pub const MAX_SMTP_REPLY_LINES: usize = 128;

// Certificates
/// Certificates expiring within this many days are reported as a warning.
pub const CERT_EXPIRY_WARNING_DAYS: i64 = 14;

// MTA-STS (RFC 8461)
/// Where the policy file is fetched from. `{domain}` is replaced by the mail domain.
pub const DEFAULT_MTA_STS_POLICY_URL: &str = "https://mta-sts.{domain}/.well-known/mta-sts.txt";
/// Largest policy body accepted, in bytes (64 KiB).
pub const MAX_MTA_STS_POLICY_BYTES: usize = 64 * 1024;
/// Largest `max_age` a policy may declare, in seconds (about one year).
pub const MAX_MTA_STS_MAX_AGE: u64 = 31_557_600;

/// User-Agent sent with MTA-STS policy requests.
pub const USER_AGENT: &str = concat!("starttls_check/", env!("CARGO_PKG_VERSION"));

// DNS
/// Per-attempt DNS query timeout in seconds.
pub const DNS_TIMEOUT_SECS: u64 = 3;
/// DNS query attempts before giving up.
pub const DNS_ATTEMPTS: usize = 2;
