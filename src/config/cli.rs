//! Command-line options.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::{
    DEFAULT_CACHE_EXPIRY_SECS, DEFAULT_EHLO_HOSTNAME, DEFAULT_HOSTNAME_CONCURRENCY,
    DEFAULT_MTA_STS_POLICY_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_VALIDATION_INTERVAL_SECS,
    POOL_SIZE_ENV, SMTP_PORT,
};
use crate::config::types::{pool_size_or_default, Config, LogFormat, LogLevel};

/// STARTTLS and MTA-STS checker for mail domains.
#[derive(Debug, Parser)]
#[command(name = "starttls_check", version, about)]
pub struct Cli {
    /// Options shared by every subcommand
    #[command(flatten)]
    pub global: GlobalArgs,

    /// What to run
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain", global = true)]
    pub log_format: LogFormat,

    /// Timeout for one hostname probe and for the MTA-STS fetch, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub timeout_seconds: u64,

    /// Number of batch scan workers (invalid values fall back to the default)
    #[arg(long, env = POOL_SIZE_ENV, global = true)]
    pub pool_size: Option<String>,

    /// Concurrent hostname probes within one domain
    #[arg(long, default_value_t = DEFAULT_HOSTNAME_CONCURRENCY, global = true)]
    pub hostname_concurrency: usize,

    /// How long a cached hostname scan stays fresh, in seconds
    #[arg(long, default_value_t = DEFAULT_CACHE_EXPIRY_SECS, global = true)]
    pub cache_expiry_seconds: u64,

    /// SQLite file for the scan cache (in-memory when omitted)
    #[arg(long, global = true)]
    pub cache_db: Option<PathBuf>,

    /// Port probed on each MX hostname
    #[arg(long, default_value_t = SMTP_PORT, global = true)]
    pub smtp_port: u16,

    /// Name announced in EHLO
    #[arg(long, default_value = DEFAULT_EHLO_HOSTNAME, global = true)]
    pub ehlo_hostname: String,

    /// MTA-STS policy URL template; `{domain}` is replaced by the mail domain
    #[arg(long, default_value = DEFAULT_MTA_STS_POLICY_URL, global = true)]
    pub mta_sts_policy_url: String,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the given domains and print one JSON result per line
    Check {
        /// Domains to check
        #[arg(required = true)]
        domains: Vec<String>,

        /// JSON policy list; each domain is also checked for membership
        #[arg(long)]
        policy_list: Option<PathBuf>,
    },

    /// Check every domain in a CSV file
    Scan {
        /// CSV file with one domain per row
        file: PathBuf,

        /// Zero-based column holding the domain
        #[arg(long, default_value_t = 0)]
        column: usize,

        /// Treat the first row as a header
        #[arg(long)]
        has_headers: bool,

        /// How results are reported
        #[arg(long, value_enum, default_value = "totals")]
        output: OutputFormat,

        /// Label recorded in the totals report (defaults to the file name)
        #[arg(long)]
        source: Option<String>,
    },

    /// Periodically revalidate the domains in a policy file
    Validate {
        /// JSON file mapping domain to expected MX hostnames
        policies: PathBuf,

        /// Seconds between validation passes
        #[arg(long, default_value_t = DEFAULT_VALIDATION_INTERVAL_SECS)]
        interval_seconds: u64,

        /// Validator name used in logs and reports
        #[arg(long, default_value = "policy-list")]
        name: String,
    },
}

/// Report produced by `scan`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aggregate totals printed as one tab-separated line
    Totals,
    /// Every domain result as one JSON object per line
    Jsonl,
}

impl From<&GlobalArgs> for Config {
    fn from(args: &GlobalArgs) -> Self {
        Config {
            log_level: args.log_level.clone(),
            log_format: args.log_format.clone(),
            timeout_seconds: args.timeout_seconds,
            pool_size: pool_size_or_default(args.pool_size.as_deref()),
            hostname_concurrency: args.hostname_concurrency,
            cache_expiry_seconds: args.cache_expiry_seconds,
            cache_db_path: args.cache_db.clone(),
            smtp_port: args.smtp_port,
            ehlo_hostname: args.ehlo_hostname.clone(),
            mta_sts_policy_url: args.mta_sts_policy_url.clone(),
        }
    }
}

impl Cli {
    /// Library configuration described by the global options.
    pub fn config(&self) -> Config {
        Config::from(&self.global)
    }
}
