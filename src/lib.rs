//! starttls_check library: STARTTLS and MTA-STS checks for mail domains
//!
//! This library probes the MX hosts of email domains for STARTTLS support,
//! validates their TLS sessions and certificates, checks published MTA-STS
//! policies against the probed hosts, and aggregates the results:
//! - [`DomainChecker`] checks one domain, consulting a hostname scan cache
//! - [`BatchScanPipeline`] runs the checker over a CSV list with a worker pool
//! - [`Validator`] re-checks known domains on a schedule and reports regressions
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use starttls_check::initialization::init_domain_checker;
//! use starttls_check::{Config, ProcessingStats};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let checker = init_domain_checker(&config, Arc::new(ProcessingStats::new())).await?;
//! let result = checker.check_domain("example.com", None).await;
//! println!("{}: {}", result.domain(), result.status());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

#![warn(missing_docs)]

mod app;
pub mod cache;
pub mod config;
pub mod dns;
pub mod domain;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod mta_sts;
pub mod policy_list;
mod run;
pub mod scan;
pub mod smtp;
mod storage;
pub mod tls;
pub mod validator;

// Re-export public API
pub use config::{Cli, Command, Config, LogFormat, LogLevel, OutputFormat};
pub use domain::DomainChecker;
pub use error_handling::{ProcessingStats, ScanError, StoreError};
pub use models::{CheckResult, DomainResult, HostnameResult, MtaStsResult, Status};
pub use run::{run_batch_scan, run_checks, run_validation, ScanOptions};
pub use scan::{BatchScanPipeline, PipelineConfig, ResultHandler, ScanSummary};
pub use storage::run_migrations;
pub use validator::{Validator, ValidatorHandle};
