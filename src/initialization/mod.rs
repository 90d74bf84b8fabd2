//! Application initialization and resource setup.
//!
//! This module provides functions to initialize all shared resources:
//! - Logger and rustls crypto provider
//! - HTTP client for MTA-STS policy fetches
//! - DNS resolver
//! - Scan cache (in-memory or SQLite backed)
//! - The fully wired [`DomainChecker`]
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;
mod resolver;

use std::sync::Arc;

use rustls::crypto::{ring::default_provider, CryptoProvider};

use crate::cache::{MemoryScanStore, ScanCache, ScanStore, SqliteScanStore};
use crate::config::Config;
use crate::domain::DomainChecker;
use crate::error_handling::{InitializationError, ProcessingStats};
use crate::mta_sts::MtaStsChecker;
use crate::smtp::HostnameChecker;

// Re-export public API
pub use client::init_policy_client;
pub use logger::init_logger_with;
pub use resolver::init_resolver;

/// Initializes the crypto provider for TLS operations.
///
/// Installs the `ring` provider as the process default for `rustls`. Probe
/// configurations name the provider explicitly, so this only matters for
/// libraries that rely on the process default (reqwest).
pub fn init_crypto_provider() {
    // The return value is ignored because reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(default_provider());
}

/// Opens the scan cache described by `config`.
///
/// With `cache_db_path` set, hostname scans persist in SQLite across runs;
/// otherwise they live in memory for the lifetime of the process. Either way
/// the store is wrapped in a [`ScanCache`] enforcing `cache_expiry_seconds`.
///
/// # Errors
///
/// Returns `InitializationError::ScanStoreError` if the SQLite file cannot be
/// created or migrated.
pub async fn init_scan_store(config: &Config) -> Result<Arc<dyn ScanStore>, InitializationError> {
    let backing: Arc<dyn ScanStore> = match &config.cache_db_path {
        Some(path) => {
            log::info!("Using scan cache at {}", path.display());
            Arc::new(SqliteScanStore::open(path).await?)
        }
        None => Arc::new(MemoryScanStore::new()),
    };
    Ok(Arc::new(ScanCache::new(backing, config.cache_expiry())))
}

/// Builds a [`DomainChecker`] with every collaborator created from `config`.
///
/// # Errors
///
/// Returns an error if the resolver, HTTP client, TLS configuration or scan
/// cache cannot be initialized.
pub async fn init_domain_checker(
    config: &Config,
    stats: Arc<ProcessingStats>,
) -> Result<DomainChecker, InitializationError> {
    let resolver = init_resolver()?;
    let client = init_policy_client(config)?;

    let hostname_checker = HostnameChecker::new(config.timeout())?
        .with_port(config.smtp_port)
        .with_ehlo_hostname(&config.ehlo_hostname)
        .with_stats(Arc::clone(&stats));
    let mta_sts_checker = MtaStsChecker::new(client, Arc::clone(&resolver))
        .with_policy_url(&config.mta_sts_policy_url)
        .with_stats(Arc::clone(&stats));
    let cache = init_scan_store(config).await?;

    Ok(DomainChecker::new(
        resolver,
        Arc::new(hostname_checker),
        Arc::new(mta_sts_checker),
    )
    .with_cache(cache)
    .with_concurrency(config.hostname_concurrency)
    .with_stats(stats))
}
