//! DNS resolver initialization.
//!
//! This module provides functions to initialize the DNS resolver with proper
//! timeout configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{DNS_ATTEMPTS, DNS_TIMEOUT_SECS};
use crate::dns::{DnsResolver, HickoryResolver};
use crate::error_handling::InitializationError;
use hickory_resolver::TokioAsyncResolver;

/// Initializes the DNS resolver used for MX and TXT lookups.
///
/// Creates a resolver from the system configuration when it can be read,
/// falling back to the hickory defaults otherwise. Timeouts are short so a
/// slow nameserver cannot stall a domain check.
///
/// # Errors
///
/// Returns `InitializationError::DnsResolverError` if neither configuration
/// can be loaded.
pub fn init_resolver() -> Result<Arc<dyn DnsResolver>, InitializationError> {
    use hickory_resolver::config::{ResolverConfig, ResolverOpts};

    let (config, mut opts) = match hickory_resolver::system_conf::read_system_conf() {
        Ok(system) => system,
        Err(e) => {
            log::debug!("Using default resolver configuration: {}", e);
            (ResolverConfig::default(), ResolverOpts::default())
        }
    };
    opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
    opts.attempts = DNS_ATTEMPTS;
    // Names are always fully qualified; never append search domains.
    opts.ndots = 0;

    if config.name_servers().is_empty() {
        return Err(InitializationError::DnsResolverError(
            "no nameservers configured".to_string(),
        ));
    }

    let resolver = TokioAsyncResolver::tokio(config, opts);
    Ok(Arc::new(HickoryResolver::new(Arc::new(resolver))))
}
