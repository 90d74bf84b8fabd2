//! Hostname scan cache.
//!
//! Probing a mail server costs a TCP connection, an SMTP dialogue and a TLS
//! handshake, and large providers serve MX for thousands of domains. The
//! cache lets a batch probe each hostname once per expiry window:
//! - [`ScanStore`]: the storage seam (get/put by hostname)
//! - [`ScanCache`]: wraps any store and drops entries older than the expiry
//! - [`MemoryScanStore`]: in-process map, the default backing store
//! - [`SqliteScanStore`]: durable store shared between runs

mod memory;
mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error_handling::StoreError;
use crate::models::HostnameResult;

pub use memory::MemoryScanStore;
pub use sqlite::SqliteScanStore;

/// Persistence for hostname probe results, keyed by MX hostname.
#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Returns the stored result for `hostname`, if any.
    async fn get_hostname_scan(&self, hostname: &str)
        -> Result<Option<HostnameResult>, StoreError>;

    /// Stores `result` under `hostname`, replacing any previous entry.
    async fn put_hostname_scan(
        &self,
        hostname: &str,
        result: &HostnameResult,
    ) -> Result<(), StoreError>;
}

/// A [`ScanStore`] that only returns results younger than `expiry`.
///
/// Writes go straight to the backing store. Stale entries are left in place
/// and overwritten by the next probe of the same hostname.
pub struct ScanCache {
    store: Arc<dyn ScanStore>,
    expiry: Duration,
}

impl ScanCache {
    /// Wraps `store`, treating entries older than `expiry` as misses.
    pub fn new(store: Arc<dyn ScanStore>, expiry: Duration) -> Self {
        ScanCache { store, expiry }
    }

    /// Configured freshness window.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    fn is_fresh(&self, result: &HostnameResult) -> bool {
        // An expiry too large for chrono never expires anything.
        let Ok(expiry) = chrono::Duration::from_std(self.expiry) else {
            return true;
        };
        Utc::now().signed_duration_since(result.timestamp()) <= expiry
    }
}

#[async_trait]
impl ScanStore for ScanCache {
    async fn get_hostname_scan(
        &self,
        hostname: &str,
    ) -> Result<Option<HostnameResult>, StoreError> {
        let cached = self.store.get_hostname_scan(hostname).await?;
        Ok(cached.filter(|result| {
            let fresh = self.is_fresh(result);
            if !fresh {
                log::debug!(
                    "Cached scan of {hostname} from {} is stale",
                    result.timestamp()
                );
            }
            fresh
        }))
    }

    async fn put_hostname_scan(
        &self,
        hostname: &str,
        result: &HostnameResult,
    ) -> Result<(), StoreError> {
        self.store.put_hostname_scan(hostname, result).await
    }
}
