use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::ScanStore;
use crate::error_handling::StoreError;
use crate::models::HostnameResult;

/// In-memory [`ScanStore`]. Writes never fail.
#[derive(Default)]
pub struct MemoryScanStore {
    scans: RwLock<HashMap<String, HostnameResult>>,
}

impl MemoryScanStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored hostnames.
    pub async fn len(&self) -> usize {
        self.scans.read().await.len()
    }

    /// Whether nothing has been stored yet.
    pub async fn is_empty(&self) -> bool {
        self.scans.read().await.is_empty()
    }
}

#[async_trait]
impl ScanStore for MemoryScanStore {
    async fn get_hostname_scan(
        &self,
        hostname: &str,
    ) -> Result<Option<HostnameResult>, StoreError> {
        Ok(self.scans.read().await.get(hostname).cloned())
    }

    async fn put_hostname_scan(
        &self,
        hostname: &str,
        result: &HostnameResult,
    ) -> Result<(), StoreError> {
        self.scans
            .write()
            .await
            .insert(hostname.to_string(), result.clone());
        Ok(())
    }
}
