//! SQLite-backed scan store.
//!
//! One row per hostname in `hostname_scans`; the full [`HostnameResult`] is
//! kept as JSON so the schema does not follow every check added later.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::ScanStore;
use crate::error_handling::StoreError;
use crate::models::HostnameResult;
use crate::storage::{init_db_pool_with_path, run_migrations};

/// Durable [`ScanStore`] on a SQLite database in WAL mode.
#[derive(Clone)]
pub struct SqliteScanStore {
    pool: SqlitePool,
}

impl SqliteScanStore {
    /// Opens (creating if needed) the database at `path` and applies migrations.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = init_db_pool_with_path(path).await?;
        Self::from_pool(pool).await
    }

    /// Uses an existing pool, applying migrations first.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        run_migrations(&pool).await?;
        Ok(SqliteScanStore { pool })
    }

    /// Removes entries scanned before `cutoff_ms` (Unix milliseconds).
    pub async fn prune_older_than(&self, cutoff_ms: i64) -> Result<u64, StoreError> {
        let done = sqlx::query("DELETE FROM hostname_scans WHERE scanned_at_ms < ?")
            .bind(cutoff_ms)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl ScanStore for SqliteScanStore {
    async fn get_hostname_scan(
        &self,
        hostname: &str,
    ) -> Result<Option<HostnameResult>, StoreError> {
        let row = sqlx::query("SELECT result FROM hostname_scans WHERE hostname = ?")
            .bind(hostname)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let json: String = row.try_get("result")?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn put_hostname_scan(
        &self,
        hostname: &str,
        result: &HostnameResult,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(result)?;
        sqlx::query(
            "INSERT INTO hostname_scans (hostname, scanned_at_ms, result)
             VALUES (?, ?, ?)
             ON CONFLICT(hostname) DO UPDATE SET
                scanned_at_ms = excluded.scanned_at_ms,
                result = excluded.result",
        )
        .bind(hostname)
        .bind(result.timestamp().timestamp_millis())
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
