use crate::config::StoreConfig;
use crate::entry::{Entry, EntryMetadata, MediaKind};
use crate::error::StorageError;
use crate::locator::LocatorRegistry;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Durable `id -> (metadata, payload)` storage local to the device.
///
/// Every operation acquires its own handle and releases it before
/// returning, on success and on failure. Nothing is retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Insert or fully replace the record keyed by `metadata.id`
    async fn put(&self, metadata: &EntryMetadata, payload: Bytes) -> Result<(), StorageError>;

    /// Remove the record keyed by `id`. Missing keys are not an error.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Every stored record with a freshly minted locator, in no particular order
    async fn list_all(&self) -> Result<Vec<Entry>, StorageError>;

    /// A single stored record with a freshly minted locator
    async fn get(&self, id: &str) -> Result<Option<Entry>, StorageError>;
}

/// Row layout of the `portfolio_items` table
#[derive(Debug, FromRow)]
struct StoredRow {
    id: String,
    kind: String,
    title: String,
    description: Option<String>,
    created_at: i64,
    payload: Vec<u8>,
}

impl StoredRow {
    fn into_parts(self) -> Result<(EntryMetadata, Bytes), StorageError> {
        let kind: MediaKind = self.kind.parse().map_err(|message| StorageError::Corrupt {
            id: self.id.clone(),
            message,
        })?;

        let metadata = EntryMetadata {
            id: self.id,
            kind,
            title: self.title,
            description: self.description,
            created_at: self.created_at,
        };

        Ok((metadata, Bytes::from(self.payload)))
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StoreStats {
    pub total_entries: i64,
    pub total_bytes: i64,
}

/// SQLite-backed blob store
pub struct SqliteBlobStore {
    pool: SqlitePool,
    locators: Arc<LocatorRegistry>,
    operation_timeout: Option<Duration>,
}

impl SqliteBlobStore {
    /// Open (creating if missing) the database file and its connection pool
    pub async fn new(config: &StoreConfig, locators: Arc<LocatorRegistry>) -> Result<Self, StorageError> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout());

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout())
            .connect_with(options)
            .await?;

        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opened portfolio blob store"
        );

        Ok(Self {
            pool,
            locators,
            operation_timeout: config.operation_timeout(),
        })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        info!("Running blob store migrations");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        info!("Blob store migrations completed");
        Ok(())
    }

    /// Get storage statistics
    pub async fn stats(&self) -> Result<StoreStats, StorageError> {
        self.bounded(async {
            let stats = sqlx::query_as::<_, StoreStats>(
                r#"
                SELECT
                    COUNT(*) AS total_entries,
                    COALESCE(SUM(LENGTH(payload)), 0) AS total_bytes
                FROM portfolio_items
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

            Ok::<_, StorageError>(stats)
        })
        .await
    }

    /// Close the pool, waiting for checked-out connections to come back
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Apply the configured operation timeout. A timed-out operation is
    /// dropped, which rolls back its transaction and returns its connection.
    async fn bounded<T, F>(&self, operation: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| StorageError::Timeout(limit))?,
            None => operation.await,
        }
    }

    fn into_entry(&self, row: StoredRow) -> Result<Entry, StorageError> {
        let (metadata, payload) = row.into_parts()?;
        let locator = self.locators.open(payload);
        Ok(Entry::new(metadata, locator))
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    #[instrument(skip(self, metadata, payload), fields(id = %metadata.id, size_bytes = payload.len()))]
    async fn put(&self, metadata: &EntryMetadata, payload: Bytes) -> Result<(), StorageError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r#"
                INSERT INTO portfolio_items (
                    id, kind, title, description, created_at, payload
                ) VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    kind = excluded.kind,
                    title = excluded.title,
                    description = excluded.description,
                    created_at = excluded.created_at,
                    payload = excluded.payload
                "#,
            )
            .bind(&metadata.id)
            .bind(metadata.kind.as_str())
            .bind(&metadata.title)
            .bind(metadata.description.as_deref())
            .bind(metadata.created_at)
            .bind(payload.as_ref())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok::<_, StorageError>(())
        })
        .await?;

        debug!(id = %metadata.id, kind = %metadata.kind, "Entry stored");
        metrics::counter!("portfolio.store.bytes_written").increment(payload.len() as u64);

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let removed = self
            .bounded(async {
                let mut tx = self.pool.begin().await?;

                let result = sqlx::query("DELETE FROM portfolio_items WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok::<_, StorageError>(result.rows_affected())
            })
            .await?;

        debug!(id = %id, removed, "Entry deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Entry>, StorageError> {
        let rows = self
            .bounded(async {
                let rows = sqlx::query_as::<_, StoredRow>(
                    r#"
                    SELECT id, kind, title, description, created_at, payload
                    FROM portfolio_items
                    "#,
                )
                .fetch_all(&self.pool)
                .await?;

                Ok::<_, StorageError>(rows)
            })
            .await?;

        let mut entries = Vec::with_capacity(rows.len());

        for row in rows {
            match self.into_entry(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable stored entry");
                    metrics::counter!("portfolio.store.corrupt_records").increment(1);
                }
            }
        }

        debug!(count = entries.len(), "Listed stored entries");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<Entry>, StorageError> {
        let row = self
            .bounded(async {
                let row = sqlx::query_as::<_, StoredRow>(
                    r#"
                    SELECT id, kind, title, description, created_at, payload
                    FROM portfolio_items
                    WHERE id = ?
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

                Ok::<_, StorageError>(row)
            })
            .await?;

        row.map(|row| self.into_entry(row)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> StoredRow {
        StoredRow {
            id: "1733500000000".to_string(),
            kind: kind.to_string(),
            title: "Night drive".to_string(),
            description: None,
            created_at: 1_733_500_000_000,
            payload: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_row_into_parts() {
        let (metadata, payload) = row("video").into_parts().unwrap();

        assert_eq!(metadata.kind, MediaKind::Video);
        assert_eq!(metadata.title, "Night drive");
        assert_eq!(payload.as_ref(), &[1, 2, 3]);
    }

    #[test]
    fn test_row_with_unknown_kind_is_corrupt() {
        match row("gif").into_parts() {
            Err(StorageError::Corrupt { id, message }) => {
                assert_eq!(id, "1733500000000");
                assert!(message.contains("gif"));
            }
            other => panic!("Expected Corrupt, got {:?}", other),
        }
    }
}
