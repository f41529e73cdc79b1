//! SQLite store implementation
//!
//! Persists the registry and the catalog in a local database file so both
//! survive restarts.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Scheduler reads do not block registration writes
//! - **Migrations**: Schema versioning with sqlx (`migrations/`)
//!
//! Catalog entries are one row each, so an application's entry disappears
//! together with its last metric row.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument};

use super::backend::{CatalogStore, RegistryStore};
use super::error::{StorageError, StorageResult};
use crate::{ApplicationId, MetricName};

pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run migrations
    ///
    /// ```no_run
    /// # use metrics_relay::storage::sqlite::SqliteStore;
    /// # async fn example() -> anyhow::Result<()> {
    /// let store = SqliteStore::new("./relay.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path);

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    fn metric_from_row(row: &sqlx::sqlite::SqliteRow) -> StorageResult<MetricName> {
        let raw: String = row.try_get("metric_name")?;
        MetricName::parse(&raw).map_err(|e| StorageError::CorruptValue(e.to_string()))
    }

    fn application_from_row(row: &sqlx::sqlite::SqliteRow) -> StorageResult<ApplicationId> {
        let raw: String = row.try_get("application_id")?;
        ApplicationId::parse(&raw).map_err(|e| StorageError::CorruptValue(e.to_string()))
    }
}

#[async_trait]
impl RegistryStore for SqliteStore {
    async fn contains(&self, app: &ApplicationId) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM applications WHERE application_id = ?")
            .bind(app.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert(&self, app: &ApplicationId) -> StorageResult<bool> {
        let result = sqlx::query(
            "INSERT INTO applications (application_id, registered_at) VALUES (?, ?)
             ON CONFLICT (application_id) DO NOTHING",
        )
        .bind(app.as_str())
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, app: &ApplicationId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE application_id = ?")
            .bind(app.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> StorageResult<Vec<ApplicationId>> {
        let rows = sqlx::query("SELECT application_id FROM applications ORDER BY seq")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::application_from_row).collect()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn append(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<()> {
        sqlx::query("INSERT INTO catalog_entries (application_id, metric_name) VALUES (?, ?)")
            .bind(app.as_str())
            .bind(name.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, names), fields(app = %app, count = names.len()))]
    async fn extend(&self, app: &ApplicationId, names: &[MetricName]) -> StorageResult<()> {
        if names.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for name in names {
            sqlx::query("INSERT INTO catalog_entries (application_id, metric_name) VALUES (?, ?)")
                .bind(app.as_str())
                .bind(name.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, app: &ApplicationId) -> StorageResult<Option<Vec<MetricName>>> {
        let rows = sqlx::query(
            "SELECT metric_name FROM catalog_entries WHERE application_id = ? ORDER BY id",
        )
        .bind(app.as_str())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }
        rows.iter()
            .map(Self::metric_from_row)
            .collect::<StorageResult<Vec<_>>>()
            .map(Some)
    }

    async fn remove_one(&self, app: &ApplicationId, name: &MetricName) -> StorageResult<bool> {
        let result = sqlx::query(
            "DELETE FROM catalog_entries WHERE id = (
                SELECT id FROM catalog_entries
                WHERE application_id = ? AND metric_name = ?
                ORDER BY id LIMIT 1
            )",
        )
        .bind(app.as_str())
        .bind(name.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_application(
        &self,
        app: &ApplicationId,
    ) -> StorageResult<Option<Vec<MetricName>>> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            "SELECT metric_name FROM catalog_entries WHERE application_id = ? ORDER BY id",
        )
        .bind(app.as_str())
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM catalog_entries WHERE application_id = ?")
            .bind(app.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if rows.is_empty() {
            return Ok(None);
        }
        rows.iter()
            .map(Self::metric_from_row)
            .collect::<StorageResult<Vec<_>>>()
            .map(Some)
    }

    async fn exists(&self, app: &ApplicationId) -> StorageResult<bool> {
        let row = sqlx::query("SELECT 1 FROM catalog_entries WHERE application_id = ? LIMIT 1")
            .bind(app.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn clear(&self) -> StorageResult<()> {
        sqlx::query("DELETE FROM catalog_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn application_count(&self) -> StorageResult<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT application_id) FROM catalog_entries")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }

    async fn metric_count(&self) -> StorageResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn snapshot(&self) -> StorageResult<BTreeMap<ApplicationId, Vec<MetricName>>> {
        let rows = sqlx::query(
            "SELECT application_id, metric_name FROM catalog_entries ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut catalogs: BTreeMap<ApplicationId, Vec<MetricName>> = BTreeMap::new();
        for row in &rows {
            catalogs
                .entry(Self::application_from_row(row)?)
                .or_default()
                .push(Self::metric_from_row(row)?);
        }
        Ok(catalogs)
    }
}
