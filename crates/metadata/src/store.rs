//! Catalog store trait and the SQLite implementation.

use crate::connect::{RetryPolicy, with_retry};
use crate::error::{CatalogError, CatalogResult};
use crate::lookup::{LookupRow, TableName, TableRows};
use crate::models::{CampaignRow, DimensionRow, FeedRow, FileAssetRow};
use crate::repos::FileAssetRepo;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Pool, Sqlite, Transaction};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined catalog store trait.
#[async_trait]
pub trait CatalogStore:
    FileAssetRepo
    + TableRows<FileAssetRow>
    + TableRows<CampaignRow>
    + TableRows<FeedRow>
    + TableRows<DimensionRow>
    + Send
    + Sync
{
    /// Create missing tables and bring `file_assets` up to the current shape.
    async fn migrate(&self) -> CatalogResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> CatalogResult<()>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Column list used by every `file_assets` SELECT.
pub(crate) const ASSET_COLUMNS: &str = "id, s3_uri, filename, source_url_base, source_url_path, \
     source_metahash, created_ts, updated_ts, deleted_ts, replaces_asset_id";

/// Column that older catalogs lack and that is added in place.
pub(crate) const SOFT_DELETE_COLUMN: &str = "deleted_ts";

/// Fail if an existing `file_assets` table is missing anything other than
/// the soft-delete column, which the caller adds itself.
pub(crate) fn check_file_asset_columns<'a>(
    present: impl IntoIterator<Item = &'a str>,
) -> CatalogResult<()> {
    let present: HashSet<&str> = present.into_iter().collect();
    let missing: Vec<&str> = FileAssetRow::COLUMNS
        .iter()
        .copied()
        .filter(|column| *column != SOFT_DELETE_COLUMN && !present.contains(column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Config(format!(
            "Incompatible catalog schema: file_assets is missing columns: {}. \
             Only {SOFT_DELETE_COLUMN} can be added automatically.",
            missing.join(", ")
        )))
    }
}

/// SQLite-based catalog store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if needed) a SQLite catalog with the default retry policy.
    pub async fn new(path: impl AsRef<Path>) -> CatalogResult<Self> {
        Self::connect(path, &RetryPolicy::default()).await
    }

    /// Open a SQLite catalog, retrying the initial connection per `policy`.
    pub async fn connect(path: impl AsRef<Path>, policy: &RetryPolicy) -> CatalogResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let target = path.display().to_string();
        // Schema reflection is part of each attempt.
        let store = with_retry(policy, &target, |_| {
            let opts = opts.clone();
            async move {
                // One connection: SQLite serializes writers anyway.
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(opts)
                    .await?;
                sqlx::query("SELECT 1").execute(&pool).await?;
                let store = Self { pool };
                store.migrate().await?;
                Ok(store)
            }
        })
        .await?;

        tracing::info!(path = %path.display(), "opened SQLite catalog");
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Begin a transaction. Dropping it without `commit` rolls back.
    pub async fn transaction(&self) -> CatalogResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Check out a raw connection; each statement commits on its own.
    pub async fn connection(&self) -> CatalogResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    async fn file_asset_columns(&self) -> CatalogResult<Vec<String>> {
        let columns: Vec<(i32, String, String, i32, Option<String>, i32)> =
            sqlx::query_as("PRAGMA table_info(file_assets)")
                .fetch_all(&self.pool)
                .await?;
        Ok(columns.into_iter().map(|(_, name, ..)| name).collect())
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn migrate(&self) -> CatalogResult<()> {
        let table_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='file_assets')",
        )
        .fetch_one(&self.pool)
        .await?;

        if table_exists {
            let columns = self.file_asset_columns().await?;

            // SQLite has no ADD COLUMN IF NOT EXISTS, so check first.
            if !columns.iter().any(|name| name == SOFT_DELETE_COLUMN) {
                tracing::info!("adding {SOFT_DELETE_COLUMN} column to file_assets");
                sqlx::query("ALTER TABLE file_assets ADD COLUMN deleted_ts TEXT")
                    .execute(&self.pool)
                    .await?;
            }

            check_file_asset_columns(columns.iter().map(String::as_str))?;
        }

        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;

        Ok(())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[async_trait]
impl<R> TableRows<R> for SqliteStore
where
    R: LookupRow + for<'r> FromRow<'r, SqliteRow>,
{
    async fn load_rows(&self, table: R::Table) -> CatalogResult<Vec<R>> {
        let sql = format!("SELECT * FROM {}", table.name());
        let rows = sqlx::query_as::<_, R>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

mod sqlite_impl {
    use super::*;
    use sqlx::SqliteConnection;
    use time::OffsetDateTime;
    use uuid::Uuid;

    async fn insert_row(conn: &mut SqliteConnection, asset: &FileAssetRow) -> CatalogResult<()> {
        sqlx::query(
            r#"
            INSERT INTO file_assets (
                id, s3_uri, filename, source_url_base, source_url_path,
                source_metahash, created_ts, updated_ts, deleted_ts, replaces_asset_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id)
        .bind(&asset.s3_uri)
        .bind(&asset.filename)
        .bind(&asset.source_url_base)
        .bind(&asset.source_url_path)
        .bind(&asset.source_metahash)
        .bind(asset.created_ts)
        .bind(asset.updated_ts)
        .bind(asset.deleted_ts)
        .bind(asset.replaces_asset_id)
        .execute(conn)
        .await?;
        Ok(())
    }

    #[async_trait]
    impl FileAssetRepo for SqliteStore {
        async fn count_by_metahash(&self, metahash: &str) -> CatalogResult<u64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM file_assets WHERE source_metahash = ?")
                    .bind(metahash)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count as u64)
        }

        async fn find_live_by_filename(&self, filename: &str) -> CatalogResult<Vec<FileAssetRow>> {
            let rows = sqlx::query_as::<_, FileAssetRow>(&format!(
                "SELECT {ASSET_COLUMNS} FROM file_assets \
                 WHERE filename = ? AND deleted_ts IS NULL ORDER BY created_ts"
            ))
            .bind(filename)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn list_assets_by_filename(
            &self,
            filename: &str,
        ) -> CatalogResult<Vec<FileAssetRow>> {
            let rows = sqlx::query_as::<_, FileAssetRow>(&format!(
                "SELECT {ASSET_COLUMNS} FROM file_assets WHERE filename = ? ORDER BY created_ts"
            ))
            .bind(filename)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn get_asset(&self, id: Uuid) -> CatalogResult<Option<FileAssetRow>> {
            let row = sqlx::query_as::<_, FileAssetRow>(&format!(
                "SELECT {ASSET_COLUMNS} FROM file_assets WHERE id = ?"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn insert_asset(&self, asset: &FileAssetRow) -> CatalogResult<()> {
            let mut tx = self.transaction().await?;
            insert_row(&mut *tx, asset).await?;
            tx.commit().await?;
            Ok(())
        }

        async fn replace_asset(
            &self,
            previous_id: Uuid,
            asset: &FileAssetRow,
        ) -> CatalogResult<()> {
            let mut tx = self.transaction().await?;

            let superseded = sqlx::query(
                "UPDATE file_assets SET deleted_ts = ?, updated_ts = ? \
                 WHERE id = ? AND deleted_ts IS NULL",
            )
            .bind(asset.created_ts)
            .bind(asset.created_ts)
            .bind(previous_id)
            .execute(&mut *tx)
            .await?;

            if superseded.rows_affected() == 0 {
                return Err(CatalogError::Conflict(format!(
                    "asset {previous_id} for {} is no longer live",
                    asset.filename
                )));
            }

            insert_row(&mut *tx, asset).await?;
            tx.commit().await?;
            Ok(())
        }

        async fn soft_delete_by_filename(
            &self,
            filename: &str,
            deleted_at: OffsetDateTime,
        ) -> CatalogResult<u64> {
            let mut conn = self.connection().await?;
            let result = sqlx::query(
                "UPDATE file_assets SET deleted_ts = ?, updated_ts = ? \
                 WHERE filename = ? AND deleted_ts IS NULL",
            )
            .bind(deleted_at)
            .bind(deleted_at)
            .bind(filename)
            .execute(&mut *conn)
            .await?;
            Ok(result.rows_affected())
        }

        async fn list_live_filenames(&self) -> CatalogResult<Vec<String>> {
            let names = sqlx::query_scalar(
                "SELECT DISTINCT filename FROM file_assets \
                 WHERE deleted_ts IS NULL ORDER BY filename",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(names)
        }
    }
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS file_assets (
    id BLOB PRIMARY KEY,
    s3_uri TEXT NOT NULL,
    filename TEXT NOT NULL,
    source_url_base TEXT NOT NULL,
    source_url_path TEXT NOT NULL,
    source_metahash TEXT NOT NULL,
    created_ts TEXT NOT NULL,
    updated_ts TEXT,
    deleted_ts TEXT,
    replaces_asset_id BLOB
);

CREATE INDEX IF NOT EXISTS idx_file_assets_filename ON file_assets(filename);
CREATE INDEX IF NOT EXISTS idx_file_assets_metahash ON file_assets(source_metahash);

CREATE TABLE IF NOT EXISTS impact_campaigns (
    campaign_id TEXT PRIMARY KEY,
    campaign_name TEXT
);

CREATE TABLE IF NOT EXISTS partnerize_feeds (
    feed_id TEXT PRIMARY KEY,
    feed_name TEXT
);

CREATE TABLE IF NOT EXISTS dim_time_second (
    id INTEGER PRIMARY KEY,
    value INTEGER NOT NULL,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_time_minute (
    id INTEGER PRIMARY KEY,
    value INTEGER NOT NULL,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_time_hour (
    id INTEGER PRIMARY KEY,
    value INTEGER NOT NULL,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_date_day (
    id INTEGER PRIMARY KEY,
    value INTEGER NOT NULL,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_date_month (
    id INTEGER PRIMARY KEY,
    value INTEGER NOT NULL,
    label TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dim_date_year (
    id INTEGER PRIMARY KEY,
    value INTEGER NOT NULL,
    label TEXT NOT NULL
);
"#;
