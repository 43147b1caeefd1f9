//! PostgreSQL-based catalog store implementation.

use crate::connect::{RetryPolicy, with_retry};
use crate::error::{CatalogError, CatalogResult};
use crate::lookup::{LookupRow, TableName, TableRows};
use crate::models::FileAssetRow;
use crate::repos::FileAssetRepo;
use crate::store::{ASSET_COLUMNS, CatalogStore, SOFT_DELETE_COLUMN, check_file_asset_columns};
use assetcat_core::config::PgSslMode;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode as SqlxPgSslMode};
use sqlx::{FromRow, PgConnection, Pool, Postgres, Transaction};
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// PostgreSQL-based catalog store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    schema: String,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        schema: &str,
        max_connections: u32,
        policy: &RetryPolicy,
    ) -> CatalogResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, schema, max_connections, policy).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        schema: &str,
        max_connections: u32,
        policy: &RetryPolicy,
    ) -> CatalogResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            schema = schema,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, schema, max_connections, policy).await
    }

    async fn connect(
        opts: PgConnectOptions,
        schema: &str,
        max_connections: u32,
        policy: &RetryPolicy,
    ) -> CatalogResult<Self> {
        if !is_plain_identifier(schema) {
            return Err(CatalogError::Config(format!(
                "postgres schema must be a plain identifier, got '{schema}'"
            )));
        }

        let opts = opts.options([("search_path", schema)]);
        let target = format!(
            "{}:{}/{}",
            opts.get_host(),
            opts.get_port(),
            opts.get_database().unwrap_or("")
        );

        let store = with_retry(policy, &target, |_| {
            let opts = opts.clone();
            let schema = schema.to_string();
            async move {
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(Duration::from_secs(10))
                    .connect_with(opts)
                    .await?;
                sqlx::query("SELECT 1").execute(&pool).await?;
                let store = Self { pool, schema };
                store.migrate().await?;
                Ok(store)
            }
        })
        .await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Schema the catalog tables live in.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Begin a transaction. Dropping it without `commit` rolls back.
    pub async fn transaction(&self) -> CatalogResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Check out a raw connection; each statement commits on its own.
    pub async fn connection(&self) -> CatalogResult<PoolConnection<Postgres>> {
        Ok(self.pool.acquire().await?)
    }

    async fn file_asset_columns(&self) -> CatalogResult<Vec<String>> {
        let columns = sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = 'file_assets'",
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn migrate(&self) -> CatalogResult<()> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema))
            .execute(&self.pool)
            .await?;

        let columns = self.file_asset_columns().await?;
        if !columns.is_empty() {
            if !columns.iter().any(|name| name == SOFT_DELETE_COLUMN) {
                tracing::info!(schema = %self.schema, "adding {SOFT_DELETE_COLUMN} column to file_assets");
                sqlx::query("ALTER TABLE file_assets ADD COLUMN IF NOT EXISTS deleted_ts TIMESTAMPTZ")
                    .execute(&self.pool)
                    .await?;
            }
            check_file_asset_columns(columns.iter().map(String::as_str))?;
        }

        // PostgreSQL doesn't allow multiple statements in a single prepared statement,
        // so we split the schema and execute each statement separately.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl<R> TableRows<R> for PostgresStore
where
    R: LookupRow + for<'r> FromRow<'r, PgRow>,
{
    async fn load_rows(&self, table: R::Table) -> CatalogResult<Vec<R>> {
        let sql = format!("SELECT * FROM {}", table.name());
        let rows = sqlx::query_as::<_, R>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

async fn insert_row(conn: &mut PgConnection, asset: &FileAssetRow) -> CatalogResult<()> {
    sqlx::query(
        r#"
        INSERT INTO file_assets (
            id, s3_uri, filename, source_url_base, source_url_path,
            source_metahash, created_ts, updated_ts, deleted_ts, replaces_asset_id
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
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
impl FileAssetRepo for PostgresStore {
    async fn count_by_metahash(&self, metahash: &str) -> CatalogResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM file_assets WHERE source_metahash = $1")
                .bind(metahash)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn find_live_by_filename(&self, filename: &str) -> CatalogResult<Vec<FileAssetRow>> {
        let rows = sqlx::query_as::<_, FileAssetRow>(&format!(
            "SELECT {ASSET_COLUMNS} FROM file_assets \
             WHERE filename = $1 AND deleted_ts IS NULL ORDER BY created_ts"
        ))
        .bind(filename)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_assets_by_filename(&self, filename: &str) -> CatalogResult<Vec<FileAssetRow>> {
        let rows = sqlx::query_as::<_, FileAssetRow>(&format!(
            "SELECT {ASSET_COLUMNS} FROM file_assets WHERE filename = $1 ORDER BY created_ts"
        ))
        .bind(filename)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_asset(&self, id: Uuid) -> CatalogResult<Option<FileAssetRow>> {
        let row = sqlx::query_as::<_, FileAssetRow>(&format!(
            "SELECT {ASSET_COLUMNS} FROM file_assets WHERE id = $1"
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

    async fn replace_asset(&self, previous_id: Uuid, asset: &FileAssetRow) -> CatalogResult<()> {
        let mut tx = self.transaction().await?;

        let superseded = sqlx::query(
            "UPDATE file_assets SET deleted_ts = $1, updated_ts = $1 \
             WHERE id = $2 AND deleted_ts IS NULL",
        )
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
            "UPDATE file_assets SET deleted_ts = $1, updated_ts = $1 \
             WHERE filename = $2 AND deleted_ts IS NULL",
        )
        .bind(deleted_at)
        .bind(filename)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_live_filenames(&self) -> CatalogResult<Vec<String>> {
        let names = sqlx::query_scalar(
            "SELECT DISTINCT filename FROM file_assets WHERE deleted_ts IS NULL ORDER BY filename",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}
