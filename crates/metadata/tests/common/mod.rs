//! Shared catalog test utilities.

#![allow(dead_code)]

use assetcat_metadata::{CatalogError, CatalogResult, CatalogStore, PostgresStore, RetryPolicy, SqliteStore};
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres as SqlxPostgres, Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

/// Stable prefix for Docker/container startup failures in Postgres test setup.
/// Tests use this marker to decide whether to skip due to unavailable Docker.
pub const POSTGRES_CONTAINER_START_ERR_PREFIX: &str = "postgres-container-start:";

/// A temp-dir SQLite catalog that cleans up on drop.
pub struct TestCatalog {
    pub store: Arc<dyn CatalogStore>,
    sqlite_store: Arc<SqliteStore>,
    temp_dir: TempDir,
}

impl TestCatalog {
    pub async fn new() -> CatalogResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("catalog.db");
        let store = Arc::new(SqliteStore::new(&db_path).await?);

        Ok(Self {
            store: store.clone(),
            sqlite_store: store,
            temp_dir,
        })
    }

    pub fn store(&self) -> Arc<dyn CatalogStore> {
        self.store.clone()
    }

    /// Raw pool for seeding lookup tables.
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite_store.pool()
    }

    pub fn sqlite(&self) -> &SqliteStore {
        &self.sqlite_store
    }

    pub fn dir(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}

/// PostgreSQL catalog backed by a testcontainer.
pub struct PostgresTestCatalog {
    pub store: Arc<dyn CatalogStore>,
    postgres_store: Arc<PostgresStore>,
    _container: ContainerAsync<Postgres>,
}

impl PostgresTestCatalog {
    pub async fn new() -> CatalogResult<Self> {
        Self::with_schema("public").await
    }

    pub async fn with_schema(schema: &str) -> CatalogResult<Self> {
        let container = Postgres::default()
            .with_tag("15-alpine")
            .start()
            .await
            .map_err(|e| {
                CatalogError::Internal(format!(
                    "{} Failed to start PostgreSQL container: {e}",
                    POSTGRES_CONTAINER_START_ERR_PREFIX
                ))
            })?;

        let host = container.get_host().await.expect("Failed to get host");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get port");

        // Default credentials from testcontainers-modules postgres
        let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
        let policy = RetryPolicy::new(5, Duration::from_millis(500));

        let store = Arc::new(PostgresStore::from_url(&url, schema, 5, &policy).await?);

        Ok(Self {
            store: store.clone(),
            postgres_store: store,
            _container: container,
        })
    }

    pub fn store(&self) -> Arc<dyn CatalogStore> {
        self.store.clone()
    }

    pub fn pool(&self) -> &Pool<SqlxPostgres> {
        self.postgres_store.pool()
    }
}

/// Start a Postgres catalog, or `None` when Docker is unavailable or
/// `SKIP_POSTGRES_TESTS` is set.
pub async fn postgres_or_skip(schema: &str) -> Option<PostgresTestCatalog> {
    if std::env::var("SKIP_POSTGRES_TESTS").is_ok() {
        eprintln!("Skipping PostgreSQL catalog tests: SKIP_POSTGRES_TESTS is set");
        return None;
    }
    match PostgresTestCatalog::with_schema(schema).await {
        Ok(catalog) => Some(catalog),
        Err(err) if err.to_string().contains(POSTGRES_CONTAINER_START_ERR_PREFIX) => {
            eprintln!("Skipping PostgreSQL catalog tests: {err}");
            None
        }
        Err(err) => panic!("Failed to set up PostgreSQL catalog: {err}"),
    }
}

/// Run a test against both SQLite and PostgreSQL backends.
pub async fn run_catalog_test_both<F, Fut>(test_fn: F)
where
    F: Fn(Arc<dyn CatalogStore>) -> Fut + Clone,
    Fut: std::future::Future<Output = ()>,
{
    let sqlite = TestCatalog::new()
        .await
        .expect("Failed to create SQLite test catalog");
    test_fn.clone()(sqlite.store()).await;

    if let Some(postgres) = postgres_or_skip("public").await {
        test_fn(postgres.store()).await;
    }
}

/// Hex SHA-256 of `content`, used as a fixture metahash.
pub fn metahash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// One manifest JSON line for `local_file` whose content is `content`.
pub fn manifest_line(local_file: &str, content: &str) -> String {
    serde_json::json!({
        "local_file": local_file,
        "base_url": "https://feeds.example.com",
        "srcfile": format!("/exports/{}", local_file.rsplit('/').next().unwrap_or(local_file)),
        "metahash": metahash(content),
        "record_count": 3,
    })
    .to_string()
}

/// A deletion-mode line.
pub fn deletion_line(filename: &str) -> String {
    serde_json::json!({ "deleted_filename": filename }).to_string()
}
