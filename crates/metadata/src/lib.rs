//! Catalog store abstraction and implementations for assetcat.
//!
//! This crate provides the catalog data plane:
//! - Connection management with bounded retry
//! - The `file_assets` table with soft deletion
//! - Dedup filtering and the asset writer
//! - In-memory lookup caches for campaigns, feeds, and OLAP dimensions

pub mod connect;
pub mod dedup;
pub mod dimensions;
pub mod error;
pub mod feeds;
pub mod lookup;
pub mod models;
pub mod pipeline;
pub mod postgres;
pub mod repos;
pub mod store;
pub mod writer;

pub use connect::{RetryPolicy, with_retry};
pub use dedup::{DedupFilter, DedupOutcome, Inconsistency, Novelty};
pub use dimensions::{DimensionIds, DimensionService};
pub use error::{CatalogError, CatalogResult};
pub use feeds::{FeedFilter, RecordSource};
pub use lookup::{LookupCache, LookupRow, TableName, TableRows};
pub use pipeline::{BatchReport, IngestPipeline};
pub use postgres::PostgresStore;
pub use repos::FileAssetRepo;
pub use store::{CatalogStore, SqliteStore};
pub use writer::AssetWriter;

use assetcat_core::config::{ConnectRetryConfig, MetadataConfig};
use std::sync::Arc;

/// Create a catalog store from configuration.
pub async fn from_config(
    config: &MetadataConfig,
    retry: &ConnectRetryConfig,
) -> CatalogResult<Arc<dyn CatalogStore>> {
    let policy = RetryPolicy::from(retry);
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::connect(path, &policy).await?;
            Ok(Arc::new(store) as Arc<dyn CatalogStore>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            database,
            username,
            password,
            schema,
            ssl_mode,
            max_connections,
        } => {
            let store = if let Some(url) = url {
                // URL takes precedence over individual fields
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, schema, *max_connections, &policy).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    *port,
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    schema,
                    *max_connections,
                    &policy,
                )
                .await?
            } else {
                return Err(CatalogError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn CatalogStore>)
        }
    }
}
