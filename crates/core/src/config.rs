//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog database configuration.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// Connection retry behaviour for the catalog database.
    #[serde(default)]
    pub connect: ConnectRetryConfig,
    /// Object storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Where catalogued assets live, used to build `s3_uri`.
    #[serde(default)]
    pub assets: AssetLocation,
    /// Key columns for the campaign/feed lookup caches.
    #[serde(default)]
    pub lookups: LookupConfig,
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.metadata.validate()?;
        self.connect.validate()?;
        self.storage.validate()?;
        self.assets.validate()?;
        self.lookups.validate()
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Catalog database configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (tests and single-host deployments).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL. Takes precedence over individual fields.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: u16,
        /// Database name.
        database: Option<String>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer ASSETCAT_METADATA__PASSWORD over storing it in the config file.
        password: Option<String>,
        /// Schema holding the catalog tables.
        #[serde(default = "default_pg_schema")]
        schema: String,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

fn default_pg_port() -> u16 {
    5432
}

fn default_pg_schema() -> String {
    "public".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/catalog.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                schema,
                ..
            } => {
                if schema.trim().is_empty() {
                    return Err("postgres schema must not be empty".to_string());
                }
                match (url.as_ref(), host.as_ref(), database.as_ref()) {
                    (Some(_), _, _) => Ok(()),
                    (None, Some(_), Some(_)) => Ok(()),
                    (None, None, _) => Err(
                        "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                    ),
                    (None, Some(_), None) => Err(
                        "postgres config requires 'database' when using individual fields"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Bounded retry applied while establishing the catalog connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectRetryConfig {
    /// Total connection attempts before giving up (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Pause between attempts in milliseconds (default: 1000).
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ConnectRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl ConnectRetryConfig {
    /// Pause between attempts.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("connect.max_attempts must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage, one directory per bucket.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the ambient credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (required for MinIO).
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/storage"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.trim().is_empty() {
                    return Err("s3 config requires a non-empty bucket".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
            StorageConfig::Filesystem { .. } => Ok(()),
        }
    }
}

/// Bucket and folder under which catalogued files are stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetLocation {
    /// Bucket name used in `s3://<bucket>/...` URIs.
    #[serde(default = "default_asset_bucket")]
    pub bucket: String,
    /// Folder inside the bucket (no leading or trailing slash required).
    #[serde(default)]
    pub prefix: Option<String>,
}

fn default_asset_bucket() -> String {
    "assets".to_string()
}

impl Default for AssetLocation {
    fn default() -> Self {
        Self {
            bucket: default_asset_bucket(),
            prefix: None,
        }
    }
}

impl AssetLocation {
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err("assets.bucket must not be empty".to_string());
        }
        Ok(())
    }

    /// Normalized folder, or `None` when the prefix is absent or blank.
    pub fn folder(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// Object key for a file name under this location.
    pub fn key_for(&self, object_name: &str) -> String {
        match self.folder() {
            Some(folder) => format!("{folder}/{object_name}"),
            None => object_name.to_string(),
        }
    }

    /// `s3://` URI for an object key in this location's bucket.
    pub fn uri_for_key(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key.trim_start_matches('/'))
    }
}

/// Key columns for the campaign and feed lookup caches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_campaign_key_columns")]
    pub campaign_key_columns: Vec<String>,
    #[serde(default = "default_feed_key_columns")]
    pub feed_key_columns: Vec<String>,
}

fn default_campaign_key_columns() -> Vec<String> {
    vec!["campaign_id".to_string()]
}

fn default_feed_key_columns() -> Vec<String> {
    vec!["feed_id".to_string()]
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            campaign_key_columns: default_campaign_key_columns(),
            feed_key_columns: default_feed_key_columns(),
        }
    }
}

impl LookupConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.campaign_key_columns.is_empty() || self.feed_key_columns.is_empty() {
            return Err("lookup key column lists must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Figment;
    use figment::providers::{Format, Toml};

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.connect.max_attempts, 3);
        assert_eq!(config.connect.delay(), Duration::from_secs(1));
        assert!(matches!(config.metadata, MetadataConfig::Sqlite { .. }));
    }

    #[test]
    fn test_postgres_requires_url_or_host_and_database() {
        let config = MetadataConfig::Postgres {
            url: None,
            host: Some("db".to_string()),
            port: 5432,
            database: None,
            username: None,
            password: None,
            schema: "public".to_string(),
            ssl_mode: None,
            max_connections: 5,
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("'database'"));
    }

    #[test]
    fn test_storage_config_rejects_partial_credentials() {
        let config = StorageConfig::S3 {
            bucket: "bucket".to_string(),
            endpoint: None,
            region: None,
            prefix: None,
            access_key_id: Some("key".to_string()),
            secret_access_key: None,
            force_path_style: false,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_asset_location_builds_uris() {
        let location = AssetLocation {
            bucket: "landing".to_string(),
            prefix: Some("/feeds/2024/".to_string()),
        };
        assert_eq!(location.key_for("a.csv"), "feeds/2024/a.csv");
        assert_eq!(
            location.uri_for_key(&location.key_for("a.csv")),
            "s3://landing/feeds/2024/a.csv"
        );

        let bare = AssetLocation {
            bucket: "landing".to_string(),
            prefix: Some("  ".to_string()),
        };
        assert_eq!(bare.uri_for_key(&bare.key_for("b.csv")), "s3://landing/b.csv");
    }

    #[test]
    fn test_toml_postgres_section_fills_defaults() {
        let config: AppConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [metadata]
                type = "postgres"
                host = "db.internal"
                database = "catalog"

                [connect]
                delay_ms = 10

                [assets]
                bucket = "landing"
                "#,
            ))
            .extract()
            .unwrap();

        match &config.metadata {
            MetadataConfig::Postgres {
                port,
                schema,
                max_connections,
                ..
            } => {
                assert_eq!(*port, 5432);
                assert_eq!(schema, "public");
                assert_eq!(*max_connections, 5);
            }
            other => panic!("unexpected metadata config: {other:?}"),
        }
        assert_eq!(config.connect.max_attempts, 3);
        assert_eq!(config.connect.delay_ms, 10);
        assert_eq!(config.assets.bucket, "landing");
        config.validate().unwrap();
    }
}
