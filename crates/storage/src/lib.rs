//! Object storage collaborator for assetcat.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait over a single bucket
//! - Backends: local filesystem and S3-compatible
//! - File-level upload/download helpers returning [`ObjectKey`]s

pub mod backends;
pub mod error;
pub mod key;
pub mod traits;
pub mod transfer;

pub use backends::{filesystem::FilesystemBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use key::ObjectKey;
pub use traits::ObjectStore;
pub use transfer::{download_file, download_json, upload_json, upload_object};

use assetcat_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            bucket,
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                bucket,
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
            )
            .await?;
            Ok(Arc::new(backend))
        }
    }
}
