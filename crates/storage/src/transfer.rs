//! File-level helpers on top of [`ObjectStore`].

use crate::error::{StorageError, StorageResult};
use crate::key::ObjectKey;
use crate::traits::ObjectStore;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

/// Upload a local file under `folder`, keyed by the file's base name.
pub async fn upload_object(
    store: &dyn ObjectStore,
    local_path: impl AsRef<Path>,
    folder: Option<&str>,
) -> StorageResult<ObjectKey> {
    let local_path = local_path.as_ref();
    let base_name = local_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            StorageError::InvalidKey(format!("no file name in {}", local_path.display()))
        })?;

    let key = match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("{folder}/{base_name}"),
        None => base_name.to_string(),
    };

    let data = fs::read(local_path).await?;
    store.put(&key, Bytes::from(data)).await?;
    tracing::debug!(
        backend = store.backend_name(),
        key = %key,
        local_path = %local_path.display(),
        "uploaded object"
    );
    Ok(store.object_key(&key))
}

/// Serialize `value` as JSON and store it under `key`.
pub async fn upload_json<T: Serialize + ?Sized>(
    store: &dyn ObjectStore,
    value: &T,
    key: &str,
) -> StorageResult<ObjectKey> {
    let body = serde_json::to_vec(value).map_err(|e| StorageError::InvalidJson {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.put(key, Bytes::from(body)).await?;
    Ok(store.object_key(key))
}

/// Download an object to a local path, creating parent directories.
pub async fn download_file(
    store: &dyn ObjectStore,
    key: &str,
    dest: impl AsRef<Path>,
) -> StorageResult<()> {
    let dest = dest.as_ref();
    let data = store.get(key).await?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(dest, &data).await?;
    Ok(())
}

/// Download an object and parse it as JSON.
pub async fn download_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    key: &str,
) -> StorageResult<T> {
    let data = store.get(key).await?;
    serde_json::from_slice(&data).map_err(|e| StorageError::InvalidJson {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
