//! Storage trait definitions.

use crate::error::StorageResult;
use crate::key::ObjectKey;
use async_trait::async_trait;
use bytes::Bytes;

/// Object store abstraction over a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Read an object fully into memory.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Write an object, replacing any previous content.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Bucket this store writes into, used to build `s3://` URIs.
    fn bucket(&self) -> &str;

    /// Locate a key in this store's bucket.
    fn object_key(&self, key: &str) -> ObjectKey {
        ObjectKey::new(self.bucket(), key)
    }

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable.
    ///
    /// The default implementation performs a cheap listing.
    async fn health_check(&self) -> StorageResult<()> {
        self.list("").await.map(|_| ())
    }
}
