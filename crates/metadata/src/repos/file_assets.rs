//! File asset repository trait.

use crate::error::CatalogResult;
use crate::models::FileAssetRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for `file_assets` rows.
#[async_trait]
pub trait FileAssetRepo: Send + Sync {
    /// Number of rows, live or soft-deleted, carrying this content hash.
    async fn count_by_metahash(&self, metahash: &str) -> CatalogResult<u64>;

    /// Live rows for a filename.
    async fn find_live_by_filename(&self, filename: &str) -> CatalogResult<Vec<FileAssetRow>>;

    /// Every row ever recorded for a filename, oldest first.
    async fn list_assets_by_filename(&self, filename: &str) -> CatalogResult<Vec<FileAssetRow>>;

    /// Get a row by id.
    async fn get_asset(&self, id: Uuid) -> CatalogResult<Option<FileAssetRow>>;

    /// Insert a new row inside a transaction.
    async fn insert_asset(&self, asset: &FileAssetRow) -> CatalogResult<()>;

    /// Soft-delete the live row `previous_id` and insert `asset`, atomically.
    ///
    /// Fails with `Conflict` if `previous_id` is no longer live.
    async fn replace_asset(&self, previous_id: Uuid, asset: &FileAssetRow) -> CatalogResult<()>;

    /// Set `deleted_ts` on every live row for a filename. Returns rows affected.
    async fn soft_delete_by_filename(
        &self,
        filename: &str,
        deleted_at: OffsetDateTime,
    ) -> CatalogResult<u64>;

    /// Distinct filenames that have a live row, sorted.
    async fn list_live_filenames(&self) -> CatalogResult<Vec<String>>;
}
