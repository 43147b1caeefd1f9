//! Asset writer: persists new or changed assets and soft-deletes vanished ones.

use crate::dedup::Novelty;
use crate::error::CatalogResult;
use crate::models::FileAssetRow;
use crate::repos::FileAssetRepo;
use crate::store::CatalogStore;
use assetcat_core::ManifestRecord;
use assetcat_core::config::AssetLocation;
use assetcat_storage::{ObjectStore, upload_object};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Writes `file_assets` rows for manifest and deletion records.
pub struct AssetWriter {
    store: Arc<dyn CatalogStore>,
    location: AssetLocation,
    objects: Option<Arc<dyn ObjectStore>>,
}

impl AssetWriter {
    pub fn new(store: Arc<dyn CatalogStore>, location: AssetLocation) -> Self {
        Self {
            store,
            location,
            objects: None,
        }
    }

    /// Upload each asset's local file before cataloguing it; the stored
    /// `s3_uri` then points at the uploaded object.
    pub fn with_object_store(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn location(&self) -> &AssetLocation {
        &self.location
    }

    /// Insert a row for `record` and return its metahash as the ack token.
    ///
    /// For [`Novelty::Changed`] the previously live row is soft-deleted in
    /// the same transaction, so a filename never has two live rows.
    pub async fn write_asset_record(
        &self,
        record: &ManifestRecord,
        novelty: Novelty,
    ) -> CatalogResult<String> {
        let s3_uri = self.storage_uri(record).await?;
        let asset = FileAssetRow {
            id: Uuid::new_v4(),
            s3_uri,
            filename: record.filename().to_string(),
            source_url_base: record.base_url.clone(),
            source_url_path: record.srcfile.clone(),
            source_metahash: record.metahash.clone(),
            created_ts: OffsetDateTime::now_utc(),
            updated_ts: None,
            deleted_ts: None,
            replaces_asset_id: None,
        };

        match novelty {
            Novelty::New => self.store.insert_asset(&asset).await?,
            Novelty::Changed { live_id } => self.store.replace_asset(live_id, &asset).await?,
        }

        tracing::info!(
            asset_id = %asset.id,
            filename = %asset.filename,
            metahash = %asset.source_metahash,
            s3_uri = %asset.s3_uri,
            novelty = ?novelty,
            "asset recorded"
        );

        Ok(record.metahash.clone())
    }

    /// Soft-delete every live row for `filename`. Returns rows affected.
    pub async fn delete_asset_record(&self, filename: &str) -> CatalogResult<u64> {
        let affected = self
            .store
            .soft_delete_by_filename(filename, OffsetDateTime::now_utc())
            .await?;

        if affected == 0 {
            tracing::warn!(filename = filename, "no live asset to delete");
        } else {
            tracing::info!(filename = filename, rows = affected, "asset soft-deleted");
        }

        Ok(affected)
    }

    async fn storage_uri(&self, record: &ManifestRecord) -> CatalogResult<String> {
        match &self.objects {
            Some(objects) => {
                let key =
                    upload_object(objects.as_ref(), &record.local_file, self.location.folder())
                        .await?;
                Ok(key.uri())
            }
            None => Ok(self
                .location
                .uri_for_key(&self.location.key_for(record.object_name()))),
        }
    }
}
