//! Database models mapping to the catalog schema.

use crate::lookup::{LookupRow, TableName};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// File assets
// =============================================================================

/// One catalogued version of a downloaded file.
///
/// A row is live while `deleted_ts` is NULL. Soft-deleting sets it; rows
/// are never physically removed.
#[derive(Debug, Clone, FromRow)]
pub struct FileAssetRow {
    pub id: Uuid,
    /// Object storage URI of the landed file.
    pub s3_uri: String,
    pub filename: String,
    pub source_url_base: String,
    pub source_url_path: String,
    /// Content hash of the file at the time it was recorded.
    pub source_metahash: String,
    pub created_ts: OffsetDateTime,
    pub updated_ts: Option<OffsetDateTime>,
    pub deleted_ts: Option<OffsetDateTime>,
    /// Reserved for version chaining; never populated.
    pub replaces_asset_id: Option<Uuid>,
}

impl FileAssetRow {
    pub fn is_live(&self) -> bool {
        self.deleted_ts.is_none()
    }
}

/// The `file_assets` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileAssets;

impl TableName for FileAssets {
    fn name(self) -> &'static str {
        "file_assets"
    }
}

impl LookupRow for FileAssetRow {
    type Table = FileAssets;

    const COLUMNS: &'static [&'static str] = &[
        "id",
        "s3_uri",
        "filename",
        "source_url_base",
        "source_url_path",
        "source_metahash",
        "created_ts",
        "updated_ts",
        "deleted_ts",
        "replaces_asset_id",
    ];

    fn column(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "s3_uri" => Some(self.s3_uri.clone()),
            "filename" => Some(self.filename.clone()),
            "source_url_base" => Some(self.source_url_base.clone()),
            "source_url_path" => Some(self.source_url_path.clone()),
            "source_metahash" => Some(self.source_metahash.clone()),
            "created_ts" => Some(self.created_ts.to_string()),
            "updated_ts" => self.updated_ts.map(|ts| ts.to_string()),
            "deleted_ts" => self.deleted_ts.map(|ts| ts.to_string()),
            "replaces_asset_id" => self.replaces_asset_id.map(|id| id.to_string()),
            _ => None,
        }
    }
}

// =============================================================================
// Affiliate lookup tables
// =============================================================================

/// Impact campaign the pipeline is allowed to ingest.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignRow {
    pub campaign_id: String,
    pub campaign_name: Option<String>,
}

/// The `impact_campaigns` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImpactCampaigns;

impl TableName for ImpactCampaigns {
    fn name(self) -> &'static str {
        "impact_campaigns"
    }
}

impl LookupRow for CampaignRow {
    type Table = ImpactCampaigns;

    const COLUMNS: &'static [&'static str] = &["campaign_id", "campaign_name"];

    fn column(&self, name: &str) -> Option<String> {
        match name {
            "campaign_id" => Some(self.campaign_id.clone()),
            "campaign_name" => self.campaign_name.clone(),
            _ => None,
        }
    }
}

/// Partnerize feed the pipeline is allowed to ingest.
#[derive(Debug, Clone, FromRow)]
pub struct FeedRow {
    pub feed_id: String,
    pub feed_name: Option<String>,
}

/// The `partnerize_feeds` table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartnerizeFeeds;

impl TableName for PartnerizeFeeds {
    fn name(self) -> &'static str {
        "partnerize_feeds"
    }
}

impl LookupRow for FeedRow {
    type Table = PartnerizeFeeds;

    const COLUMNS: &'static [&'static str] = &["feed_id", "feed_name"];

    fn column(&self, name: &str) -> Option<String> {
        match name {
            "feed_id" => Some(self.feed_id.clone()),
            "feed_name" => self.feed_name.clone(),
            _ => None,
        }
    }
}

// =============================================================================
// Date/time dimensions
// =============================================================================

/// Row of a date or time dimension table.
#[derive(Debug, Clone, FromRow)]
pub struct DimensionRow {
    pub id: i64,
    pub value: i64,
    pub label: String,
}

/// Dimension tables, one per calendar/clock granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DimensionTable {
    TimeSecond,
    TimeMinute,
    TimeHour,
    DateDay,
    DateMonth,
    DateYear,
}

impl DimensionTable {
    pub const ALL: [DimensionTable; 6] = [
        DimensionTable::TimeSecond,
        DimensionTable::TimeMinute,
        DimensionTable::TimeHour,
        DimensionTable::DateDay,
        DimensionTable::DateMonth,
        DimensionTable::DateYear,
    ];
}

impl TableName for DimensionTable {
    fn name(self) -> &'static str {
        match self {
            DimensionTable::TimeSecond => "dim_time_second",
            DimensionTable::TimeMinute => "dim_time_minute",
            DimensionTable::TimeHour => "dim_time_hour",
            DimensionTable::DateDay => "dim_date_day",
            DimensionTable::DateMonth => "dim_date_month",
            DimensionTable::DateYear => "dim_date_year",
        }
    }
}

impl LookupRow for DimensionRow {
    type Table = DimensionTable;

    const COLUMNS: &'static [&'static str] = &["id", "value", "label"];

    fn column(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "value" => Some(self.value.to_string()),
            "label" => Some(self.label.clone()),
            _ => None,
        }
    }
}
