//! Affiliate feed filtering against the campaign and feed allow-lists.

use crate::error::{CatalogError, CatalogResult};
use crate::lookup::LookupCache;
use crate::models::{CampaignRow, FeedRow, ImpactCampaigns, PartnerizeFeeds};
use crate::store::CatalogStore;
use assetcat_core::config::LookupConfig;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Affiliate network a record batch came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordSource {
    Impact,
    Partnerize,
}

impl RecordSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordSource::Impact => "impact",
            RecordSource::Partnerize => "partnerize",
        }
    }

    /// JSON field holding the id that must be on the allow-list.
    pub fn id_field(&self) -> &'static str {
        match self {
            RecordSource::Impact => "CampaignId",
            RecordSource::Partnerize => "feed_id",
        }
    }
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordSource {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "impact" => Ok(RecordSource::Impact),
            "partnerize" => Ok(RecordSource::Partnerize),
            other => Err(CatalogError::UnrecognizedSource(other.to_string())),
        }
    }
}

/// Passes only records whose campaign or feed id is catalogued.
pub struct FeedFilter {
    campaigns: LookupCache<CampaignRow>,
    feeds: LookupCache<FeedRow>,
}

impl FeedFilter {
    /// Load both allow-lists from the catalog.
    pub async fn load(store: &dyn CatalogStore, config: &LookupConfig) -> CatalogResult<Self> {
        let campaigns: LookupCache<CampaignRow> =
            LookupCache::load(store, ImpactCampaigns, &config.campaign_key_columns).await?;
        let feeds: LookupCache<FeedRow> =
            LookupCache::load(store, PartnerizeFeeds, &config.feed_key_columns).await?;
        tracing::info!(
            campaigns = campaigns.len(),
            feeds = feeds.len(),
            "feed allow-lists loaded"
        );
        Ok(Self::from_caches(campaigns, feeds))
    }

    pub fn from_caches(campaigns: LookupCache<CampaignRow>, feeds: LookupCache<FeedRow>) -> Self {
        Self { campaigns, feeds }
    }

    /// Whether `record` from `source` is on the allow-list.
    pub fn passes(&self, source: RecordSource, record: &Value) -> CatalogResult<bool> {
        let field = source.id_field();
        let id = match record.get(field) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            Some(other) => {
                return Err(CatalogError::InvalidRecord(format!(
                    "{field} must be a string or number, got {other}"
                )));
            }
            None => {
                return Err(CatalogError::InvalidRecord(format!(
                    "missing {field} for {source} record"
                )));
            }
        };

        Ok(match source {
            RecordSource::Impact => self.campaigns.contains(&[&id]),
            RecordSource::Partnerize => self.feeds.contains(&[&id]),
        })
    }

    /// Parse one raw line and check it.
    pub fn passes_line(&self, source: RecordSource, line: &str) -> CatalogResult<bool> {
        let record: Value = serde_json::from_str(line)
            .map_err(|e| CatalogError::InvalidRecord(e.to_string()))?;
        self.passes(source, &record)
    }

    /// Lines that pass, verbatim. Blank and invalid lines are dropped; invalid
    /// ones are logged.
    pub fn filter_lines<'a, I>(&'a self, source: RecordSource, lines: I) -> impl Iterator<Item = &'a str>
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: 'a,
    {
        lines.into_iter().filter(move |line| {
            if line.trim().is_empty() {
                return false;
            }
            match self.passes_line(source, line) {
                Ok(pass) => pass,
                Err(err) => {
                    tracing::error!(record = *line, source = %source, error = %err, "skipping record");
                    false
                }
            }
        })
    }
}
