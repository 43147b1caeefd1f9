//! Dedup filter: decides whether an incoming manifest record is new,
//! an update of a live asset, or already catalogued.

use crate::error::{CatalogError, CatalogResult};
use crate::repos::FileAssetRepo;
use crate::store::CatalogStore;
use assetcat_core::{ManifestRecord, MatchMode};
use std::sync::Arc;
use uuid::Uuid;

/// Why a record needs writing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Novelty {
    /// Nothing live for this file yet.
    New,
    /// The file is live under a different hash and must be superseded.
    Changed { live_id: Uuid },
}

/// More catalog rows matched than the invariants allow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inconsistency {
    pub key: String,
    pub matches: u64,
}

/// Result of checking one record against the catalog.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DedupOutcome {
    Proceed(Novelty),
    Skip,
    Inconsistent(Inconsistency),
}

impl DedupOutcome {
    pub fn should_write(&self) -> bool {
        matches!(self, DedupOutcome::Proceed(_))
    }

    /// `Some(novelty)` to write, `None` to skip, or a fatal error.
    pub fn into_result(self) -> CatalogResult<Option<Novelty>> {
        match self {
            DedupOutcome::Proceed(novelty) => Ok(Some(novelty)),
            DedupOutcome::Skip => Ok(None),
            DedupOutcome::Inconsistent(Inconsistency { key, matches }) => {
                Err(CatalogError::Inconsistent { key, matches })
            }
        }
    }
}

/// Checks manifest records against `file_assets`.
pub struct DedupFilter {
    store: Arc<dyn CatalogStore>,
    mode: MatchMode,
}

impl DedupFilter {
    pub fn new(store: Arc<dyn CatalogStore>, mode: MatchMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Classify `record`.
    ///
    /// In [`MatchMode::Hash`] every row ever written counts, so a hash that
    /// was catalogued once is never written again. In
    /// [`MatchMode::Filename`] only live rows count: the record is skipped
    /// when its file is live under the same hash. In both modes a record
    /// that needs writing supersedes its file's live row, so a filename
    /// never gains a second live row.
    pub async fn evaluate(&self, record: &ManifestRecord) -> CatalogResult<DedupOutcome> {
        let outcome = match self.mode {
            MatchMode::Hash => {
                let matches = self.store.count_by_metahash(&record.metahash).await?;
                match matches {
                    0 => self.against_live_row(record).await?,
                    1 => DedupOutcome::Skip,
                    n => DedupOutcome::Inconsistent(Inconsistency {
                        key: format!("metahash={}", record.metahash),
                        matches: n,
                    }),
                }
            }
            MatchMode::Filename => self.against_live_row(record).await?,
        };

        match &outcome {
            DedupOutcome::Proceed(novelty) => tracing::debug!(
                filename = record.filename(),
                metahash = %record.metahash,
                novelty = ?novelty,
                "record needs writing"
            ),
            DedupOutcome::Skip => tracing::debug!(
                filename = record.filename(),
                metahash = %record.metahash,
                "record already catalogued"
            ),
            DedupOutcome::Inconsistent(inconsistency) => tracing::error!(
                key = %inconsistency.key,
                matches = inconsistency.matches,
                mode = %self.mode,
                "catalog holds more matching rows than allowed"
            ),
        }

        Ok(outcome)
    }

    async fn against_live_row(&self, record: &ManifestRecord) -> CatalogResult<DedupOutcome> {
        let live = self.store.find_live_by_filename(record.filename()).await?;
        Ok(match live.as_slice() {
            [] => DedupOutcome::Proceed(Novelty::New),
            [row] if row.source_metahash == record.metahash => DedupOutcome::Skip,
            [row] => DedupOutcome::Proceed(Novelty::Changed { live_id: row.id }),
            rows => DedupOutcome::Inconsistent(Inconsistency {
                key: format!("filename={}", record.filename()),
                matches: rows.len() as u64,
            }),
        })
    }
}
