//! Batch ingestion: parse, dedup, and write one record at a time.

use crate::dedup::DedupFilter;
use crate::error::CatalogResult;
use crate::writer::AssetWriter;
use assetcat_core::{DeletionRecord, ManifestRecord, RecordType};

/// Per-batch tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub written: u64,
    pub skipped: u64,
    /// Rows soft-deleted, which may differ from the number of deletion records.
    pub deleted: u64,
    pub failed: u64,
}

enum Step {
    Written(String),
    Skipped,
    Deleted(u64),
}

/// Dedup filter and writer wired together for one run.
pub struct IngestPipeline {
    filter: DedupFilter,
    writer: AssetWriter,
}

impl IngestPipeline {
    pub fn new(filter: DedupFilter, writer: AssetWriter) -> Self {
        Self { filter, writer }
    }

    pub fn writer(&self) -> &AssetWriter {
        &self.writer
    }

    /// Process `lines` in order as records of `record_type`.
    ///
    /// Blank lines are ignored. A record that fails to parse or write is
    /// logged with its raw text and counted as failed; the batch continues.
    /// Fatal errors (catalog inconsistency, lost connection) end the batch
    /// immediately. `on_ack` receives the metahash of every asset written.
    pub async fn run_batch<I, S, F>(
        &self,
        lines: I,
        record_type: RecordType,
        mut on_ack: F,
    ) -> CatalogResult<BatchReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&str),
    {
        let mut report = BatchReport::default();

        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }

            let step = match record_type {
                RecordType::Asset => self.ingest_asset(line).await,
                RecordType::Deletion => self.ingest_deletion(line).await,
            };

            match step {
                Ok(Step::Written(ack)) => {
                    report.written += 1;
                    on_ack(&ack);
                }
                Ok(Step::Skipped) => report.skipped += 1,
                Ok(Step::Deleted(rows)) => report.deleted += rows,
                Err(err) if err.is_fatal() => {
                    tracing::error!(
                        line = idx + 1,
                        record = line,
                        error = %err,
                        "fatal error, aborting batch"
                    );
                    return Err(err);
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        line = idx + 1,
                        record = line,
                        record_type = %record_type,
                        error = %err,
                        "error ingesting record"
                    );
                }
            }
        }

        tracing::info!(
            record_type = %record_type,
            mode = %self.filter.mode(),
            written = report.written,
            skipped = report.skipped,
            deleted = report.deleted,
            failed = report.failed,
            "batch complete"
        );

        Ok(report)
    }

    async fn ingest_asset(&self, line: &str) -> CatalogResult<Step> {
        let record = ManifestRecord::parse(line)?;
        match self.filter.evaluate(&record).await?.into_result()? {
            Some(novelty) => {
                let ack = self.writer.write_asset_record(&record, novelty).await?;
                Ok(Step::Written(ack))
            }
            None => Ok(Step::Skipped),
        }
    }

    async fn ingest_deletion(&self, line: &str) -> CatalogResult<Step> {
        let record = DeletionRecord::parse(line)?;
        let rows = self
            .writer
            .delete_asset_record(&record.deleted_filename)
            .await?;
        Ok(Step::Deleted(rows))
    }
}
