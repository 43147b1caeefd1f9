//! Date/time dimension lookups for fact rows.

use crate::error::{CatalogError, CatalogResult};
use crate::lookup::{LookupCache, TableName, TableRows};
use crate::models::{DimensionRow, DimensionTable};
use std::collections::HashMap;
use std::fmt::Display;
use time::OffsetDateTime;

/// Dimension ids for one instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DimensionIds {
    pub second: i64,
    pub minute: i64,
    pub hour: i64,
    pub day: i64,
    pub month: i64,
    pub year: i64,
}

/// Every dimension table, indexed both by `value` and by `label`.
pub struct DimensionService {
    by_value: HashMap<DimensionTable, LookupCache<DimensionRow>>,
    by_label: HashMap<DimensionTable, LookupCache<DimensionRow>>,
}

impl DimensionService {
    /// Read all dimension tables.
    pub async fn load<S>(source: &S) -> CatalogResult<Self>
    where
        S: TableRows<DimensionRow> + ?Sized,
    {
        let mut tables = Vec::with_capacity(DimensionTable::ALL.len());
        for table in DimensionTable::ALL {
            let rows = TableRows::<DimensionRow>::load_rows(source, table).await?;
            tables.push((table, rows));
        }
        let service = Self::from_tables(tables)?;
        tracing::info!(
            tables = DimensionTable::ALL.len(),
            "OLAP dimensions loaded"
        );
        Ok(service)
    }

    /// Build from rows already in memory.
    pub fn from_tables(
        tables: impl IntoIterator<Item = (DimensionTable, Vec<DimensionRow>)>,
    ) -> CatalogResult<Self> {
        let mut by_value: HashMap<DimensionTable, LookupCache<DimensionRow>> = HashMap::new();
        let mut by_label: HashMap<DimensionTable, LookupCache<DimensionRow>> = HashMap::new();
        for (table, rows) in tables {
            by_value.insert(
                table,
                LookupCache::from_rows(table, &["value"], rows.iter().cloned())?,
            );
            by_label.insert(table, LookupCache::from_rows(table, &["label"], rows)?);
        }
        Ok(Self { by_value, by_label })
    }

    fn find<'a>(
        index: &'a HashMap<DimensionTable, LookupCache<DimensionRow>>,
        table: DimensionTable,
        key: &str,
    ) -> CatalogResult<&'a DimensionRow> {
        index
            .get(&table)
            .and_then(|cache| cache.find(&[key]))
            .ok_or_else(|| CatalogError::NotFound(format!("{key} in {}", table.name())))
    }

    pub fn dim_id_for_value(&self, table: DimensionTable, value: impl Display) -> CatalogResult<i64> {
        Self::find(&self.by_value, table, &value.to_string()).map(|row| row.id)
    }

    pub fn dim_id_for_label(&self, table: DimensionTable, label: &str) -> CatalogResult<i64> {
        Self::find(&self.by_label, table, label).map(|row| row.id)
    }

    pub fn dim_label_for_value(
        &self,
        table: DimensionTable,
        value: impl Display,
    ) -> CatalogResult<&str> {
        Self::find(&self.by_value, table, &value.to_string()).map(|row| row.label.as_str())
    }

    /// Dimension ids for a Unix timestamp, interpreted in UTC.
    pub fn dim_ids_for_timestamp(&self, unix_secs: i64) -> CatalogResult<DimensionIds> {
        let at = OffsetDateTime::from_unix_timestamp(unix_secs)
            .map_err(|e| CatalogError::InvalidRecord(format!("timestamp {unix_secs}: {e}")))?;

        Ok(DimensionIds {
            second: self.dim_id_for_value(DimensionTable::TimeSecond, at.second())?,
            minute: self.dim_id_for_value(DimensionTable::TimeMinute, at.minute())?,
            hour: self.dim_id_for_value(DimensionTable::TimeHour, at.hour())?,
            day: self.dim_id_for_value(DimensionTable::DateDay, at.day())?,
            month: self.dim_id_for_value(DimensionTable::DateMonth, u8::from(at.month()))?,
            year: self.dim_id_for_value(DimensionTable::DateYear, at.year())?,
        })
    }
}
