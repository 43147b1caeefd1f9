//! In-memory lookup caches over small reference tables.
//!
//! A cache is built once from a full table scan and then answers
//! key lookups without touching the database. Keys are the configured
//! key columns' values joined with [`KEY_SEPARATOR`]; a NULL column
//! contributes an empty string.
//!
//! The separator is not escaped. Composite keys whose values contain `%`
//! can alias each other (`["a%b", "c"]` and `["a", "b%c"]` share a key),
//! so key columns must not hold the separator.

use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// Separator between key column values in a composite key.
pub const KEY_SEPARATOR: &str = "%";

/// Type-level name of a catalog table.
pub trait TableName: Copy + fmt::Debug + Send + Sync + 'static {
    fn name(self) -> &'static str;
}

/// A row type that can back a [`LookupCache`].
pub trait LookupRow: Clone + Send + Sync + Unpin + 'static {
    /// Table(s) this row type is read from.
    type Table: TableName;

    /// Every column name the row exposes.
    const COLUMNS: &'static [&'static str];

    /// Value of `name` rendered as a string, or `None` when NULL or unknown.
    fn column(&self, name: &str) -> Option<String>;
}

/// Full-table reads for a row type.
#[async_trait]
pub trait TableRows<R: LookupRow>: Send + Sync {
    async fn load_rows(&self, table: R::Table) -> CatalogResult<Vec<R>>;
}

/// Keyed snapshot of one table.
#[derive(Debug, Clone)]
pub struct LookupCache<R: LookupRow> {
    table: R::Table,
    key_columns: Vec<&'static str>,
    rows: HashMap<String, R>,
}

impl<R: LookupRow> LookupCache<R> {
    /// Read every row of `table` from `source` and index it by `key_columns`.
    pub async fn load<S, K>(source: &S, table: R::Table, key_columns: &[K]) -> CatalogResult<Self>
    where
        S: TableRows<R> + ?Sized,
        K: AsRef<str> + Sync,
    {
        let key_columns = resolve_key_columns::<R>(table, key_columns)?;
        let rows = TableRows::<R>::load_rows(source, table).await?;
        let cache = Self::index(table, key_columns, rows);
        tracing::debug!(
            table = table.name(),
            rows = cache.len(),
            key = %cache.key_columns.join(","),
            "lookup cache loaded"
        );
        Ok(cache)
    }

    /// Build a cache from rows already in memory.
    pub fn from_rows<K: AsRef<str>>(
        table: R::Table,
        key_columns: &[K],
        rows: impl IntoIterator<Item = R>,
    ) -> CatalogResult<Self> {
        let key_columns = resolve_key_columns::<R>(table, key_columns)?;
        Ok(Self::index(table, key_columns, rows))
    }

    fn index(
        table: R::Table,
        key_columns: Vec<&'static str>,
        rows: impl IntoIterator<Item = R>,
    ) -> Self {
        let mut cache = Self {
            table,
            key_columns,
            rows: HashMap::new(),
        };
        for row in rows {
            cache.update(row);
        }
        cache
    }

    pub fn table(&self) -> R::Table {
        self.table
    }

    pub fn key_columns(&self) -> &[&'static str] {
        &self.key_columns
    }

    /// Composite key of `row` under this cache's key columns.
    pub fn key_for(&self, row: &R) -> String {
        self.key_columns
            .iter()
            .map(|column| row.column(column).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR)
    }

    /// Row whose key columns equal `values`, in key column order.
    pub fn find(&self, values: &[&str]) -> Option<&R> {
        self.rows.get(&values.join(KEY_SEPARATOR))
    }

    pub fn contains(&self, values: &[&str]) -> bool {
        self.find(values).is_some()
    }

    /// Insert or replace a row, returning the row previously under its key.
    pub fn update(&mut self, row: R) -> Option<R> {
        let key = self.key_for(&row);
        self.rows.insert(key, row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &R> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn resolve_key_columns<R: LookupRow>(
    table: R::Table,
    key_columns: &[impl AsRef<str>],
) -> CatalogResult<Vec<&'static str>> {
    if key_columns.is_empty() {
        return Err(CatalogError::Config(format!(
            "lookup on {} needs at least one key column",
            table.name()
        )));
    }
    key_columns
        .iter()
        .map(|requested| {
            let requested = requested.as_ref();
            R::COLUMNS
                .iter()
                .find(|column| **column == requested)
                .copied()
                .ok_or_else(|| CatalogError::UnknownColumn {
                    table: table.name(),
                    column: requested.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignRow, DimensionRow, DimensionTable, ImpactCampaigns};

    struct FixedRows(Vec<CampaignRow>);

    #[async_trait]
    impl TableRows<CampaignRow> for FixedRows {
        async fn load_rows(&self, _table: ImpactCampaigns) -> CatalogResult<Vec<CampaignRow>> {
            Ok(self.0.clone())
        }
    }

    fn campaign(id: &str, name: Option<&str>) -> CampaignRow {
        CampaignRow {
            campaign_id: id.to_string(),
            campaign_name: name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_load_indexes_by_key_column() {
        let source = FixedRows(vec![campaign("100", Some("Spring")), campaign("200", None)]);
        let cache = LookupCache::load(&source, ImpactCampaigns, &["campaign_id"])
            .await
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&["100"]));
        assert_eq!(
            cache.find(&["100"]).unwrap().campaign_name.as_deref(),
            Some("Spring")
        );
        assert!(cache.find(&["300"]).is_none());
    }

    #[tokio::test]
    async fn test_unknown_key_column_is_rejected() {
        let source = FixedRows(vec![]);
        let result = LookupCache::load(&source, ImpactCampaigns, &["advertiser_id"]).await;
        match result {
            Err(CatalogError::UnknownColumn { table, column }) => {
                assert_eq!(table, "impact_campaigns");
                assert_eq!(column, "advertiser_id");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_key_columns_is_config_error() {
        let result =
            LookupCache::<CampaignRow>::from_rows::<&str>(ImpactCampaigns, &[], Vec::new());
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_composite_key_with_null_column() {
        let cache = LookupCache::from_rows(
            ImpactCampaigns,
            &["campaign_id", "campaign_name"],
            vec![campaign("100", None), campaign("200", Some("Summer"))],
        )
        .unwrap();

        assert!(cache.contains(&["100", ""]));
        assert!(cache.contains(&["200", "Summer"]));
        assert!(!cache.contains(&["200"]));
        assert_eq!(cache.key_for(&campaign("7", Some("x"))), "7%x");
    }

    #[test]
    fn test_separator_in_values_aliases_keys() {
        let cache = LookupCache::from_rows(
            ImpactCampaigns,
            &["campaign_id", "campaign_name"],
            vec![campaign("a%b", Some("c"))],
        )
        .unwrap();

        assert!(cache.contains(&["a%b", "c"]));
        assert!(cache.contains(&["a", "b%c"]));
    }

    #[test]
    fn test_update_replaces_existing_key() {
        let mut cache =
            LookupCache::from_rows(ImpactCampaigns, &["campaign_id"], vec![campaign("1", None)])
                .unwrap();

        let previous = cache.update(campaign("1", Some("Renamed")));
        assert!(previous.is_some());
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.find(&["1"]).unwrap().campaign_name.as_deref(),
            Some("Renamed")
        );

        assert!(cache.update(campaign("2", None)).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_numeric_columns_render_as_strings() {
        let cache = LookupCache::from_rows(
            DimensionTable::TimeHour,
            &["value"],
            vec![DimensionRow {
                id: 13,
                value: 12,
                label: "12:00".to_string(),
            }],
        )
        .unwrap();
        assert_eq!(cache.find(&["12"]).unwrap().id, 13);
        assert_eq!(cache.table(), DimensionTable::TimeHour);
    }
}
