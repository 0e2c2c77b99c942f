//! Merging of normalized tables into one deduplicated dataset.

use std::collections::HashSet;

use analyzer_core::models::{CanonicalRecord, ColumnSet};
use analyzer_core::registry::Registry;
use tracing::debug;

use crate::reader::NormalizedTable;

/// Every record of a batch, aligned to one schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedDataset {
    /// Union of the sub-columns of every table, first-seen order.
    pub columns: ColumnSet,
    /// Union of the extra columns of every table, first-seen order.
    pub extra_columns: Vec<String>,
    /// Distinct records of registry cities, in canonical order.
    pub records: Vec<CanonicalRecord>,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Concatenate `tables`, align every record to the union schema, drop exact
/// duplicates and keep only rows of registry cities.
///
/// Records are put in a canonical order so that the order in which files
/// were read never shows in the result.
pub fn merge(tables: Vec<NormalizedTable>, registry: &Registry) -> MergedDataset {
    let mut columns = ColumnSet::default();
    let mut extra_columns: Vec<String> = Vec::new();
    for table in &tables {
        columns.union_with(&table.columns);
        for col in &table.extra_columns {
            if !extra_columns.contains(col) {
                extra_columns.push(col.clone());
            }
        }
    }

    let mut records: Vec<CanonicalRecord> = tables
        .into_iter()
        .flat_map(|t| t.records)
        .map(|mut r| {
            r.align_to(&columns, &extra_columns);
            r
        })
        .collect();
    let concatenated = records.len();

    let mut seen = HashSet::with_capacity(records.len());
    records.retain(|r| seen.insert(r.key()));
    let distinct = records.len();

    records.retain(|r| registry.contains_city(&r.city));
    records.sort_by_cached_key(|r| r.key());

    debug!(
        concatenated,
        duplicates = concatenated - distinct,
        outside_registry = distinct - records.len(),
        kept = records.len(),
        "tables merged"
    );

    MergedDataset {
        columns,
        extra_columns,
        records,
    }
}
