// Row queries. `RowSource` is the seam to whatever store backs the
// reports; `MemorySource` keeps named tables in memory (e.g. loaded from CSV).

use crate::error::ReportError;
use crate::types::{AdvancedFilter, Filter, Row};
use crate::util::{is_blank, loose_eq, parse_date_safe, value_datetime, value_label};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Column whose non-null value marks a soft-deleted row.
pub const SOFT_DELETE_COLUMN: &str = "deleted_at";

/// Inclusive date bounds; a missing side is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub date_column: String,
    pub date_range: Option<DateRange>,
    pub advanced: Vec<AdvancedFilter>,
}

impl TableQuery {
    pub fn new(table: &str, date_column: &str) -> Self {
        TableQuery {
            table: table.to_string(),
            date_column: date_column.to_string(),
            date_range: None,
            advanced: Vec::new(),
        }
    }

    /// Query `table` the way a request filter asks: its date column, its
    /// date bounds when `apply_date` is set, and its advanced filters.
    pub fn from_filter(table: &str, filter: &Filter) -> Self {
        let date_range = filter.apply_date.then(|| DateRange {
            start: parse_date_safe(filter.start.as_deref()),
            end: parse_date_safe(filter.end.as_deref()),
        });
        TableQuery {
            table: table.to_string(),
            date_column: filter.date_column.clone(),
            date_range,
            advanced: filter.advanced.clone(),
        }
    }

    /// Whether `row` passes the date range and every advanced filter.
    pub fn matches(&self, row: &Row) -> bool {
        if let Some(range) = &self.date_range {
            let date = row
                .get(&self.date_column)
                .and_then(value_datetime)
                .map(|dt| dt.date());
            match date {
                Some(d) if range.contains(d) => {}
                _ => return false,
            }
        }
        self.advanced.iter().all(|f| {
            let Some(actual) = row.get(&f.key) else {
                return false;
            };
            f.values().into_iter().any(|wanted| loose_eq(actual, wanted))
        })
    }
}

pub trait RowSource {
    /// Rows of `query.table` passing the query's filters, minus soft-deleted
    /// rows when the table has a soft-delete column.
    fn query_rows(&self, query: &TableQuery) -> Result<Vec<Row>, ReportError>;

    /// Earliest and latest value of the query's date column among matching rows.
    fn date_bounds(
        &self,
        query: &TableQuery,
    ) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>), ReportError> {
        let rows = self.query_rows(query)?;
        let mut bounds: (Option<NaiveDateTime>, Option<NaiveDateTime>) = (None, None);
        for at in rows
            .iter()
            .filter_map(|r| r.get(&query.date_column).and_then(value_datetime))
        {
            bounds.0 = Some(bounds.0.map_or(at, |m| m.min(at)));
            bounds.1 = Some(bounds.1.map_or(at, |m| m.max(at)));
        }
        Ok(bounds)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, Vec<Row>>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    pub fn insert_table(&mut self, name: &str, rows: Vec<Row>) {
        self.tables.insert(name.to_string(), rows);
    }

    pub fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.insert_table(name, rows);
        self
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    fn soft_deletes(rows: &[Row]) -> bool {
        rows.iter().any(|r| r.contains_key(SOFT_DELETE_COLUMN))
    }
}

impl RowSource for MemorySource {
    fn query_rows(&self, query: &TableQuery) -> Result<Vec<Row>, ReportError> {
        let rows = self
            .tables
            .get(&query.table)
            .ok_or_else(|| ReportError::Query(format!("unknown table `{}`", query.table)))?;
        let soft = Self::soft_deletes(rows);
        let out: Vec<Row> = rows
            .iter()
            .filter(|r| !soft || is_blank(r.get(SOFT_DELETE_COLUMN)))
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        debug!(table = %query.table, matched = out.len(), total = rows.len(), "queried rows");
        Ok(out)
    }
}

/// Count rows per label in first-seen order, producing grouped rows shaped
/// `{group_field: label, count_field: n}`. Rows without a label are skipped.
pub fn count_by<F>(rows: &[Row], group_field: &str, count_field: &str, label: F) -> Vec<Row>
where
    F: Fn(&Row) -> Option<String>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in rows {
        let Some(l) = label(row) else { continue };
        let n = counts.entry(l.clone()).or_insert(0);
        if *n == 0 {
            order.push(l);
        }
        *n += 1;
    }
    order
        .into_iter()
        .map(|l| {
            let n = counts.get(&l).copied().unwrap_or(0);
            let mut row = Row::new();
            row.insert(group_field.to_string(), Value::String(l));
            row.insert(count_field.to_string(), Value::from(n));
            row
        })
        .collect()
}

/// Like [`count_by`], but with one count column per distinct value of
/// `split_field`; missing combinations are `0`.
pub fn count_by_split<F>(rows: &[Row], group_field: &str, split_field: &str, label: F) -> Vec<Row>
where
    F: Fn(&Row) -> Option<String>,
{
    let mut splits: Vec<String> = Vec::new();
    for row in rows {
        let split = row.get(split_field).map(value_label).unwrap_or_default();
        if !split.is_empty() && !splits.contains(&split) {
            splits.push(split);
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<(String, String), u64> = HashMap::new();
    for row in rows {
        let Some(l) = label(row) else { continue };
        let split = row.get(split_field).map(value_label).unwrap_or_default();
        if split.is_empty() {
            continue;
        }
        if !order.contains(&l) {
            order.push(l.clone());
        }
        *counts.entry((l, split)).or_insert(0) += 1;
    }

    order
        .into_iter()
        .map(|l| {
            let mut row = Row::new();
            row.insert(group_field.to_string(), Value::String(l.clone()));
            for split in &splits {
                let n = counts.get(&(l.clone(), split.clone())).copied().unwrap_or(0);
                row.insert(split.clone(), Value::from(n));
            }
            row
        })
        .collect()
}
