// Reshapes flat grouped rows into chart categories and named series.

use crate::translate::Translator;
use crate::types::Row;
use crate::util::{as_number, is_identifier, number_value, value_label};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<Value>,
}

impl Series {
    /// Sum of the numeric points; non-numeric points count as zero.
    pub fn total(&self) -> f64 {
        self.data.iter().filter_map(as_number).sum()
    }
}

/// Series keyed by field (or, for pie data, by group) in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesSet {
    entries: Vec<(String, Series)>,
}

impl SeriesSet {
    pub fn get(&self, key: &str) -> Option<&Series> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.entries.iter().map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Formatted {
    pub categories: Vec<String>,
    pub series: SeriesSet,
}

/// One category per row (the translated `group_by` value) and one series per
/// non-identifier field, each holding one point per row.
///
/// Fields are discovered row by row. A field that first shows up late, or is
/// missing from some rows, is padded with `0` so every series stays aligned
/// with the categories.
pub fn format_standard(group_by: &str, rows: &[Row], translator: &dyn Translator) -> Formatted {
    let mut out = Formatted::default();

    for (idx, row) in rows.iter().enumerate() {
        let label = row.get(group_by).map(value_label).unwrap_or_default();
        out.categories.push(translator.translate(&label));

        for (field, value) in row {
            if field == group_by || is_identifier(field) {
                continue;
            }
            let pos = match out.series.position(field) {
                Some(pos) => pos,
                None => {
                    out.series.entries.push((
                        field.clone(),
                        Series {
                            name: translator.translate(field),
                            data: vec![Value::from(0); idx],
                        },
                    ));
                    out.series.entries.len() - 1
                }
            };
            out.series.entries[pos].1.data.push(value.clone());
        }

        for (_, series) in out.series.entries.iter_mut() {
            if series.data.len() <= idx {
                series.data.push(Value::from(0));
            }
        }
    }

    out
}

/// Pie data: rows are grouped by their `group_by` value and each group
/// becomes one series holding the sum of its rows' other fields.
///
/// Non-numeric values count as zero and identifier fields are left out of
/// the sum. Groups whose label looks like an identifier are dropped too.
/// Groups keep first-seen order; categories stay empty.
pub fn format_pie(group_by: &str, rows: &[Row], translator: &dyn Translator) -> Formatted {
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();

    for row in rows {
        let group = row.get(group_by).map(value_label).unwrap_or_default();
        let total: f64 = row
            .iter()
            .filter(|(field, _)| field.as_str() != group_by && !is_identifier(field))
            .map(|(_, value)| as_number(value).unwrap_or(0.0))
            .sum();
        match sums.get_mut(&group) {
            Some(sum) => *sum += total,
            None => {
                order.push(group.clone());
                sums.insert(group, total);
            }
        }
    }

    let entries = order
        .into_iter()
        .filter(|group| !is_identifier(group))
        .map(|group| {
            let sum = sums.get(&group).copied().unwrap_or(0.0);
            let series = Series {
                name: translator.translate(&group),
                data: vec![number_value(sum)],
            };
            (group, series)
        })
        .collect();

    Formatted {
        categories: Vec::new(),
        series: SeriesSet { entries },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{Catalog, Passthrough};
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn standard_months_scenario() {
        let catalog = Catalog::new().with("count", "Count");
        let data = rows(json!([{"month": "Jan", "count": 5}, {"month": "Feb", "count": 7}]));
        let out = format_standard("month", &data, &catalog);

        assert_eq!(out.categories, vec!["Jan", "Feb"]);
        assert_eq!(out.series.len(), 1);
        let count = out.series.get("count").unwrap();
        assert_eq!(count.name, "Count");
        assert_eq!(count.data, vec![json!(5), json!(7)]);
    }

    #[test]
    fn standard_lengths_match_rows_and_skip_identifiers() {
        let data = rows(json!([
            {"day": "Mon", "user_id": 1, "male": 2, "female": 3},
            {"day": "Tue", "female": 4},
            {"day": "Wed", "other": 1, "male": 5}
        ]));
        let out = format_standard("day", &data, &Passthrough);

        assert_eq!(out.categories.len(), data.len());
        assert!(out.series.get("user_id").is_none());
        let keys: Vec<&str> = out.series.keys().collect();
        assert_eq!(keys, vec!["male", "female", "other"]);
        for series in out.series.iter() {
            assert_eq!(series.data.len(), data.len());
        }
        assert_eq!(out.series.get("male").unwrap().data, vec![json!(2), json!(0), json!(5)]);
        assert_eq!(out.series.get("other").unwrap().data, vec![json!(0), json!(0), json!(1)]);
    }

    #[test]
    fn standard_missing_group_field_still_yields_a_category() {
        let data = rows(json!([{"count": 1}]));
        let out = format_standard("month", &data, &Passthrough);
        assert_eq!(out.categories, vec!["---"]);
    }

    #[test]
    fn pie_months_scenario() {
        let data = rows(json!([{"month": "Jan", "count": 5}, {"month": "Feb", "count": 7}]));
        let out = format_pie("month", &data, &Passthrough);

        assert!(out.categories.is_empty());
        let keys: Vec<&str> = out.series.keys().collect();
        assert_eq!(keys, vec!["Jan", "Feb"]);
        assert_eq!(out.series.get("Jan").unwrap().data, vec![json!(5)]);
        assert_eq!(out.series.get("Feb").unwrap().data, vec![json!(7)]);
    }

    #[test]
    fn pie_coerces_and_accumulates() {
        let data = rows(json!([
            {"gender": "male", "count": "3", "note": "n/a", "user_id": 99},
            {"gender": "female", "count": 2},
            {"gender": "male", "count": 4, "extra": 1.5}
        ]));
        let out = format_pie("gender", &data, &Passthrough);

        assert_eq!(out.series.get("male").unwrap().data, vec![json!(8.5)]);
        assert_eq!(out.series.get("female").unwrap().data, vec![json!(2)]);
    }

    #[test]
    fn pie_drops_identifier_groups() {
        let data = rows(json!([
            {"kind": "user_id", "count": 3},
            {"kind": "guest", "count": 2}
        ]));
        let out = format_pie("kind", &data, &Passthrough);

        let keys: Vec<&str> = out.series.keys().collect();
        assert_eq!(keys, vec!["guest"]);
        assert_eq!(out.series.get("guest").unwrap().data, vec![json!(2)]);
    }

    #[test]
    fn pie_sums_ignore_row_order_within_group() {
        let forward = rows(json!([
            {"g": "a", "v": 1}, {"g": "a", "v": 2}, {"g": "b", "v": 10}, {"g": "a", "v": 3}
        ]));
        let mut backward = forward.clone();
        backward.reverse();

        let f = format_pie("g", &forward, &Passthrough);
        let b = format_pie("g", &backward, &Passthrough);
        assert_eq!(f.series.get("a"), b.series.get("a"));
        assert_eq!(f.series.get("b"), b.series.get("b"));
    }

    #[test]
    fn empty_input_is_empty_output() {
        let out = format_standard("month", &[], &Passthrough);
        assert!(out.categories.is_empty());
        assert!(out.series.is_empty());
        assert!(format_pie("month", &[], &Passthrough).series.is_empty());
    }
}
