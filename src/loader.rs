use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::query::MemorySource;
use crate::translate::Catalog;
use crate::types::Row;
use crate::util::cell_value;
use csv::ReaderBuilder;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub tables: usize,
    pub total_rows: usize,
    pub parse_errors: usize,
}

/// Read CSV rows with typed cells. Records that fail to parse are counted
/// and skipped.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<(Vec<Row>, usize), ReportError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    let mut parse_errors = 0usize;

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.clone(), record.get(idx).map(cell_value).unwrap_or_default()))
            .collect();
        rows.push(row);
    }
    Ok((rows, parse_errors))
}

pub fn load_csv_table(path: &Path) -> Result<(Vec<Row>, usize), ReportError> {
    read_csv_rows(fs::File::open(path)?)
}

/// Load every `*.csv` in `dir` as a table named after the file stem.
pub fn load_data_dir(dir: &Path) -> Result<(MemorySource, LoadReport), ReportError> {
    let mut source = MemorySource::new();
    let mut report = LoadReport::default();

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();

    for path in paths {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        let (rows, parse_errors) = load_csv_table(&path)?;
        if parse_errors > 0 {
            warn!(table = %name, parse_errors, "skipped malformed records");
        }
        debug!(table = %name, rows = rows.len(), "loaded table");
        report.tables += 1;
        report.total_rows += rows.len();
        report.parse_errors += parse_errors;
        source.insert_table(&name, rows);
    }
    Ok((source, report))
}

pub fn load_config(path: &Path) -> Result<ReportConfig, ReportError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn load_catalog(path: &Path) -> Result<Catalog, ReportError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn csv_cells_are_typed_and_ordered() {
        let data = "id,name,age,score,created_at\n1,Ana,31,4.5,2024-01-02 10:00:00\n2,Bo,,x,2024-01-03\n";
        let (rows, errors) = read_csv_rows(data.as_bytes()).unwrap();
        assert_eq!(errors, 0);
        assert_eq!(rows.len(), 2);
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["id", "name", "age", "score", "created_at"]);
        assert_eq!(rows[0]["age"], json!(31));
        assert_eq!(rows[0]["score"], json!(4.5));
        assert_eq!(rows[1]["age"], Value::Null);
        assert_eq!(rows[1]["score"], json!("x"));
    }

    #[test]
    fn short_records_fill_with_null() {
        let data = "id,name,deleted_at\n1,Ana\n";
        let (rows, _) = read_csv_rows(data.as_bytes()).unwrap();
        assert_eq!(rows[0]["deleted_at"], Value::Null);
    }
}
