use crate::types::ReportResult;
use crate::util::{format_int, value_label};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use tabled::{builder::Builder, settings::Style};

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Render rows of cells as a markdown table, or `None` when there is nothing to show.
pub fn markdown_table(header: Vec<String>, rows: Vec<Vec<String>>) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    Some(table.to_string())
}

fn cards_table(cards: &Value) -> Option<String> {
    let items = cards.get("data")?.as_array()?;
    let rows = items
        .iter()
        .map(|card| {
            vec![
                value_label(&card["key"]),
                value_label(&card["label"]),
                value_label(&card["value"]),
            ]
        })
        .collect();
    markdown_table(vec!["Key".into(), "Label".into(), "Value".into()], rows)
}

fn data_table(table: &Value, max_rows: usize) -> Option<String> {
    let columns = table.get("columns")?.as_array()?;
    let data = table.get("data")?.as_array()?;
    let header = columns.iter().map(|c| value_label(&c["title"])).collect();
    let rows = data
        .iter()
        .take(max_rows)
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    let key = c["key"].as_str().unwrap_or_default();
                    row.get(key).map(value_label).unwrap_or_default()
                })
                .collect()
        })
        .collect();
    markdown_table(header, rows)
}

/// Short text description of one assembled chart entry.
fn chart_line(chart: &Value) -> String {
    let title = value_label(&chart["title"]);
    let kind = value_label(&chart["type"]);
    match chart["data"].as_object() {
        Some(by_type) if !by_type.contains_key("series") => {
            let types: Vec<&str> = by_type.keys().map(String::as_str).collect();
            let categories = by_type
                .values()
                .find_map(|c| c["xAxis"]["categories"].as_array().map(Vec::len))
                .unwrap_or(0);
            format!(
                "- {} [{}]: {} categories, rendered as {}",
                title,
                kind,
                format_int(categories),
                types.join("/")
            )
        }
        _ => format!("- {} [{}]", title, kind),
    }
}

/// Print a console preview of a report: cards and tables as markdown,
/// charts as one summary line each.
pub fn preview_report(report: &ReportResult, max_rows: usize) {
    println!("{} ({})\n", report.title, report.page);

    if let Some(cards) = &report.cards {
        println!("Cards");
        match cards_table(&Value::Object(cards.clone())) {
            Some(t) => println!("{}\n", t),
            None => println!("(no cards)\n"),
        }
    }

    if !report.charts.is_empty() {
        println!("Charts ({})", format_int(report.charts.len()));
        for chart in &report.charts {
            println!("{}", chart_line(chart));
        }
        println!();
    }

    for table in &report.tables {
        let total = table["data"].as_array().map(Vec::len).unwrap_or(0);
        println!("{} ({} rows)", value_label(&table["title"]), format_int(total));
        match data_table(table, max_rows) {
            Some(t) => println!("{}\n", t),
            None => println!("(no rows)\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_table_columns_in_order() {
        let table = json!({
            "title": "Latest users",
            "columns": [{"title": "Name", "key": "name"}, {"title": "Age", "key": "age"}],
            "data": [{"name": "Ana", "age": 31}, {"name": "Bo", "age": null}, {"name": "Cy", "age": 5}]
        });
        let out = data_table(&table, 2).unwrap();
        assert!(out.contains("| Name | Age |"));
        assert!(out.contains("| Ana  | 31  |"));
        assert!(!out.contains("Cy"));
    }

    #[test]
    fn empty_tables_render_nothing() {
        let table = json!({"columns": [], "data": []});
        assert!(data_table(&table, 5).is_none());
    }

    #[test]
    fn chart_line_lists_rendered_types() {
        let chart = json!({
            "title": "By month",
            "type": "spline",
            "data": {
                "line": {"xAxis": {"categories": ["Jan", "Feb"]}, "series": []},
                "pie": {"series": []}
            }
        });
        assert_eq!(chart_line(&chart), "- By month [spline]: 2 categories, rendered as line/pie");
    }
}
