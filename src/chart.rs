// Chart assembly: merges a chart-type template with formatted categories
// and series to produce a renderer-ready chart object.

use crate::error::ReportError;
use crate::series::{format_pie, format_standard, Formatted};
use crate::templates::{ChartTemplates, DEFAULT_TEMPLATES};
use crate::translate::Translator;
use crate::types::{ChartKind, Row};
use crate::util::number_value;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Fixed display color applied to every axis-chart series.
pub const SERIES_COLOR: &str = "rgba(var(--v-theme-primary),1)";

/// What to build from a producer's rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartMode {
    /// Pass the rows through untouched.
    Table,
    /// One assembled chart per configured chart type, keyed by type.
    All,
    /// A single chart of the given type.
    Only(ChartKind),
}

pub struct ChartHandler<'a> {
    templates: &'a ChartTemplates,
    translator: &'a dyn Translator,
}

impl<'a> ChartHandler<'a> {
    /// Build a handler over `templates`, or over the built-in set when no
    /// template set is configured.
    pub fn new(templates: Option<&'a ChartTemplates>, translator: &'a dyn Translator) -> Self {
        let templates = match templates {
            Some(set) if !set.is_empty() => set,
            _ => &*DEFAULT_TEMPLATES,
        };
        ChartHandler {
            templates,
            translator,
        }
    }

    pub fn templates(&self) -> &ChartTemplates {
        self.templates
    }

    pub fn resolve(&self, group_by: &str, rows: Vec<Row>, mode: &ChartMode) -> Result<Value, ReportError> {
        match mode {
            ChartMode::Table => Ok(Value::Array(rows.into_iter().map(Value::Object).collect())),
            ChartMode::Only(ChartKind::Pie) => {
                let formatted = format_pie(group_by, &rows, self.translator);
                self.assemble(&ChartKind::Pie, &formatted)
            }
            ChartMode::Only(kind) => {
                let formatted = format_standard(group_by, &rows, self.translator);
                self.assemble(kind, &formatted)
            }
            ChartMode::All => {
                let standard = format_standard(group_by, &rows, self.translator);
                let mut charts = Map::new();
                for name in self.templates.kinds() {
                    let kind = ChartKind::from(name);
                    let chart = if kind == ChartKind::Pie {
                        self.assemble(&kind, &format_pie(group_by, &rows, self.translator))?
                    } else {
                        self.assemble(&kind, &standard)?
                    };
                    charts.insert(name.to_string(), chart);
                }
                debug!(group_by, charts = charts.len(), "assembled charts for every type");
                Ok(Value::Object(charts))
            }
        }
    }

    /// Assemble one chart. Pie charts expect pie-formatted input; types
    /// without a dedicated path fall back to the column template.
    pub fn assemble(&self, kind: &ChartKind, formatted: &Formatted) -> Result<Value, ReportError> {
        match kind {
            ChartKind::Pie => self.assemble_pie(formatted),
            k if k.is_axis_chart() => self.assemble_axis(k.as_str(), formatted),
            _ => self.assemble_axis(ChartKind::Column.as_str(), formatted),
        }
    }

    fn template(&self, name: &str) -> Result<Value, ReportError> {
        match self.templates.get(name) {
            Some(t @ Value::Object(_)) => Ok(t.clone()),
            Some(_) => Err(ReportError::TemplateNotFound(format!("`{}` is not an object", name))),
            None => Err(ReportError::TemplateNotFound(name.to_string())),
        }
    }

    fn assemble_axis(&self, name: &str, formatted: &Formatted) -> Result<Value, ReportError> {
        let mut chart = self.template(name)?;
        if !chart["xAxis"].is_object() {
            chart["xAxis"] = json!({});
        }
        chart["xAxis"]["categories"] = json!(formatted.categories);
        chart["series"] = Value::Array(
            formatted
                .series
                .iter()
                .map(|s| json!({"name": s.name, "data": s.data, "color": SERIES_COLOR}))
                .collect(),
        );
        Ok(chart)
    }

    fn assemble_pie(&self, formatted: &Formatted) -> Result<Value, ReportError> {
        let mut chart = self.template(ChartKind::Pie.as_str())?;
        let points: Vec<Value> = formatted
            .series
            .iter()
            .map(|s| json!({"name": s.name, "y": number_value(s.total())}))
            .collect();
        let entry = json!({
            "name": self.translator.translate("count"),
            "colorByPoint": true,
            "data": points,
        });
        if !chart["series"].is_array() {
            chart["series"] = json!([]);
        }
        if let Some(series) = chart["series"].as_array_mut() {
            series.push(entry);
        }
        Ok(chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::{Catalog, Passthrough};
    use pretty_assertions::assert_eq;

    fn month_rows() -> Vec<Row> {
        json!([{"month": "Jan", "count": 5}, {"month": "Feb", "count": 7}])
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn axis_chart_gets_categories_and_colored_series() {
        let catalog = Catalog::new().with("count", "Count");
        let handler = ChartHandler::new(None, &catalog);
        let chart = handler
            .resolve("month", month_rows(), &ChartMode::Only(ChartKind::Spline))
            .unwrap();

        assert_eq!(chart["chart"]["type"], "spline");
        assert_eq!(chart["xAxis"]["categories"], json!(["Jan", "Feb"]));
        assert_eq!(
            chart["series"],
            json!([{"name": "Count", "data": [5, 7], "color": SERIES_COLOR}])
        );
    }

    #[test]
    fn pie_chart_has_one_point_per_group() {
        let catalog = Catalog::new().with("count", "Count");
        let handler = ChartHandler::new(None, &catalog);
        let chart = handler
            .resolve("month", month_rows(), &ChartMode::Only(ChartKind::Pie))
            .unwrap();

        assert_eq!(
            chart["series"],
            json!([{
                "name": "Count",
                "colorByPoint": true,
                "data": [{"name": "Jan", "y": 5}, {"name": "Feb", "y": 7}]
            }])
        );
    }

    #[test]
    fn all_mode_builds_every_type_and_reformats_pie() {
        let handler = ChartHandler::new(None, &Passthrough);
        let charts = handler.resolve("month", month_rows(), &ChartMode::All).unwrap();
        let kinds: Vec<&String> = charts.as_object().unwrap().keys().collect();
        assert_eq!(kinds, vec!["column", "bar", "line", "spline", "area", "pie"]);
        assert_eq!(charts["pie"]["series"][0]["data"][1], json!({"name": "Feb", "y": 7}));
        // Types after pie still use the standard shape.
        assert_eq!(charts["area"]["xAxis"]["categories"], json!(["Jan", "Feb"]));
    }

    #[test]
    fn all_mode_follows_configured_template_order() {
        let mut set = ChartTemplates::new();
        set.insert("pie", json!({"series": []}));
        set.insert("line", json!({"chart": {"type": "line"}, "series": []}));
        let handler = ChartHandler::new(Some(&set), &Passthrough);
        let charts = handler.resolve("month", month_rows(), &ChartMode::All).unwrap();
        let kinds: Vec<&String> = charts.as_object().unwrap().keys().collect();
        assert_eq!(kinds, vec!["pie", "line"]);
        assert_eq!(charts["line"]["xAxis"]["categories"], json!(["Jan", "Feb"]));
    }

    #[test]
    fn table_mode_passes_rows_through() {
        let handler = ChartHandler::new(None, &Passthrough);
        let out = handler.resolve("month", month_rows(), &ChartMode::Table).unwrap();
        assert_eq!(out, json!([{"month": "Jan", "count": 5}, {"month": "Feb", "count": 7}]));
    }

    #[test]
    fn missing_template_in_configured_set_is_an_error() {
        let mut set = ChartTemplates::new();
        set.insert("line", json!({"series": []}));
        let handler = ChartHandler::new(Some(&set), &Passthrough);
        let err = handler
            .resolve("month", month_rows(), &ChartMode::Only(ChartKind::Bar))
            .unwrap_err();
        assert!(matches!(err, ReportError::TemplateNotFound(_)));
    }

    #[test]
    fn unknown_kind_uses_column_template() {
        let handler = ChartHandler::new(None, &Passthrough);
        let chart = handler
            .resolve("month", month_rows(), &ChartMode::Only(ChartKind::from("scatter")))
            .unwrap();
        assert_eq!(chart["chart"]["type"], "column");
    }
}
