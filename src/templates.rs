// Chart templates: per chart type skeletons (axes, styling, plot options)
// that assembled charts are cloned from.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Template set used when a request does not name one.
pub const DEFAULT_TEMPLATE_SET: &str = "high_chart";

const FONT_FAMILY: &str = "Cairo , Poppins, sans-serif";

/// Ordered `chart type -> template` mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChartTemplates {
    templates: Map<String, Value>,
}

impl ChartTemplates {
    pub fn new() -> Self {
        ChartTemplates::default()
    }

    pub fn insert(&mut self, kind: &str, template: Value) {
        self.templates.insert(kind.to_string(), template);
    }

    pub fn get(&self, kind: &str) -> Option<&Value> {
        self.templates.get(kind)
    }

    /// Configured chart types in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn axis_template(kind: &str) -> Value {
    json!({
        "chart": {
            "type": kind,
            "style": {"fontFamily": FONT_FAMILY}
        },
        "title": {"text": ""},
        "xAxis": {"categories": []},
        "yAxis": {"title": {"text": ""}},
        "series": []
    })
}

fn column_template() -> Value {
    let mut template = axis_template("column");
    template["plotOptions"] = json!({
        "column": {"borderRadius": "50%", "maxPointWidth": "25"}
    });
    template
}

fn pie_template() -> Value {
    json!({
        "chart": {
            "type": "pie",
            "style": {"fontFamily": FONT_FAMILY}
        },
        "title": {"text": ""},
        "plotOptions": {
            "pie": {"allowPointSelect": true, "cursor": "pointer"},
            "series": {
                "allowPointSelect": true,
                "cursor": "pointer",
                "dataLabels": [
                    {"enabled": true, "distance": 20},
                    {
                        "enabled": true,
                        "distance": -40,
                        "format": "{point.percentage:.1f}%",
                        "style": {"fontSize": "1.2em", "textOutline": "none", "opacity": 0.7},
                        "filter": {"operator": ">", "property": "percentage", "value": 10}
                    }
                ]
            }
        },
        "series": []
    })
}

/// Highcharts skeletons for every built-in chart type.
pub static DEFAULT_TEMPLATES: Lazy<ChartTemplates> = Lazy::new(|| {
    let mut set = ChartTemplates::new();
    set.insert("column", column_template());
    set.insert("bar", axis_template("bar"));
    set.insert("line", axis_template("line"));
    set.insert("spline", axis_template("spline"));
    set.insert("area", axis_template("area"));
    set.insert("pie", pie_template());
    set
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_builtin_kinds_in_order() {
        let kinds: Vec<&str> = DEFAULT_TEMPLATES.kinds().collect();
        assert_eq!(kinds, vec!["column", "bar", "line", "spline", "area", "pie"]);
        assert_eq!(DEFAULT_TEMPLATES.get("bar").unwrap()["chart"]["type"], "bar");
        assert!(DEFAULT_TEMPLATES.get("column").unwrap()["plotOptions"]["column"].is_object());
        assert!(DEFAULT_TEMPLATES.get("pie").unwrap().get("xAxis").is_none());
    }

    #[test]
    fn templates_deserialize_from_config() {
        let set: ChartTemplates = serde_json::from_value(json!({
            "line": {"chart": {"type": "line"}, "series": []},
            "pie": {"chart": {"type": "pie"}, "series": []}
        }))
        .unwrap();
        assert_eq!(set.kinds().collect::<Vec<_>>(), vec!["line", "pie"]);
    }
}
