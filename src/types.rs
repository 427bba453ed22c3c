use crate::util::{string_or_number, truthy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One flat record from the data source. Field order is preserved.
pub type Row = Map<String, Value>;

pub const DEFAULT_DATE_COLUMN: &str = "created_at";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartKind {
    Card,
    Table,
    Column,
    Bar,
    Line,
    Spline,
    Area,
    Pie,
    Other(String),
}

impl ChartKind {
    /// Chart kinds produced in "all types" mode when no template set is configured.
    pub const DEFAULT_SET: [ChartKind; 6] = [
        ChartKind::Column,
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Spline,
        ChartKind::Area,
        ChartKind::Pie,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ChartKind::Card => "card",
            ChartKind::Table => "table",
            ChartKind::Column => "column",
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Spline => "spline",
            ChartKind::Area => "area",
            ChartKind::Pie => "pie",
            ChartKind::Other(s) => s,
        }
    }

    /// Kinds drawn on a category axis and sharing the standard template path.
    pub fn is_axis_chart(&self) -> bool {
        matches!(
            self,
            ChartKind::Column | ChartKind::Bar | ChartKind::Line | ChartKind::Spline | ChartKind::Area
        )
    }
}

impl From<String> for ChartKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "card" => ChartKind::Card,
            "table" => ChartKind::Table,
            "column" => ChartKind::Column,
            "bar" => ChartKind::Bar,
            "line" => ChartKind::Line,
            "spline" => ChartKind::Spline,
            "area" => ChartKind::Area,
            "pie" => ChartKind::Pie,
            _ => ChartKind::Other(s),
        }
    }
}

impl From<&str> for ChartKind {
    fn from(s: &str) -> Self {
        ChartKind::from(s.to_string())
    }
}

impl From<ChartKind> for String {
    fn from(kind: ChartKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Responsive grid size of a card/chart/table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    #[serde(deserialize_with = "string_or_number")]
    pub cols: String,
    #[serde(deserialize_with = "string_or_number")]
    pub md: String,
    #[serde(deserialize_with = "string_or_number")]
    pub lg: String,
}

impl Size {
    pub fn new(cols: &str, md: &str, lg: &str) -> Self {
        Size {
            cols: cols.to_string(),
            md: md.to_string(),
            lg: lg.to_string(),
        }
    }

    pub fn chart_default() -> Self {
        Size::new("12", "6", "6")
    }

    pub fn card_default() -> Self {
        Size::new("6", "4", "4")
    }
}

/// Per-key chart configuration. Unknown keys are carried through to the
/// shaped response untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChartKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Row,
}

impl ChartSpec {
    pub fn of_kind(kind: ChartKind) -> Self {
        ChartSpec {
            kind: Some(kind),
            ..ChartSpec::default()
        }
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.size.is_none() && self.title.is_none() && self.extra.is_empty()
    }
}

/// Ordered `chart key -> ChartSpec` mapping. A key configured as `null` or
/// `{}` is still a key; it just carries an empty spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ChartMap {
    entries: Vec<(String, ChartSpec)>,
}

impl ChartMap {
    pub fn new() -> Self {
        ChartMap::default()
    }

    pub fn insert(&mut self, key: &str, spec: ChartSpec) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = spec,
            None => self.entries.push((key.to_string(), spec)),
        }
    }

    pub fn with(mut self, key: &str, spec: ChartSpec) -> Self {
        self.insert(key, spec);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ChartSpec> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChartSpec)> {
        self.entries.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Map<String, Value>> for ChartMap {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut out = ChartMap::new();
        for (key, value) in map {
            let spec: ChartSpec = match value {
                Value::Null => ChartSpec::default(),
                v => serde_json::from_value(v)?,
            };
            out.insert(&key, spec);
        }
        Ok(out)
    }
}

impl From<ChartMap> for Map<String, Value> {
    fn from(map: ChartMap) -> Self {
        map.entries
            .into_iter()
            .map(|(k, s)| (k, serde_json::to_value(s).unwrap_or(Value::Null)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    #[default]
    Page,
    Mixed,
}

/// One reference inside a mixed page: `subpage.key`, optionally with an
/// inline spec overriding the subpage's own configuration for that key.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedEntry {
    pub page: String,
    pub key: String,
    pub spec: Option<ChartSpec>,
}

impl MixedEntry {
    /// Split `"subpage.key"`. A bare `"subpage"` names a single implicit key
    /// equal to the page name.
    pub fn parse(reference: &str, spec: Option<ChartSpec>) -> Self {
        let (page, key) = match reference.split_once('.') {
            Some((page, key)) => (page, key),
            None => (reference, reference),
        };
        MixedEntry {
            page: page.to_string(),
            key: key.to_string(),
            spec: spec.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPageConfig {
    #[serde(rename = "type", default)]
    kind: PageKind,
    #[serde(default)]
    report: Value,
}

/// Declarative configuration of one page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPageConfig")]
pub struct PageConfig {
    pub kind: PageKind,
    /// Chart specs of a regular page; empty for mixed pages.
    pub charts: ChartMap,
    /// Sub-report references of a mixed page; empty for regular pages.
    pub entries: Vec<MixedEntry>,
}

impl PageConfig {
    pub fn page(charts: ChartMap) -> Self {
        PageConfig {
            kind: PageKind::Page,
            charts,
            entries: Vec::new(),
        }
    }

    pub fn mixed(entries: Vec<MixedEntry>) -> Self {
        PageConfig {
            kind: PageKind::Mixed,
            charts: ChartMap::new(),
            entries,
        }
    }
}

impl TryFrom<RawPageConfig> for PageConfig {
    type Error = String;

    fn try_from(raw: RawPageConfig) -> Result<Self, Self::Error> {
        match raw.kind {
            PageKind::Page => {
                let charts = match raw.report {
                    Value::Null => ChartMap::new(),
                    Value::Object(map) => ChartMap::try_from(map).map_err(|e| e.to_string())?,
                    other => return Err(format!("page report must be an object, found {}", other)),
                };
                Ok(PageConfig::page(charts))
            }
            PageKind::Mixed => {
                let mut entries = Vec::new();
                match raw.report {
                    Value::Null => {}
                    Value::Array(items) => {
                        for item in items {
                            match item {
                                Value::String(reference) => entries.push(MixedEntry::parse(&reference, None)),
                                other => return Err(format!("mixed report entry must be a string, found {}", other)),
                            }
                        }
                    }
                    Value::Object(map) => {
                        for (reference, value) in map {
                            let spec = match value {
                                Value::Null => None,
                                v => Some(serde_json::from_value::<ChartSpec>(v).map_err(|e| e.to_string())?),
                            };
                            entries.push(MixedEntry::parse(&reference, spec));
                        }
                    }
                    other => return Err(format!("mixed report must be a list or object, found {}", other)),
                }
                Ok(PageConfig::mixed(entries))
            }
        }
    }
}

/// Explicit chart-key selection: a list, a comma separated string, or `"all"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Types {
    List(Vec<String>),
    Text(String),
}

impl Types {
    /// Resolve the keys to produce; `None` and `"all"` select every
    /// configured key in configuration order.
    pub fn resolve(types: Option<&Types>, configured: &ChartMap) -> Vec<String> {
        match types {
            Some(Types::List(keys)) => keys.clone(),
            Some(Types::Text(text)) if text.trim() != "all" => text
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
            _ => configured.keys().map(str::to_string).collect(),
        }
    }
}

/// Equality/inclusion filter applied to the underlying query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedFilter {
    pub key: String,
    pub value: Value,
}

impl AdvancedFilter {
    /// Accepted values: a scalar means equality, an array means inclusion.
    pub fn values(&self) -> Vec<&Value> {
        match &self.value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}

fn default_date_column() -> String {
    DEFAULT_DATE_COLUMN.to_string()
}

/// Request filter. Unrecognized options are kept in `extra` so the filter
/// can be echoed back exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(rename = "dateColumn", default = "default_date_column")]
    pub date_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "truthy")]
    pub apply_date: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Types>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advanced: Vec<AdvancedFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_chart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_page: Option<ChartMap>,
    #[serde(flatten)]
    pub extra: Row,
}

impl Default for Filter {
    fn default() -> Self {
        Filter {
            page: None,
            date_column: default_date_column(),
            start: None,
            end: None,
            apply_date: false,
            types: None,
            advanced: Vec::new(),
            prefer_chart: None,
            mixed_page: None,
            extra: Row::new(),
        }
    }
}

impl Filter {
    pub fn for_page(page: &str) -> Self {
        Filter {
            page: Some(page.to_string()),
            ..Filter::default()
        }
    }

    pub fn with_types<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(Types::List(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn with_dates(mut self, start: &str, end: &str) -> Self {
        self.start = Some(start.to_string());
        self.end = Some(end.to_string());
        self.apply_date = true;
        self
    }

    /// The requested page name, if present and non-empty.
    pub fn page_name(&self) -> Option<&str> {
        self.page.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// Assembled report for one page (or the merge of several).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub title: String,
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Row>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Value>,
}

impl ReportResult {
    pub fn new(title: &str, page: &str) -> Self {
        ReportResult {
            title: title.to_string(),
            page: page.to_string(),
            ..ReportResult::default()
        }
    }

    /// Fold another report's cards, charts and tables into this one. Cards
    /// merge by key (later wins); charts and tables append in order.
    pub fn absorb(&mut self, other: ReportResult) {
        if let Some(cards) = other.cards.filter(|c| !c.is_empty()) {
            self.cards.get_or_insert_with(Row::new).extend(cards);
        }
        self.charts.extend(other.charts);
        self.tables.extend(other.tables);
    }
}

/// Top-level payload handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutput {
    pub report: ReportResult,
    pub filter: Filter,
}
