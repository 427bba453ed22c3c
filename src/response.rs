// Wraps computed payloads with title, size and column metadata pulled from
// the per-key chart configuration.

use crate::translate::Translator;
use crate::types::{ChartKind, ChartMap, ChartSpec, Row, Size};
use serde_json::{json, Value};

/// Two-tier spec lookup: a mixed report's override for a key wins over the
/// page's own configuration of that key.
#[derive(Debug, Clone, Copy)]
pub struct SpecLookup<'a> {
    base: &'a ChartMap,
    mixed: Option<&'a ChartMap>,
}

impl<'a> SpecLookup<'a> {
    pub fn new(base: &'a ChartMap, mixed: Option<&'a ChartMap>) -> Self {
        SpecLookup { base, mixed }
    }

    fn layers(&self, key: &str) -> impl Iterator<Item = &'a ChartSpec> {
        let mixed = self.mixed.and_then(|m| m.get(key));
        mixed.into_iter().chain(self.base.get(key))
    }

    /// The whole spec that applies to `key`. An empty override does not
    /// shadow the page's own spec.
    pub fn effective(&self, key: &str) -> Option<&'a ChartSpec> {
        let mut layers = self.layers(key).peekable();
        while let Some(spec) = layers.next() {
            if !spec.is_empty() || layers.peek().is_none() {
                return Some(spec);
            }
        }
        None
    }

    /// Declared type, falling through to the base spec when the override
    /// does not set one.
    pub fn kind(&self, key: &str) -> Option<&'a ChartKind> {
        self.layers(key).find_map(|s| s.kind.as_ref())
    }

    pub fn size(&self, key: &str) -> Option<&'a Size> {
        self.layers(key).find_map(|s| s.size.as_ref())
    }
}

pub struct ResponseShaper<'a> {
    lookup: SpecLookup<'a>,
    translator: &'a dyn Translator,
}

impl<'a> ResponseShaper<'a> {
    pub fn new(lookup: SpecLookup<'a>, translator: &'a dyn Translator) -> Self {
        ResponseShaper { lookup, translator }
    }

    pub fn lookup(&self) -> SpecLookup<'a> {
        self.lookup
    }

    /// Shape a payload for `key`: every field of the effective spec plus
    /// `title`, `data`, `size`, and `columns` for tables.
    pub fn shape(&self, key: &str, payload: Value) -> Value {
        let spec = self.lookup.effective(key);
        let mut out: Row = spec
            .and_then(|s| serde_json::to_value(s).ok())
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        let title = spec.and_then(|s| s.title.as_deref()).unwrap_or(key);
        let size = self.lookup.size(key).cloned().unwrap_or_else(Size::chart_default);
        let kind = self.lookup.kind(key);
        if let Some(kind) = kind {
            out.insert("type".to_string(), json!(kind));
        }

        let columns = (kind == Some(&ChartKind::Table)).then(|| self.columns(&payload));
        out.insert("title".to_string(), json!(self.translator.translate(title)));
        out.insert("data".to_string(), payload);
        out.insert("size".to_string(), json!(size));
        if let Some(columns) = columns {
            out.insert("columns".to_string(), columns);
        }
        Value::Object(out)
    }

    /// Shape a set of card values (`card key -> value`).
    pub fn cards(&self, key: &str, cards: Row) -> Value {
        let size = self.lookup.size(key).cloned().unwrap_or_else(Size::card_default);
        let items: Vec<Value> = cards
            .into_iter()
            .map(|(card, value)| {
                json!({
                    "key": card,
                    "value": value,
                    "label": self.translator.translate(&card),
                    "size": size,
                })
            })
            .collect();
        self.shape(key, Value::Array(items))
    }

    /// Column metadata from the keys of the first payload row.
    fn columns(&self, payload: &Value) -> Value {
        let first = payload
            .as_array()
            .and_then(|rows| rows.first())
            .and_then(Value::as_object);
        let columns: Vec<Value> = first
            .map(|row| {
                row.keys()
                    .map(|field| json!({"title": self.translator.translate(field), "key": field}))
                    .collect()
            })
            .unwrap_or_default();
        Value::Array(columns)
    }
}
