// Label resolution. Every component that renders a label receives a
// `&dyn Translator` explicitly; there is no ambient locale.

use heck::ToSnakeCase;
use serde::Deserialize;
use std::collections::HashMap;

/// Namespace used for all report labels.
pub const DEFAULT_NAMESPACE: &str = "report";

/// Rendered for empty labels.
pub const EMPTY_LABEL: &str = "---";

pub trait Translator {
    /// Raw catalog lookup. `None` when the key has no translation.
    fn lookup(&self, namespace: &str, key: &str) -> Option<String>;

    /// Translate `text` in the default namespace.
    fn translate(&self, text: &str) -> String {
        self.translate_in(text, DEFAULT_NAMESPACE)
    }

    /// Look `text` up by its snake_cased key, falling back to the raw text.
    fn translate_in(&self, text: &str, namespace: &str) -> String {
        if text.is_empty() {
            return EMPTY_LABEL.to_string();
        }
        self.lookup(namespace, &text.to_snake_case())
            .unwrap_or_else(|| text.to_string())
    }
}

/// Returns every label untranslated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Translator for Passthrough {
    fn lookup(&self, _namespace: &str, _key: &str) -> Option<String> {
        None
    }
}

/// In-memory translation table keyed by `namespace -> key -> line`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    namespaces: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn insert(&mut self, namespace: &str, key: &str, line: &str) {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), line.to_string());
    }

    pub fn with(mut self, key: &str, line: &str) -> Self {
        self.insert(DEFAULT_NAMESPACE, key, line);
        self
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Translator for Catalog {
    fn lookup(&self, namespace: &str, key: &str) -> Option<String> {
        self.namespaces.get(namespace)?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_raw_text() {
        let catalog = Catalog::new().with("count", "Count");
        assert_eq!(catalog.translate("count"), "Count");
        assert_eq!(catalog.translate("Feb"), "Feb");
        assert_eq!(Passthrough.translate("count"), "count");
    }

    #[test]
    fn keys_are_snake_cased() {
        let catalog = Catalog::new()
            .with("user_report", "Users")
            .with("jan", "January");
        assert_eq!(catalog.translate("userReport"), "Users");
        assert_eq!(catalog.translate("Jan"), "January");
    }

    #[test]
    fn empty_text_renders_placeholder() {
        assert_eq!(Passthrough.translate(""), EMPTY_LABEL);
    }

    #[test]
    fn namespaces_are_isolated() {
        let mut catalog = Catalog::new();
        catalog.insert("admin", "count", "Total");
        assert_eq!(catalog.translate("count"), "count");
        assert_eq!(catalog.translate_in("count", "admin"), "Total");
        assert_eq!(catalog.len(), 1);
    }
}
