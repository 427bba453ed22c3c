use crate::templates::ChartTemplates;
use crate::types::PageConfig;
use serde::Deserialize;
use std::collections::HashMap;

/// Where page configuration and chart templates come from.
pub trait ConfigSource {
    fn page_config(&self, page: &str) -> Option<&PageConfig>;

    /// Template set by name; `None` when the set is not configured.
    fn chart_templates(&self, set: &str) -> Option<&ChartTemplates>;
}

/// Configuration document:
/// `{ "pages": { <page>: PageConfig }, "charts": { <set>: { <type>: template } } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub pages: HashMap<String, PageConfig>,
    #[serde(default)]
    pub charts: HashMap<String, ChartTemplates>,
}

impl ReportConfig {
    pub fn new() -> Self {
        ReportConfig::default()
    }

    pub fn with_page(mut self, page: &str, config: PageConfig) -> Self {
        self.pages.insert(page.to_string(), config);
        self
    }

    pub fn with_templates(mut self, set: &str, templates: ChartTemplates) -> Self {
        self.charts.insert(set.to_string(), templates);
        self
    }
}

impl ConfigSource for ReportConfig {
    fn page_config(&self, page: &str) -> Option<&PageConfig> {
        self.pages.get(page)
    }

    fn chart_templates(&self, set: &str) -> Option<&ChartTemplates> {
        self.charts.get(set)
    }
}
