// Report orchestration for a single page: resolve the requested chart keys,
// run each key's producer, and classify the results into cards, charts and
// tables.

use crate::chart::{ChartHandler, ChartMode};
use crate::config::ConfigSource;
use crate::date_format::{infer_format, FormatBucket};
use crate::error::ReportError;
use crate::query::{RowSource, TableQuery};
use crate::response::{ResponseShaper, SpecLookup};
use crate::templates::DEFAULT_TEMPLATE_SET;
use crate::translate::Translator;
use crate::types::{ChartKind, Filter, PageConfig, ReportOutput, ReportResult, Row, Types};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Title used when a page has no title of its own.
pub const DEFAULT_TITLE: &str = "report";

/// Produces the payload of one chart key.
pub type Producer = Box<dyn Fn(&ReportContext<'_>) -> Result<Value, ReportError> + Send + Sync>;

type Gate = Box<dyn Fn(&Filter) -> bool + Send + Sync>;

/// External collaborators a report runs against.
#[derive(Clone, Copy)]
pub struct ReportEnv<'a> {
    pub config: &'a dyn ConfigSource,
    pub translator: &'a dyn Translator,
    pub source: &'a dyn RowSource,
}

/// A page's producers, registered explicitly per chart key.
pub struct ReportDefinition {
    page: String,
    producers: HashMap<String, Producer>,
    gate: Option<Gate>,
}

impl fmt::Debug for ReportDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.producers.keys().collect();
        keys.sort();
        f.debug_struct("ReportDefinition")
            .field("page", &self.page)
            .field("producers", &keys)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}

impl ReportDefinition {
    pub fn new(page: &str) -> Self {
        ReportDefinition {
            page: page.to_string(),
            producers: HashMap::new(),
            gate: None,
        }
    }

    pub fn producer<F>(mut self, key: &str, f: F) -> Self
    where
        F: Fn(&ReportContext<'_>) -> Result<Value, ReportError> + Send + Sync + 'static,
    {
        self.producers.insert(key.to_string(), Box::new(f));
        self
    }

    /// Disable the report for filters the gate rejects.
    pub fn enabled_when<F>(mut self, gate: F) -> Self
    where
        F: Fn(&Filter) -> bool + Send + Sync + 'static,
    {
        self.gate = Some(Box::new(gate));
        self
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn is_enabled(&self, filter: &Filter) -> bool {
        self.gate.as_ref().map_or(true, |gate| gate(filter))
    }

    pub fn has_producer(&self, key: &str) -> bool {
        self.producers.contains_key(key)
    }

    /// Configured keys with no registered producer.
    pub fn missing_producers(&self, config: &PageConfig) -> Vec<String> {
        config
            .charts
            .keys()
            .filter(|k| !self.has_producer(k))
            .map(str::to_string)
            .collect()
    }
}

/// What a producer sees while building the payload of one key.
pub struct ReportContext<'a> {
    key: &'a str,
    filter: &'a Filter,
    env: ReportEnv<'a>,
    shaper: ResponseShaper<'a>,
    charts: &'a ChartHandler<'a>,
}

impl<'a> ReportContext<'a> {
    pub fn key(&self) -> &str {
        self.key
    }

    pub fn filter(&self) -> &Filter {
        self.filter
    }

    /// Declared type of the current key (mixed override first).
    pub fn kind(&self) -> Option<&ChartKind> {
        self.shaper.lookup().kind(self.key)
    }

    pub fn translate(&self, text: &str) -> String {
        self.env.translator.translate(text)
    }

    /// Query of `table` carrying the request's date and advanced filters.
    pub fn query(&self, table: &str) -> TableQuery {
        TableQuery::from_filter(table, self.filter)
    }

    pub fn rows(&self, table: &str) -> Result<Vec<Row>, ReportError> {
        self.env.source.query_rows(&self.query(table))
    }

    /// Display bucket for the span of `table`'s date column within the
    /// request's filters.
    pub fn guess_date_format(&self, table: &str) -> Result<FormatBucket, ReportError> {
        let (min, max) = self.env.source.date_bounds(&self.query(table))?;
        Ok(infer_format(min, max))
    }

    /// Rows shaped for the current key: passed through for tables, otherwise
    /// assembled for every configured chart type.
    pub fn chart_response(&self, group_by: &str, rows: Vec<Row>) -> Result<Value, ReportError> {
        let mode = if self.kind() == Some(&ChartKind::Table) {
            ChartMode::Table
        } else {
            ChartMode::All
        };
        self.chart_response_as(group_by, rows, &mode)
    }

    pub fn chart_response_as(
        &self,
        group_by: &str,
        rows: Vec<Row>,
        mode: &ChartMode,
    ) -> Result<Value, ReportError> {
        let data = self.charts.resolve(group_by, rows, mode)?;
        Ok(self.shaper.shape(self.key, data))
    }

    pub fn card_response(&self, cards: Row) -> Value {
        self.shaper.cards(self.key, cards)
    }

    /// Shape an arbitrary payload for the current key.
    pub fn response(&self, payload: Value) -> Value {
        self.shaper.shape(self.key, payload)
    }
}

/// Run `definition` for the page named by `filter`.
///
/// Invalid input and missing page configuration are errors. Anything that
/// goes wrong for an individual key only empties that key's contribution.
pub fn generate(
    definition: &ReportDefinition,
    filter: &Filter,
    env: ReportEnv<'_>,
) -> Result<ReportOutput, ReportError> {
    let page = filter
        .page_name()
        .ok_or_else(|| ReportError::InvalidInput("missing required filter key: page".into()))?;
    let config = env
        .config
        .page_config(page)
        .ok_or_else(|| ReportError::ConfigurationNotFound(format!("page `{}`", page)))?;

    let lookup = SpecLookup::new(&config.charts, filter.mixed_page.as_ref());
    let template_set = filter.prefer_chart.as_deref().unwrap_or(DEFAULT_TEMPLATE_SET);
    let charts = ChartHandler::new(env.config.chart_templates(template_set), env.translator);

    let title = env.translator.translate(&format!("{}_report", page));
    let mut report = ReportResult::new(if title.is_empty() { DEFAULT_TITLE } else { &title }, page);

    let keys = Types::resolve(filter.types.as_ref(), &config.charts);
    info!(page, keys = keys.len(), "generating report");

    for key in &keys {
        let kind = lookup.kind(key).cloned();
        let contribution = match definition.producers.get(key.as_str()) {
            None => {
                warn!(page, key = %key, "no producer registered; contributing nothing");
                None
            }
            Some(produce) => {
                let ctx = ReportContext {
                    key,
                    filter,
                    env,
                    shaper: ResponseShaper::new(lookup, env.translator),
                    charts: &charts,
                };
                match produce(&ctx) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        warn!(page, key = %key, error = %err, "producer failed; contributing nothing");
                        None
                    }
                }
            }
        };

        match kind {
            Some(ChartKind::Card) => {
                let cards = report.cards.get_or_insert_with(Row::new);
                match contribution {
                    Some(Value::Object(map)) => cards.extend(map),
                    Some(other) => {
                        cards.insert(key.clone(), other);
                    }
                    None => {}
                }
            }
            Some(ChartKind::Table) => report.tables.extend(contribution),
            _ => report.charts.extend(contribution),
        }
        debug!(page, key = %key, kind = ?kind, "classified contribution");
    }

    Ok(ReportOutput {
        report,
        filter: filter.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::query::MemorySource;
    use crate::translate::{Catalog, Passthrough};
    use crate::types::{ChartMap, ChartSpec, Size};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user_config() -> ReportConfig {
        ReportConfig::new().with_page(
            "user",
            PageConfig::page(
                ChartMap::new()
                    .with("cards", ChartSpec::of_kind(ChartKind::Card))
                    .with("by_month", ChartSpec::of_kind(ChartKind::Spline))
                    .with("users", ChartSpec::of_kind(ChartKind::Table))
                    .with("broken", ChartSpec::of_kind(ChartKind::Line)),
            ),
        )
    }

    fn source() -> MemorySource {
        let rows = json!([
            {"month": "Jan", "count": 5},
            {"month": "Feb", "count": 7}
        ]);
        MemorySource::new().with_table(
            "stats",
            rows.as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_object().cloned().unwrap())
                .collect(),
        )
    }

    fn definition() -> ReportDefinition {
        ReportDefinition::new("user")
            .producer("cards", |ctx| {
                let mut cards = Row::new();
                cards.insert("total".into(), json!(12));
                Ok(ctx.card_response(cards))
            })
            .producer("by_month", |ctx| {
                let rows = ctx.rows("stats")?;
                ctx.chart_response("month", rows)
            })
            .producer("users", |ctx| {
                let rows = ctx.rows("stats")?;
                ctx.chart_response("month", rows)
            })
            .producer("broken", |ctx| {
                let rows = ctx.rows("no_such_table")?;
                ctx.chart_response("month", rows)
            })
    }

    #[test]
    fn classifies_every_key_and_isolates_failures() {
        let config = user_config();
        let source = source();
        let catalog = Catalog::new().with("user_report", "Users");
        let env = ReportEnv { config: &config, translator: &catalog, source: &source };
        let filter = Filter::for_page("user");

        let out = generate(&definition(), &filter, env).unwrap();
        let report = out.report;

        assert_eq!(report.title, "Users");
        assert_eq!(report.page, "user");
        let cards = report.cards.unwrap();
        assert_eq!(cards["data"][0]["value"], json!(12));
        assert_eq!(report.charts.len(), 1);
        assert_eq!(report.charts[0]["type"], "spline");
        assert_eq!(report.charts[0]["data"]["spline"]["xAxis"]["categories"], json!(["Jan", "Feb"]));
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0]["columns"][1], json!({"title": "count", "key": "count"}));
        assert_eq!(out.filter, filter);
    }

    #[test]
    fn explicit_types_limit_the_keys() {
        let config = user_config();
        let source = source();
        let env = ReportEnv { config: &config, translator: &Passthrough, source: &source };
        let filter = Filter::for_page("user").with_types(["by_month"]);

        let report = generate(&definition(), &filter, env).unwrap().report;
        assert!(report.cards.is_none());
        assert!(report.tables.is_empty());
        assert_eq!(report.charts.len(), 1);
        assert_eq!(report.title, "user_report");
    }

    #[test]
    fn missing_card_producer_leaves_empty_cards() {
        let config = user_config();
        let source = source();
        let env = ReportEnv { config: &config, translator: &Passthrough, source: &source };
        let filter = Filter::for_page("user").with_types(["cards"]);

        let report = generate(&ReportDefinition::new("user"), &filter, env).unwrap().report;
        assert_eq!(report.cards, Some(Row::new()));
        assert!(report.charts.is_empty());
    }

    #[test]
    fn unknown_keys_land_in_charts_when_produced() {
        let config = user_config();
        let source = source();
        let env = ReportEnv { config: &config, translator: &Passthrough, source: &source };
        let filter = Filter::for_page("user").with_types(["extra"]);
        let def = ReportDefinition::new("user").producer("extra", |ctx| Ok(ctx.response(json!([1]))));

        let report = generate(&def, &filter, env).unwrap().report;
        assert_eq!(report.charts.len(), 1);
        assert_eq!(report.charts[0]["size"], json!(Size::chart_default()));
    }

    #[test]
    fn mixed_override_changes_classification() {
        let config = user_config();
        let source = source();
        let env = ReportEnv { config: &config, translator: &Passthrough, source: &source };
        let mut filter = Filter::for_page("user").with_types(["by_month"]);
        filter.mixed_page = Some(ChartMap::new().with("by_month", ChartSpec::of_kind(ChartKind::Table)));

        let report = generate(&definition(), &filter, env).unwrap().report;
        assert!(report.charts.is_empty());
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0]["data"], json!([{"month": "Jan", "count": 5}, {"month": "Feb", "count": 7}]));
    }

    #[test]
    fn producer_errors_only_drop_their_key() {
        let config = user_config();
        let source = source();
        let env = ReportEnv { config: &config, translator: &Passthrough, source: &source };
        let filter = Filter::for_page("user").with_types(["cards", "by_month"]);
        let def = definition().producer("cards", |ctx| Err(ReportError::producer(ctx.key(), "no data")));

        let report = generate(&def, &filter, env).unwrap().report;
        assert_eq!(report.cards, Some(Row::new()));
        assert_eq!(report.charts.len(), 1);
        assert_eq!(
            ReportError::producer("cards", "no data").to_string(),
            "producer for `cards` failed: no data"
        );
    }

    #[test]
    fn rejects_missing_page_and_unknown_config() {
        let config = user_config();
        let source = source();
        let env = ReportEnv { config: &config, translator: &Passthrough, source: &source };

        let err = generate(&definition(), &Filter::default(), env).unwrap_err();
        assert!(matches!(err, ReportError::InvalidInput(_)));

        let err = generate(&definition(), &Filter::for_page("sales"), env).unwrap_err();
        assert!(matches!(err, ReportError::ConfigurationNotFound(_)));
    }

    #[test]
    fn reports_missing_producers() {
        let config = user_config();
        let def = ReportDefinition::new("user").producer("cards", |ctx| Ok(ctx.card_response(Row::new())));
        let page = config.page_config("user").unwrap();
        assert_eq!(def.missing_producers(page), vec!["by_month", "users", "broken"]);
        assert!(def.is_enabled(&Filter::default()));
        let gated = def.enabled_when(|f| f.extra.contains_key("admin"));
        assert!(!gated.is_enabled(&Filter::default()));
    }
}
