// Entry point: validates the request, then runs either a single page report
// or a mixed report that merges several pages' keys into one payload.

use crate::error::ReportError;
use crate::reports::{generate, ReportDefinition, ReportEnv};
use crate::types::{ChartMap, Filter, MixedEntry, PageConfig, PageKind, ReportOutput, ReportResult, Types};
use std::collections::HashMap;
use tracing::{info, warn};

/// How a mixed page fans out: the keys requested from each sub-page, in
/// first-seen order, and the inline overrides keyed by chart key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixedPlan {
    pub pages: Vec<(String, Vec<String>)>,
    pub overrides: ChartMap,
}

impl MixedPlan {
    pub fn from_entries(entries: &[MixedEntry]) -> Self {
        let mut plan = MixedPlan::default();
        for entry in entries {
            match plan.pages.iter_mut().find(|(page, _)| *page == entry.page) {
                Some((_, keys)) => keys.push(entry.key.clone()),
                None => plan.pages.push((entry.page.clone(), vec![entry.key.clone()])),
            }
            if let Some(spec) = &entry.spec {
                plan.overrides.insert(&entry.key, spec.clone());
            }
        }
        plan
    }

    /// The filter a sub-page runs with: the outer filter narrowed to the
    /// sub-page's keys and carrying the override map.
    pub fn sub_filter(&self, outer: &Filter, page: &str, keys: &[String]) -> Filter {
        let mut filter = outer.clone();
        filter.page = Some(page.to_string());
        filter.types = Some(Types::List(keys.to_vec()));
        filter.mixed_page = (!self.overrides.is_empty()).then(|| self.overrides.clone());
        filter
    }
}

/// Fold sub-reports into `base` in order.
pub fn merge_reports<I>(base: ReportResult, reports: I) -> ReportResult
where
    I: IntoIterator<Item = ReportResult>,
{
    reports.into_iter().fold(base, |mut acc, report| {
        acc.absorb(report);
        acc
    })
}

pub struct ReportBuilder<'a> {
    env: ReportEnv<'a>,
    reports: HashMap<String, ReportDefinition>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(env: ReportEnv<'a>) -> Self {
        ReportBuilder {
            env,
            reports: HashMap::new(),
        }
    }

    /// Register a page's report. Configured keys without a producer are
    /// logged here; at request time they contribute nothing.
    pub fn register(&mut self, definition: ReportDefinition) {
        match self.env.config.page_config(definition.page()) {
            Some(config) => {
                let missing = definition.missing_producers(config);
                if !missing.is_empty() {
                    warn!(page = definition.page(), missing = ?missing, "configured keys without producers");
                }
            }
            None => warn!(page = definition.page(), "report registered for an unconfigured page"),
        }
        self.reports.insert(definition.page().to_string(), definition);
    }

    pub fn with(mut self, definition: ReportDefinition) -> Self {
        self.register(definition);
        self
    }

    /// Build the report the filter asks for.
    pub fn response(&self, filter: &Filter) -> Result<ReportOutput, ReportError> {
        let page = filter
            .page_name()
            .ok_or_else(|| ReportError::InvalidInput("missing required filter key: page".into()))?;
        let config = self
            .env
            .config
            .page_config(page)
            .ok_or_else(|| ReportError::ConfigurationNotFound(format!("page `{}`", page)))?;

        match config.kind {
            PageKind::Mixed => Ok(self.merge_mixed(page, config, filter)),
            PageKind::Page => self.resolve(filter),
        }
    }

    /// Run one page's report. A disabled report is `AccessDenied`.
    pub fn resolve(&self, filter: &Filter) -> Result<ReportOutput, ReportError> {
        let page = filter
            .page_name()
            .ok_or_else(|| ReportError::InvalidInput("missing required filter key: page".into()))?;
        let definition = self
            .reports
            .get(page)
            .ok_or_else(|| ReportError::ConfigurationNotFound(format!("report for page `{}`", page)))?;
        if !definition.is_enabled(filter) {
            return Err(ReportError::AccessDenied(page.to_string()));
        }
        generate(definition, filter, self.env)
    }

    /// Run every sub-page of a mixed page and merge the results. A sub-page
    /// that fails for any reason contributes nothing.
    pub fn merge_mixed(&self, page: &str, config: &PageConfig, filter: &Filter) -> ReportOutput {
        let plan = MixedPlan::from_entries(&config.entries);
        info!(page, subpages = plan.pages.len(), "generating mixed report");

        let reports = plan.pages.iter().map(|(sub_page, keys)| {
            let sub_filter = plan.sub_filter(filter, sub_page, keys);
            match self.resolve(&sub_filter) {
                Ok(output) => output.report,
                Err(err) => {
                    warn!(page, sub_page = %sub_page, error = %err, "sub-report failed; contributing nothing");
                    ReportResult::default()
                }
            }
        });

        let title = self.env.translator.translate(&format!("{}_report", page));
        let report = merge_reports(ReportResult::new(&title, page), reports);
        ReportOutput {
            report,
            filter: filter.clone(),
        }
    }
}
