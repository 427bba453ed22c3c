// Configuration-driven report assembly: loads page and chart configuration,
// queries rows, reshapes them into chart-ready categories and series, and
// returns cards, charts and tables for front-end rendering.

pub mod builder;
pub mod chart;
pub mod config;
pub mod date_format;
pub mod demo;
pub mod error;
pub mod loader;
pub mod output;
pub mod query;
pub mod reports;
pub mod response;
pub mod series;
pub mod templates;
pub mod translate;
pub mod types;
pub mod util;

pub use builder::{merge_reports, MixedPlan, ReportBuilder};
pub use chart::{ChartHandler, ChartMode};
pub use config::{ConfigSource, ReportConfig};
pub use date_format::{infer_format, FormatBucket};
pub use error::ReportError;
pub use query::{MemorySource, RowSource, TableQuery};
pub use reports::{generate, ReportContext, ReportDefinition, ReportEnv};
pub use series::{format_pie, format_standard, Formatted, Series};
pub use translate::{Catalog, Passthrough, Translator};
pub use types::{ChartKind, ChartMap, ChartSpec, Filter, PageConfig, ReportOutput, ReportResult, Row, Size};
