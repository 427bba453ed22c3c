// Entry point and high-level CLI flow.
//
// - Loads every CSV in the data directory as a table.
// - Loads page/chart configuration (or falls back to the sample `user`
//   configuration) and an optional translation catalog.
// - Builds the requested report, prints a preview and writes the JSON
//   payload the front end consumes.
use clap::Parser;
use report_builder::loader::{load_catalog, load_config, load_data_dir};
use report_builder::output::{preview_report, write_json};
use report_builder::types::{AdvancedFilter, Types};
use report_builder::util::{cell_value, format_int};
use report_builder::{demo, Catalog, Filter, Passthrough, ReportBuilder, ReportEnv, Translator};
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "report_builder")]
#[command(about = "Build card/chart/table report payloads from CSV tables")]
#[command(version)]
struct Args {
    /// Directory of CSV files; each file becomes a table named after it
    #[arg(short, long, default_value = "data")]
    data: PathBuf,

    /// Page/chart configuration (JSON). Defaults to the sample `user` pages
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Translation catalog (JSON: namespace -> key -> line)
    #[arg(short, long)]
    lang: Option<PathBuf>,

    /// Page to build
    #[arg(short, long, default_value = "user")]
    page: String,

    /// Chart keys to build: comma separated, or "all"
    #[arg(short, long)]
    types: Option<String>,

    /// Start date (YYYY-MM-DD); enables date filtering
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD); enables date filtering
    #[arg(long)]
    end: Option<String>,

    /// Column the date filter applies to
    #[arg(long, default_value = "created_at")]
    date_column: String,

    /// Chart template set
    #[arg(long)]
    prefer_chart: Option<String>,

    /// Advanced filter `key=value[,value...]` (repeatable)
    #[arg(short, long, value_parser = parse_advanced)]
    advanced: Vec<AdvancedFilter>,

    /// Where to write the JSON payload
    #[arg(short, long, default_value = "report.json")]
    out: String,

    /// Table rows shown in the console preview
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_advanced(raw: &str) -> Result<AdvancedFilter, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    let values: Vec<Value> = value.split(',').map(cell_value).collect();
    let value = match <[Value; 1]>::try_from(values) {
        Ok([single]) => single,
        Err(many) => Value::Array(many),
    };
    Ok(AdvancedFilter {
        key: key.trim().to_string(),
        value,
    })
}

fn build_filter(args: &Args) -> Filter {
    let mut filter = Filter::for_page(&args.page);
    filter.date_column = args.date_column.clone();
    filter.types = args.types.clone().map(Types::Text);
    filter.start = args.start.clone();
    filter.end = args.end.clone();
    filter.apply_date = args.start.is_some() || args.end.is_some();
    filter.advanced = args.advanced.clone();
    filter.prefer_chart = args.prefer_chart.clone();
    filter
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let (source, load_report) = load_data_dir(&args.data)?;
    println!(
        "Loaded {} rows from {} tables.",
        format_int(load_report.total_rows),
        format_int(load_report.tables)
    );
    if load_report.parse_errors > 0 {
        println!(
            "Note: {} records skipped due to parse errors.",
            format_int(load_report.parse_errors)
        );
    }

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => demo::demo_config(),
    };
    let catalog: Option<Catalog> = args.lang.as_deref().map(load_catalog).transpose()?;
    let translator: &dyn Translator = match &catalog {
        Some(c) => c,
        None => &Passthrough,
    };

    let env = ReportEnv {
        config: &config,
        translator,
        source: &source,
    };
    let builder = ReportBuilder::new(env).with(demo::user_report());

    let filter = build_filter(&args);
    info!(page = %args.page, "building report");
    let output = builder.response(&filter)?;

    println!();
    preview_report(&output.report, args.preview_rows);
    write_json(&args.out, &output)?;
    println!("(Full payload exported to {})", args.out);
    Ok(())
}
