//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - reads the input file and resolves its column layout
//! - runs the load -> filter -> aggregate/detect/export pipeline
//! - prints reports and writes exports

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::info;

use crate::analysis::{DetectorConfig, cross_tab};
use crate::cli::{AggregateArgs, Command, DemoArgs, ExportArgs, FilterArgs, GroupAxis, InputArgs, ViewArgs};
use crate::data::{DemoConfig, generate_demo_csv};
use crate::domain::{DateRange, Dimension, FilterSpec, MarginRange};
use crate::error::AppError;
use crate::io::export::{ExportOptions, write_export};
use crate::io::ingest::LoadOptions;
use crate::io::schema::SchemaMapping;
use crate::report;

pub mod pipeline;

use pipeline::{FilteredView, PipelineConfig, Session};

/// Entry point for the `sales` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    crate::logging::init();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Summary(args) => handle_summary(args),
        Command::Aggregate(args) => handle_aggregate(args),
        Command::Detect(args) => handle_detect(args),
        Command::Export(args) => handle_export(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_summary(args: ViewArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.input, &args.filter, args.top)?;
    let bytes = read_input(&config.csv_path)?;
    let run = pipeline::run_summary(&config, &bytes)?;

    eprint!("{}", report::format_load_report(&run.report));
    println!("{}", report::format_summary(&run.summary));
    println!("{}", report::format_time_series(&run.series, config.filter.granularity));
    println!(
        "{}",
        report::format_groups("Top product types by sales", Dimension::ProductType, &run.top)
    );
    println!(
        "{}",
        report::format_groups("Bottom product types by sales", Dimension::ProductType, &run.bottom)
    );
    println!("{}", report::format_filter_choices(&run.choices));
    Ok(())
}

fn handle_aggregate(args: AggregateArgs) -> Result<(), AppError> {
    check_aggregate_args(&args)?;
    let config = pipeline_config_from_args(&args.input, &args.filter, 0)?;
    let view = load_view(&config)?;

    let text = match (args.by.dimension(), args.columns) {
        (None, _) => report::format_time_series(&view.time_series(), config.filter.granularity),
        (Some(rows), Some(columns)) => report::format_cross_tab(&cross_tab(&view.dataset, rows, columns)),
        (Some(dimension), None) => {
            let title = format!("Sales by {}", dimension.display_name().to_lowercase());
            report::format_groups(&title, dimension, &view.group_by(dimension))
        }
    };
    println!("{text}");
    Ok(())
}

fn handle_detect(args: ViewArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.input, &args.filter, args.top)?;
    let view = load_view(&config)?;
    let detection = view.detect(&config.detector);
    println!("{}", report::format_detection(&detection, config.top_n));
    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    let config = pipeline_config_from_args(&args.input, &args.filter, 0)?;
    let view = load_view(&config)?;

    let options = ExportOptions {
        schema: config.load.schema.clone(),
        decimal: config.load.decimal,
        delimiter: config.load.delimiter,
        ..ExportOptions::default()
    };
    let bytes = view.export(args.format, &options)?;
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(format!("sales_export.{}", args.format.extension())));
    write_export(&out, &bytes)?;

    println!("Wrote {} rows to {}", view.dataset.len(), out.display());
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = DemoConfig {
        rows: args.rows,
        seed: args.seed,
        start: args.start,
        days: args.days,
        schema: args.schema.mapping(),
        decimal: args.decimal,
        clearance_prob: args.clearance_prob,
    };
    let bytes = generate_demo_csv(&config)?;
    write_export(&args.out, &bytes)?;
    info!(rows = config.rows, seed = config.seed, "Generated demo file");
    println!("Wrote {} demo rows to {}", config.rows, args.out.display());
    Ok(())
}

/// A cross-tab needs a categorical `--by`; the time axis has no column split.
fn check_aggregate_args(args: &AggregateArgs) -> Result<(), AppError> {
    if args.by == GroupAxis::Time && args.columns.is_some() {
        return Err(AppError::new(2, "--columns cannot be combined with --by time."));
    }
    Ok(())
}

/// Load the configured file and apply the configured filters.
fn load_view(config: &PipelineConfig) -> Result<FilteredView, AppError> {
    let bytes = read_input(&config.csv_path)?;
    let mut session = Session::with_options(config.load.clone());
    let loaded = session.load(&bytes)?;
    eprint!("{}", report::format_load_report(&loaded.report));
    session.apply(&config.filter)
}

fn read_input(path: &Path) -> Result<Vec<u8>, AppError> {
    std::fs::read(path).map_err(|e| AppError::new(2, format!("Failed to read '{}': {e}", path.display())))
}

pub fn pipeline_config_from_args(
    input: &InputArgs,
    filter: &FilterArgs,
    top_n: usize,
) -> Result<PipelineConfig, AppError> {
    Ok(PipelineConfig {
        csv_path: input.file.clone(),
        load: load_options_from_args(input)?,
        filter: filter_spec_from_args(filter),
        detector: DetectorConfig::default(),
        top_n,
    })
}

fn load_options_from_args(input: &InputArgs) -> Result<LoadOptions, AppError> {
    let schema = match &input.schema_file {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                AppError::new(2, format!("Failed to read schema file '{}': {e}", path.display()))
            })?;
            SchemaMapping::from_json_str(&text)?
        }
        None => input.schema.mapping(),
    };
    Ok(LoadOptions {
        schema,
        decimal: input.decimal,
        ..LoadOptions::default()
    })
}

pub fn filter_spec_from_args(args: &FilterArgs) -> FilterSpec {
    let set = |values: &[String]| {
        values
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    };
    FilterSpec {
        product_types: set(&args.product_types),
        product_lines: set(&args.product_lines),
        countries: set(&args.countries),
        ordering_methods: set(&args.ordering_methods),
        date_range: DateRange {
            start: args.from,
            end: args.to,
        },
        margin_range: MarginRange {
            min: args.margin_min,
            max: args.margin_max,
        },
        granularity: args.granularity,
    }
}
