//! Command-line parsing for the sales dashboard.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! loading/aggregation code. Handlers live in `crate::app`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{DecimalSeparator, Dimension, ExportFormat, Granularity};
use crate::io::dates::parse_date_tolerant;
use crate::io::schema::SchemaPreset;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sales", version, about = "Sales analytics over semicolon-separated CSV files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the load report, KPIs, time series and top/bottom product types.
    Summary(ViewArgs),
    /// Print one grouped table (or a cross-tab with `--columns`).
    Aggregate(AggregateArgs),
    /// Print opportunity and anomaly rows for the filtered view.
    Detect(ViewArgs),
    /// Write the filtered view to CSV, XLSX or JSON.
    Export(ExportArgs),
    /// Generate a synthetic sales file.
    Demo(DemoArgs),
}

/// Input file and its conventions.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Semicolon-separated sales file.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub file: PathBuf,

    /// Built-in header layout.
    #[arg(long, env = "SALES_SCHEMA", value_enum, default_value_t = SchemaPreset::English)]
    pub schema: SchemaPreset,

    /// JSON column mapping (overrides `--schema`).
    #[arg(long, env = "SALES_SCHEMA_FILE", value_name = "JSON")]
    pub schema_file: Option<PathBuf>,

    /// Decimal separator of numeric columns.
    #[arg(long, env = "SALES_DECIMAL", value_enum, default_value_t = DecimalSeparator::Dot)]
    pub decimal: DecimalSeparator,
}

/// Row predicates. Repeated values of one flag are OR-ed; flags are AND-ed.
///
/// Values are taken verbatim (category names may contain commas).
#[derive(Debug, Args, Clone, Default)]
pub struct FilterArgs {
    #[arg(long = "product-type")]
    pub product_types: Vec<String>,

    #[arg(long = "product-line")]
    pub product_lines: Vec<String>,

    #[arg(long = "country")]
    pub countries: Vec<String>,

    #[arg(long = "ordering-method")]
    pub ordering_methods: Vec<String>,

    /// First day to include.
    #[arg(long, value_parser = parse_date_arg)]
    pub from: Option<NaiveDate>,

    /// Last day to include.
    #[arg(long, value_parser = parse_date_arg)]
    pub to: Option<NaiveDate>,

    /// Minimum row margin % (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    pub margin_min: Option<f64>,

    /// Maximum row margin % (inclusive).
    #[arg(long, allow_negative_numbers = true)]
    pub margin_max: Option<f64>,

    /// Time-series bucket size.
    #[arg(long, value_enum, default_value_t = Granularity::Month)]
    pub granularity: Granularity,
}

/// Options shared by `summary` and `detect`.
#[derive(Debug, Args, Clone)]
pub struct ViewArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Show top-N groups (and at most N flagged rows per table).
    #[arg(long, default_value_t = 5)]
    pub top: usize,
}

/// Grouping axis for `aggregate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupAxis {
    Time,
    Country,
    ProductType,
    ProductLine,
    OrderingMethod,
}

impl GroupAxis {
    /// `None` for the time axis.
    pub fn dimension(self) -> Option<Dimension> {
        match self {
            GroupAxis::Time => None,
            GroupAxis::Country => Some(Dimension::Country),
            GroupAxis::ProductType => Some(Dimension::ProductType),
            GroupAxis::ProductLine => Some(Dimension::ProductLine),
            GroupAxis::OrderingMethod => Some(Dimension::OrderingMethod),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[arg(long, value_enum, default_value_t = GroupAxis::ProductType)]
    pub by: GroupAxis,

    /// Second dimension; prints a sales cross-tab of `--by` x `--columns`.
    #[arg(long, value_enum)]
    pub columns: Option<Dimension>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Output path (defaults to `sales_export.<ext>`).
    #[arg(short = 'o', long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    #[arg(short = 'n', long, default_value_t = 200)]
    pub rows: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First possible sale date.
    #[arg(long, value_parser = parse_date_arg, default_value = "2024-01-01")]
    pub start: NaiveDate,

    /// Number of days sales are spread over.
    #[arg(long, default_value_t = 365)]
    pub days: u64,

    #[arg(long, env = "SALES_SCHEMA", value_enum, default_value_t = SchemaPreset::English)]
    pub schema: SchemaPreset,

    #[arg(long, env = "SALES_DECIMAL", value_enum, default_value_t = DecimalSeparator::Dot)]
    pub decimal: DecimalSeparator,

    /// Probability of a clearance sale priced below cost.
    #[arg(long, default_value_t = 0.05)]
    pub clearance_prob: f64,

    #[arg(short = 'o', long, default_value = "sales_demo.csv")]
    pub out: PathBuf,
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date_tolerant(value).ok_or_else(|| format!("unrecognized date '{value}' (try YYYY-MM-DD)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_flags_repeat() {
        let cli = Cli::try_parse_from([
            "sales",
            "summary",
            "-f",
            "data.csv",
            "--country",
            "AR",
            "--country",
            "Korea, Republic of",
            "--from",
            "01/02/2024",
            "--margin-min",
            "-10",
        ])
        .unwrap();
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.filter.countries, vec!["AR", "Korea, Republic of"]);
        assert_eq!(args.filter.from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(args.filter.margin_min, Some(-10.0));
        assert_eq!(args.top, 5);
    }

    #[test]
    fn aggregate_axis_parses_kebab_case() {
        let cli = Cli::try_parse_from([
            "sales",
            "aggregate",
            "-f",
            "data.csv",
            "--by",
            "product-line",
            "--columns",
            "country",
        ])
        .unwrap();
        let Command::Aggregate(args) = cli.command else {
            panic!("expected aggregate");
        };
        assert_eq!(args.by.dimension(), Some(Dimension::ProductLine));
        assert_eq!(args.columns, Some(Dimension::Country));
    }

    #[test]
    fn bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["sales", "detect", "-f", "x.csv", "--to", "soon"]).is_err());
    }
}
