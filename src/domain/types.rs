//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built once per uploaded file by the loader
//! - filtered/aggregated in-memory without re-parsing
//! - exported back to CSV/JSON/spreadsheet

use std::collections::BTreeSet;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::analysis::derive::derive_metrics;

/// Canonical fields every sales file must provide (under some column name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    ProductType,
    ProductLine,
    Quantity,
    SalePrice,
    PurchaseCost,
    OrderingMethod,
    Country,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Date,
        Field::ProductType,
        Field::ProductLine,
        Field::Quantity,
        Field::SalePrice,
        Field::PurchaseCost,
        Field::OrderingMethod,
        Field::Country,
    ];

    /// Stable snake_case key (used by schema files and JSON export).
    pub fn key(self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::ProductType => "product_type",
            Field::ProductLine => "product_line",
            Field::Quantity => "quantity",
            Field::SalePrice => "sale_price",
            Field::PurchaseCost => "purchase_cost",
            Field::OrderingMethod => "ordering_method",
            Field::Country => "country",
        }
    }
}

/// Decimal separator used by numeric columns of the input (and CSV export).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    /// `1234.5` (a `,` is accepted as thousands separator when a `.` is present).
    #[default]
    Dot,
    /// `1234,5` (a `.` is accepted as thousands separator when a `,` is present).
    Comma,
}

impl DecimalSeparator {
    pub fn as_char(self) -> char {
        match self {
            DecimalSeparator::Dot => '.',
            DecimalSeparator::Comma => ',',
        }
    }
}

/// Time-bucketing resolution for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
}

/// Categorical dimensions a dataset can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Country,
    ProductType,
    ProductLine,
    OrderingMethod,
}

impl Dimension {
    pub fn value(self, record: &SaleRecord) -> &str {
        match self {
            Dimension::Country => &record.country,
            Dimension::ProductType => &record.product_type,
            Dimension::ProductLine => &record.product_line,
            Dimension::OrderingMethod => &record.ordering_method,
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            Dimension::Country => "Country",
            Dimension::ProductType => "Product type",
            Dimension::ProductLine => "Product line",
            Dimension::OrderingMethod => "Ordering method",
        }
    }
}

/// Export target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }
}

/// One transactional row, exactly as parsed from the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRecord {
    /// `None` when the raw text could not be parsed as a date.
    pub date: Option<NaiveDate>,
    /// Original date text (kept so invalid dates survive an export).
    #[serde(skip)]
    pub date_raw: String,
    pub product_type: String,
    pub product_line: String,
    pub quantity: u64,
    pub sale_price: f64,
    pub purchase_cost: f64,
    pub ordering_method: String,
    pub country: String,
}

/// Row-level financial fields derived from a `SaleRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Metrics {
    pub total_sales: f64,
    pub total_cost: f64,
    pub profit: f64,
    pub margin_pct: f64,
    pub roi_pct: f64,
}

/// A record together with its derived metrics.
///
/// The metrics are private to the row: the only way to change the inputs is
/// through `Row::update`, which recomputes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    record: SaleRecord,
    metrics: Metrics,
}

impl Row {
    pub fn new(record: SaleRecord) -> Self {
        let metrics = derive_metrics(&record);
        Self { record, metrics }
    }

    pub fn record(&self) -> &SaleRecord {
        &self.record
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Return a copy with modified inputs and freshly derived metrics.
    pub fn update(&self, f: impl FnOnce(&mut SaleRecord)) -> Row {
        let mut record = self.record.clone();
        f(&mut record);
        Row::new(record)
    }
}

/// An ordered collection of rows sharing one schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct values of a dimension, sorted (for building filter choices).
    pub fn distinct(&self, dimension: Dimension) -> Vec<String> {
        let set: BTreeSet<&str> = self.rows.iter().map(|r| dimension.value(r.record())).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Earliest and latest valid dates, if any.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.rows.iter().filter_map(|r| r.record().date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Inclusive calendar date range. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|s| date >= s) && self.end.is_none_or(|e| date <= e)
    }
}

/// Inclusive margin % range. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MarginRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MarginRange {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, margin_pct: f64) -> bool {
        self.min.is_none_or(|m| margin_pct >= m) && self.max.is_none_or(|m| margin_pct <= m)
    }
}

/// User-selected predicates, combined with AND.
///
/// An empty selection set means "no restriction" for that dimension.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub product_types: BTreeSet<String>,
    pub product_lines: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub ordering_methods: BTreeSet<String>,
    pub date_range: DateRange,
    pub margin_range: MarginRange,
    /// Time bucketing used when the view is aggregated over time.
    pub granularity: Granularity,
}

impl FilterSpec {
    pub fn selection(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::Country => &self.countries,
            Dimension::ProductType => &self.product_types,
            Dimension::ProductLine => &self.product_lines,
            Dimension::OrderingMethod => &self.ordering_methods,
        }
    }
}
