//! CSV ingest and normalization.
//!
//! This module turns the raw bytes of a delimited sales file into a validated
//! `Dataset` with derived metrics.
//!
//! Design goals:
//! - **Strict schema** for required columns (every missing column is named)
//! - **Strict values** for numbers and categories (the first bad value aborts the load)
//! - **Tolerant dates** (unparseable dates are kept as `None` and reported)
//! - **Atomic** (an error never comes with a partial dataset)

use std::collections::HashMap;

use csv::StringRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::derive::derive_dataset;
use crate::domain::{Dataset, DecimalSeparator, Field, SaleRecord};
use crate::error::LoadError;
use crate::io::dates::{DateFormat, parse_date_column};
use crate::io::schema::SchemaMapping;

/// How many unparseable dates are echoed back in the report.
const INVALID_DATE_SAMPLES: usize = 5;

/// Parsing conventions for one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    pub schema: SchemaMapping,
    pub decimal: DecimalSeparator,
    pub delimiter: u8,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            schema: SchemaMapping::english(),
            decimal: DecimalSeparator::Dot,
            delimiter: b';',
        }
    }
}

/// A date value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidDate {
    pub line: usize,
    pub raw: String,
}

/// Non-fatal facts about a successful load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub rows: usize,
    pub invalid_dates: usize,
    /// First few unparseable dates (line + raw text).
    pub invalid_date_samples: Vec<InvalidDate>,
    pub date_format: DateFormat,
    /// Header columns not used by the schema (ignored).
    pub extra_columns: Vec<String>,
}

/// Loader output: the dataset plus what was noticed while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub report: LoadReport,
}

/// Fields of one row, minus the date which is parsed column-wide afterwards.
struct PendingRow {
    line: usize,
    date_raw: String,
    product_type: String,
    product_line: String,
    quantity: u64,
    sale_price: f64,
    purchase_cost: f64,
    ordering_method: String,
    country: String,
}

/// Parse, validate and derive metrics for a delimited sales file.
pub fn load_dataset(bytes: &[u8], options: &LoadOptions) -> Result<LoadedDataset, LoadError> {
    options.schema.validate()?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let missing: Vec<String> = options
        .schema
        .columns()
        .into_iter()
        .filter(|name| !header_map.contains_key(name.trim()))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::Schema { missing });
    }

    let columns = ColumnIndex::resolve(&options.schema, &header_map);
    let extra_columns = extra_columns(&headers, &options.schema);

    let mut pending = Vec::new();
    for result in reader.records() {
        let record = result?;
        // Physical line where the record starts (blank lines and multi-line quotes included).
        let line = record.position().map_or(0, |p| p.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }
        pending.push(parse_row(&record, &columns, &options.schema, options.decimal, line)?);
    }

    let raw_dates: Vec<&str> = pending.iter().map(|r| r.date_raw.as_str()).collect();
    let (dates, date_format) = parse_date_column(&raw_dates);

    let mut invalid_dates = 0usize;
    let mut invalid_date_samples = Vec::new();
    let mut records = Vec::with_capacity(pending.len());
    for (row, date) in pending.into_iter().zip(dates) {
        if date.is_none() {
            invalid_dates += 1;
            if invalid_date_samples.len() < INVALID_DATE_SAMPLES {
                invalid_date_samples.push(InvalidDate {
                    line: row.line,
                    raw: row.date_raw.clone(),
                });
            }
        }
        records.push(SaleRecord {
            date,
            date_raw: row.date_raw,
            product_type: row.product_type,
            product_line: row.product_line,
            quantity: row.quantity,
            sale_price: row.sale_price,
            purchase_cost: row.purchase_cost,
            ordering_method: row.ordering_method,
            country: row.country,
        });
    }

    let dataset = derive_dataset(records);
    let report = LoadReport {
        rows: dataset.len(),
        invalid_dates,
        invalid_date_samples,
        date_format,
        extra_columns,
    };

    info!(
        rows = report.rows,
        date_format = %report.date_format,
        "Loaded sales dataset"
    );
    if report.invalid_dates > 0 {
        warn!(
            invalid_dates = report.invalid_dates,
            "Some dates could not be parsed; those rows are excluded from date-based views"
        );
    }

    Ok(LoadedDataset { dataset, report })
}

/// Header position of each canonical field.
struct ColumnIndex {
    positions: [usize; 8],
}

impl ColumnIndex {
    fn resolve(schema: &SchemaMapping, header_map: &HashMap<String, usize>) -> Self {
        let mut positions = [0usize; 8];
        for (slot, field) in positions.iter_mut().zip(Field::ALL) {
            *slot = header_map
                .get(schema.column(field).trim())
                .copied()
                .unwrap_or_default();
        }
        Self { positions }
    }

    fn get(&self, field: Field) -> usize {
        self.positions[field as usize]
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins on duplicate headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet tools often prefix the first header with a UTF-8 BOM.
    name.trim_start_matches('\u{feff}').trim().to_string()
}

fn extra_columns(headers: &StringRecord, schema: &SchemaMapping) -> Vec<String> {
    let known: Vec<&str> = schema.columns().into_iter().map(str::trim).collect();
    headers
        .iter()
        .map(normalize_header_name)
        .filter(|h| !h.is_empty() && !known.contains(&h.as_str()))
        .collect()
}

fn parse_row(
    record: &StringRecord,
    columns: &ColumnIndex,
    schema: &SchemaMapping,
    decimal: DecimalSeparator,
    line: usize,
) -> Result<PendingRow, LoadError> {
    let cell = Cell {
        record,
        columns,
        schema,
        line,
    };

    let quantity = {
        let raw = cell.required(Field::Quantity)?;
        let v = cell.number(Field::Quantity, raw, decimal)?;
        if v.fract() != 0.0 || v > u64::MAX as f64 {
            return Err(cell.invalid(Field::Quantity, raw, "must be a whole number"));
        }
        v as u64
    };
    let sale_price = cell.number(Field::SalePrice, cell.required(Field::SalePrice)?, decimal)?;
    let purchase_cost = cell.number(Field::PurchaseCost, cell.required(Field::PurchaseCost)?, decimal)?;

    Ok(PendingRow {
        line,
        // Dates are tolerant: an empty value is reported, not fatal.
        date_raw: cell.optional(Field::Date).to_string(),
        product_type: cell.required(Field::ProductType)?.to_string(),
        product_line: cell.required(Field::ProductLine)?.to_string(),
        quantity,
        sale_price,
        purchase_cost,
        ordering_method: cell.required(Field::OrderingMethod)?.to_string(),
        country: cell.required(Field::Country)?.to_string(),
    })
}

/// Field accessor for one CSV record, producing line-aware errors.
struct Cell<'a> {
    record: &'a StringRecord,
    columns: &'a ColumnIndex,
    schema: &'a SchemaMapping,
    line: usize,
}

impl<'a> Cell<'a> {
    fn optional(&self, field: Field) -> &'a str {
        self.record
            .get(self.columns.get(field))
            .map(str::trim)
            .unwrap_or_default()
    }

    fn required(&self, field: Field) -> Result<&'a str, LoadError> {
        let value = self.optional(field);
        if value.is_empty() {
            return Err(LoadError::MissingValue {
                line: self.line,
                column: self.schema.column(field).to_string(),
            });
        }
        Ok(value)
    }

    /// A finite, non-negative number.
    fn number(&self, field: Field, raw: &str, decimal: DecimalSeparator) -> Result<f64, LoadError> {
        let v = parse_decimal(raw, decimal).ok_or_else(|| self.invalid(field, raw, "not a number"))?;
        if v < 0.0 {
            return Err(self.invalid(field, raw, "must not be negative"));
        }
        Ok(v)
    }

    fn invalid(&self, field: Field, value: &str, reason: &'static str) -> LoadError {
        LoadError::InvalidValue {
            line: self.line,
            column: self.schema.column(field).to_string(),
            value: value.to_string(),
            reason,
        }
    }
}

/// Parse a locale-formatted number.
///
/// The grouping separator (the other of `.`/`,`) is accepted only in
/// well-formed three-digit groups, so `1,5` is never silently read as `15`.
pub fn parse_decimal(raw: &str, decimal: DecimalSeparator) -> Option<f64> {
    let s = raw.trim();
    let (dec, group) = match decimal {
        DecimalSeparator::Dot => ('.', ','),
        DecimalSeparator::Comma => (',', '.'),
    };

    let (int_part, frac_part) = match s.split_once(dec) {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };

    let int_part = if int_part.contains(group) {
        strip_grouping(int_part, group)?
    } else {
        int_part.to_string()
    };

    let normalized = match frac_part {
        Some(f) => format!("{int_part}.{f}"),
        None => int_part,
    };
    let v = normalized.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn strip_grouping(int_part: &str, group: char) -> Option<String> {
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut parts = digits.split(group);
    let head = parts.next()?;
    if head.is_empty() || head.len() > 3 || !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut out = format!("{sign}{head}");
    for part in parts {
        if part.len() != 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        out.push_str(part);
    }
    Some(out)
}
