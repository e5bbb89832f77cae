//! Export a (filtered) dataset to CSV, spreadsheet or JSON.
//!
//! All formats carry the raw columns (under the schema's column names, in
//! canonical order) followed by the derived metrics. The CSV output uses the
//! loader's conventions so it can be loaded again.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use tracing::info;

use crate::domain::{Dataset, DecimalSeparator, ExportFormat, Row};
use crate::error::{AppError, ExportError};
use crate::io::schema::SchemaMapping;

/// Headers of the derived columns, appended after the raw ones.
pub const DERIVED_COLUMNS: [&str; 5] = ["Total Sales", "Total Cost", "Profit", "Margin %", "ROI %"];

/// Output conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub schema: SchemaMapping,
    pub decimal: DecimalSeparator,
    pub delimiter: u8,
    pub sheet_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            schema: SchemaMapping::english(),
            decimal: DecimalSeparator::Dot,
            delimiter: b';',
            sheet_name: "Sales".to_string(),
        }
    }
}

/// JSON shape of one exported row.
#[derive(Debug, Serialize)]
struct JsonRow<'a> {
    date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_raw: Option<&'a str>,
    product_type: &'a str,
    product_line: &'a str,
    quantity: u64,
    sale_price: f64,
    purchase_cost: f64,
    ordering_method: &'a str,
    country: &'a str,
    total_sales: f64,
    total_cost: f64,
    profit: f64,
    margin_pct: f64,
    roi_pct: f64,
}

impl<'a> From<&'a Row> for JsonRow<'a> {
    fn from(row: &'a Row) -> Self {
        let r = row.record();
        let m = row.metrics();
        Self {
            date: r.date,
            date_raw: r.date.is_none().then_some(r.date_raw.as_str()),
            product_type: &r.product_type,
            product_line: &r.product_line,
            quantity: r.quantity,
            sale_price: r.sale_price,
            purchase_cost: r.purchase_cost,
            ordering_method: &r.ordering_method,
            country: &r.country,
            total_sales: m.total_sales,
            total_cost: m.total_cost,
            profit: m.profit,
            margin_pct: m.margin_pct,
            roi_pct: m.roi_pct,
        }
    }
}

/// Header row shared by CSV and spreadsheet output.
pub fn export_headers(schema: &SchemaMapping) -> Vec<String> {
    schema
        .columns()
        .into_iter()
        .chain(DERIVED_COLUMNS)
        .map(str::to_string)
        .collect()
}

/// Serialize `dataset` in `format`. Never touches the dataset itself.
pub fn export(dataset: &Dataset, format: ExportFormat, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let bytes = match format {
        ExportFormat::Csv => to_csv(dataset, options)?,
        ExportFormat::Xlsx => to_xlsx(dataset, options)?,
        ExportFormat::Json => to_json(dataset)?,
    };
    info!(
        format = format.extension(),
        rows = dataset.len(),
        bytes = bytes.len(),
        "Exported dataset"
    );
    Ok(bytes)
}

/// Delimited text with the configured decimal separator.
pub fn to_csv(dataset: &Dataset, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::new());

    writer.write_record(export_headers(&options.schema))?;
    for row in dataset {
        let r = row.record();
        let m = row.metrics();
        let num = |v: f64| fmt_number(v, options.decimal);
        writer.write_record([
            date_text(row),
            r.product_type.clone(),
            r.product_line.clone(),
            r.quantity.to_string(),
            num(r.sale_price),
            num(r.purchase_cost),
            r.ordering_method.clone(),
            r.country.clone(),
            num(m.total_sales),
            num(m.total_cost),
            num(m.profit),
            num(m.margin_pct),
            num(m.roi_pct),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::CsvBuffer(e.to_string()))
}

/// Single-sheet `.xlsx` with a bold header row.
pub fn to_xlsx(dataset: &Dataset, options: &ExportOptions) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&options.sheet_name)?;

    for (col, header) in export_headers(&options.schema).iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (idx, row) in dataset.iter().enumerate() {
        let line = idx as u32 + 1;
        let r = row.record();
        let m = row.metrics();
        sheet.write_string(line, 0, date_text(row))?;
        sheet.write_string(line, 1, &r.product_type)?;
        sheet.write_string(line, 2, &r.product_line)?;
        sheet.write_number(line, 3, r.quantity as f64)?;
        sheet.write_number(line, 4, r.sale_price)?;
        sheet.write_number(line, 5, r.purchase_cost)?;
        sheet.write_string(line, 6, &r.ordering_method)?;
        sheet.write_string(line, 7, &r.country)?;
        sheet.write_number(line, 8, m.total_sales)?;
        sheet.write_number(line, 9, m.total_cost)?;
        sheet.write_number(line, 10, m.profit)?;
        sheet.write_number(line, 11, m.margin_pct)?;
        sheet.write_number(line, 12, m.roi_pct)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Array of objects, one per row, derived fields included.
pub fn to_json(dataset: &Dataset) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<JsonRow<'_>> = dataset.iter().map(JsonRow::from).collect();
    Ok(serde_json::to_vec_pretty(&rows)?)
}

/// Write exported bytes to `path`.
pub fn write_export(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export file '{}': {e}", path.display())))?;
    file.write_all(bytes)
        .map_err(|e| AppError::new(4, format!("Failed to write export file '{}': {e}", path.display())))?;
    Ok(())
}

/// ISO date when valid, otherwise the original text.
fn date_text(row: &Row) -> String {
    let r = row.record();
    match r.date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => r.date_raw.clone(),
    }
}

fn fmt_number(v: f64, decimal: DecimalSeparator) -> String {
    let text = format!("{v}");
    match decimal {
        DecimalSeparator::Dot => text,
        DecimalSeparator::Comma => text.replace('.', ","),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::filter::apply_filter;
    use crate::domain::FilterSpec;
    use crate::io::ingest::{LoadOptions, load_dataset};

    const DATA: &str = "Date;Product type;Product line;Quantity;Sale price;Purchase cost;Ordering method;Country of sale\n\
        15/01/2024;Tents;Camping;2;10.5;4.25;Web;AR\n\
        16/01/2024;Boots;Hiking;1;99.99;60;Fax;MX\n\
        17/01/2024;Tents;Camping;3;10.5;4.25;Web;AR\n\
        18/02/2024;Stoves;Camping;5;0.1;0.2;Mail;CL\n\
        19/02/2024;Boots;Hiking;0;99.99;60;Web;AR\n\
        20/02/2024;Tents;Camping;4;10.5;4.25;Phone;MX";

    fn loaded() -> Dataset {
        load_dataset(DATA.as_bytes(), &LoadOptions::default()).unwrap().dataset
    }

    fn sales(ds: &Dataset) -> Vec<f64> {
        ds.iter().map(|r| r.metrics().total_sales).collect()
    }

    #[test]
    fn csv_round_trips_through_the_loader() {
        let ds = loaded();
        let spec = FilterSpec {
            countries: ["AR", "MX"].iter().map(|s| s.to_string()).collect(),
            ..FilterSpec::default()
        };
        let filtered = apply_filter(&ds, &spec);
        assert_eq!(filtered.len(), 5);

        let bytes = to_csv(&filtered, &ExportOptions::default()).unwrap();
        let reloaded = load_dataset(&bytes, &LoadOptions::default()).unwrap().dataset;
        assert_eq!(reloaded.len(), filtered.len());
        assert_eq!(sales(&reloaded), sales(&filtered));
        for (a, b) in reloaded.iter().zip(filtered.iter()) {
            assert_eq!(a.record().date, b.record().date);
            assert_eq!(a.record().country, b.record().country);
            assert_eq!(a.metrics(), b.metrics());
        }
    }

    #[test]
    fn comma_csv_round_trips() {
        let ds = loaded();
        let options = ExportOptions {
            decimal: DecimalSeparator::Comma,
            ..ExportOptions::default()
        };
        let bytes = to_csv(&ds, &options).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains(";10,5;4,25;"));

        let load = LoadOptions {
            decimal: DecimalSeparator::Comma,
            ..LoadOptions::default()
        };
        let reloaded = load_dataset(&bytes, &load).unwrap().dataset;
        assert_eq!(sales(&reloaded), sales(&ds));
    }

    #[test]
    fn csv_header_includes_derived_columns() {
        let bytes = to_csv(&Dataset::default(), &ExportOptions::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text.trim_end(),
            "Date;Product type;Product line;Quantity;Sale price;Purchase cost;Ordering method;Country of sale;\
             Total Sales;Total Cost;Profit;Margin %;ROI %"
        );
    }

    #[test]
    fn json_has_one_object_per_row() {
        let ds = loaded();
        let bytes = to_json(&ds).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0]["date"], "2024-01-15");
        assert_eq!(rows[0]["total_sales"], 21.0);
        assert_eq!(rows[0]["country"], "AR");
        assert!(rows[0].get("margin_pct").is_some());
        assert!(rows[0].get("date_raw").is_none());
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = export(&loaded(), ExportFormat::Xlsx, &ExportOptions::default()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn invalid_sheet_name_is_an_export_error() {
        let options = ExportOptions {
            sheet_name: "bad[name]".to_string(),
            ..ExportOptions::default()
        };
        let err = to_xlsx(&loaded(), &options).unwrap_err();
        assert!(matches!(err, ExportError::Spreadsheet(_)));
    }

    #[test]
    fn export_does_not_touch_the_dataset() {
        let ds = loaded();
        let before = ds.clone();
        for format in [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Json] {
            export(&ds, format, &ExportOptions::default()).unwrap();
        }
        assert_eq!(ds, before);
    }
}
