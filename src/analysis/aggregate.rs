//! Grouping and reduction of a (filtered) dataset.
//!
//! - categorical groups keep first-encountered key order
//! - time buckets are chronological
//! - rankings sort by total sales with a stable sort (ties keep encounter order)

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use indexmap::IndexMap;
use serde::Serialize;

use crate::analysis::derive::ratio_pct;
use crate::domain::{Dataset, Dimension, Granularity, Row};

/// Reduced figures for one group of rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub records: usize,
    pub quantity: u64,
    pub total_sales: f64,
    pub total_cost: f64,
    pub profit: f64,
    /// Unweighted mean of the rows' margin %.
    pub mean_margin_pct: f64,
}

impl GroupSummary {
    /// Aggregate margin: group profit over group sales.
    pub fn margin_pct(&self) -> f64 {
        ratio_pct(self.profit, self.total_sales)
    }

    /// Aggregate ROI: group profit over group cost.
    pub fn roi_pct(&self) -> f64 {
        ratio_pct(self.profit, self.total_cost)
    }
}

/// One time bucket of a chronological series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    /// First calendar day covered by the bucket.
    pub start: NaiveDate,
    pub summary: GroupSummary,
    /// Sales change versus the previous bucket, in percent.
    pub sales_growth_pct: Option<f64>,
}

impl TimeBucket {
    pub fn label(&self) -> &str {
        &self.summary.key
    }
}

/// Headline figures for a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub records: usize,
    pub quantity: u64,
    pub total_sales: f64,
    pub total_cost: f64,
    pub profit: f64,
    pub margin_pct: f64,
    pub roi_pct: f64,
    pub mean_margin_pct: f64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub invalid_dates: usize,
}

/// Total sales pivoted over two dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub rows: Dimension,
    pub columns: Dimension,
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    /// `cells[r][c]` is the sales total for `row_keys[r]` × `column_keys[c]`.
    pub cells: Vec<Vec<f64>>,
}

#[derive(Debug, Default)]
struct Accumulator {
    records: usize,
    quantity: u64,
    total_sales: f64,
    total_cost: f64,
    profit: f64,
    margin_sum: f64,
}

impl Accumulator {
    fn push(&mut self, row: &Row) {
        let m = row.metrics();
        self.records += 1;
        self.quantity = self.quantity.saturating_add(row.record().quantity);
        self.total_sales += m.total_sales;
        self.total_cost += m.total_cost;
        self.profit += m.profit;
        self.margin_sum += m.margin_pct;
    }

    fn finish(self, key: String) -> GroupSummary {
        let mean_margin_pct = if self.records == 0 {
            0.0
        } else {
            self.margin_sum / self.records as f64
        };
        GroupSummary {
            key,
            records: self.records,
            quantity: self.quantity,
            total_sales: self.total_sales,
            total_cost: self.total_cost,
            profit: self.profit,
            mean_margin_pct,
        }
    }
}

/// Headline KPIs over every row (including rows with invalid dates).
pub fn summarize(dataset: &Dataset) -> Summary {
    let mut acc = Accumulator::default();
    let mut invalid_dates = 0usize;
    for row in dataset {
        acc.push(row);
        if row.record().date.is_none() {
            invalid_dates += 1;
        }
    }
    let bounds = dataset.date_bounds();
    let group = acc.finish(String::new());

    Summary {
        records: group.records,
        quantity: group.quantity,
        total_sales: group.total_sales,
        total_cost: group.total_cost,
        profit: group.profit,
        margin_pct: group.margin_pct(),
        roi_pct: group.roi_pct(),
        mean_margin_pct: group.mean_margin_pct,
        first_date: bounds.map(|(lo, _)| lo),
        last_date: bounds.map(|(_, hi)| hi),
        invalid_dates,
    }
}

/// Group rows by exact value of `dimension`, in first-encountered order.
pub fn group_by(dataset: &Dataset, dimension: Dimension) -> Vec<GroupSummary> {
    let mut groups: IndexMap<&str, Accumulator> = IndexMap::new();
    for row in dataset {
        groups
            .entry(dimension.value(row.record()))
            .or_default()
            .push(row);
    }
    groups
        .into_iter()
        .map(|(key, acc)| acc.finish(key.to_string()))
        .collect()
}

/// Chronological time series at `granularity`. Rows without a valid date are skipped.
pub fn group_by_time(dataset: &Dataset, granularity: Granularity) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for row in dataset {
        let Some(date) = row.record().date else { continue };
        buckets.entry(bucket_start(date, granularity)).or_default().push(row);
    }

    let mut out: Vec<TimeBucket> = Vec::with_capacity(buckets.len());
    for (start, acc) in buckets {
        let summary = acc.finish(bucket_label(start, granularity));
        let sales_growth_pct = out.last().and_then(|prev| {
            let base = prev.summary.total_sales;
            (base != 0.0).then(|| (summary.total_sales - base) / base * 100.0)
        });
        out.push(TimeBucket {
            start,
            summary,
            sales_growth_pct,
        });
    }
    out
}

/// The `n` groups with the highest total sales.
pub fn top_n(dataset: &Dataset, dimension: Dimension, n: usize) -> Vec<GroupSummary> {
    let mut groups = group_by(dataset, dimension);
    groups.sort_by(|a, b| b.total_sales.total_cmp(&a.total_sales));
    groups.truncate(n);
    groups
}

/// The `n` groups with the lowest total sales.
pub fn bottom_n(dataset: &Dataset, dimension: Dimension, n: usize) -> Vec<GroupSummary> {
    let mut groups = group_by(dataset, dimension);
    groups.sort_by(|a, b| a.total_sales.total_cmp(&b.total_sales));
    groups.truncate(n);
    groups
}

/// Pivot total sales over `rows` × `columns`. Absent combinations are `0.0`.
pub fn cross_tab(dataset: &Dataset, rows: Dimension, columns: Dimension) -> CrossTab {
    let mut row_index: IndexMap<&str, usize> = IndexMap::new();
    let mut col_index: IndexMap<&str, usize> = IndexMap::new();
    let mut cells: Vec<Vec<f64>> = Vec::new();

    for row in dataset {
        let record = row.record();
        let next_row = row_index.len();
        let r = *row_index.entry(rows.value(record)).or_insert(next_row);
        let next_col = col_index.len();
        let c = *col_index.entry(columns.value(record)).or_insert(next_col);

        if r == cells.len() {
            cells.push(vec![0.0; col_index.len()]);
        }
        for line in cells.iter_mut() {
            line.resize(col_index.len(), 0.0);
        }
        cells[r][c] += row.metrics().total_sales;
    }

    CrossTab {
        rows,
        columns,
        row_keys: row_index.keys().map(|k| k.to_string()).collect(),
        column_keys: col_index.keys().map(|k| k.to_string()).collect(),
        cells,
    }
}

/// First day of the bucket containing `date`.
pub fn bucket_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let start = match granularity {
        Granularity::Day => Some(date),
        Granularity::Week => {
            let iso = date.iso_week();
            NaiveDate::from_isoywd_opt(iso.year(), iso.week(), Weekday::Mon)
        }
        Granularity::Month => date.with_day(1),
        Granularity::Quarter => {
            let first_month = (date.month0() / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), first_month, 1)
        }
        Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
    };
    start.unwrap_or(date)
}

/// Display label of the bucket starting at `start`.
///
/// Day `2024-03-05`, week `2024-W09` (ISO), month `2024-03`, quarter `2024-Q1`, year `2024`.
pub fn bucket_label(start: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => start.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let iso = start.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
        Granularity::Month => start.format("%Y-%m").to_string(),
        Granularity::Quarter => format!("{}-Q{}", start.year(), start.month0() / 3 + 1),
        Granularity::Year => start.year().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SaleRecord;

    fn row(date: Option<NaiveDate>, country: &str, product: &str, sales: f64) -> Row {
        Row::new(SaleRecord {
            date,
            date_raw: String::new(),
            product_type: product.to_string(),
            product_line: "Line".to_string(),
            quantity: 1,
            sale_price: sales,
            purchase_cost: sales / 2.0,
            ordering_method: "Web".to_string(),
            country: country.to_string(),
        })
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn monthly_buckets_are_chronological() {
        let ds = Dataset::from_rows(vec![
            row(ymd(2024, 2, 3), "AR", "A", 30.0),
            row(ymd(2024, 1, 10), "AR", "A", 100.0),
            row(ymd(2024, 1, 20), "AR", "A", 50.0),
            row(None, "AR", "A", 999.0),
        ]);
        let series = group_by_time(&ds, Granularity::Month);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label(), "2024-01");
        assert_eq!(series[0].summary.total_sales, 150.0);
        assert_eq!(series[1].label(), "2024-02");
        assert_eq!(series[1].summary.total_sales, 30.0);
        assert_eq!(series[0].sales_growth_pct, None);
        assert!((series[1].sales_growth_pct.unwrap() + 80.0).abs() < 1e-9);
    }

    #[test]
    fn bucket_labels() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let label = |g| bucket_label(bucket_start(d, g), g);
        assert_eq!(label(Granularity::Day), "2024-02-29");
        assert_eq!(label(Granularity::Week), "2024-W09");
        assert_eq!(label(Granularity::Month), "2024-02");
        assert_eq!(label(Granularity::Quarter), "2024-Q1");
        assert_eq!(label(Granularity::Year), "2024");

        // ISO week-year differs from the calendar year around New Year.
        let d = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        assert_eq!(bucket_label(bucket_start(d, Granularity::Week), Granularity::Week), "2020-W53");
    }

    #[test]
    fn group_totals_are_conserved() {
        let ds = Dataset::from_rows(vec![
            row(ymd(2024, 1, 1), "AR", "A", 10.5),
            row(ymd(2024, 1, 2), "MX", "B", 20.25),
            row(ymd(2024, 1, 3), "AR", "C", 7.0),
            row(ymd(2024, 1, 4), "CL", "A", 1.0),
        ]);
        let total: f64 = ds.iter().map(|r| r.metrics().total_sales).sum();
        let grouped: f64 = group_by(&ds, Dimension::Country).iter().map(|g| g.total_sales).sum();
        assert!((total - grouped).abs() < 1e-9);
        assert!((summarize(&ds).total_sales - total).abs() < 1e-9);

        let keys: Vec<_> = group_by(&ds, Dimension::Country).into_iter().map(|g| g.key).collect();
        assert_eq!(keys, vec!["AR", "MX", "CL"]);
    }

    #[test]
    fn rankings_are_stable_on_ties() {
        let ds = Dataset::from_rows(vec![
            row(ymd(2024, 1, 1), "AR", "first", 10.0),
            row(ymd(2024, 1, 1), "AR", "big", 50.0),
            row(ymd(2024, 1, 1), "AR", "second", 10.0),
            row(ymd(2024, 1, 1), "AR", "small", 1.0),
        ]);
        let top: Vec<_> = top_n(&ds, Dimension::ProductType, 3).into_iter().map(|g| g.key).collect();
        assert_eq!(top, vec!["big", "first", "second"]);

        let bottom: Vec<_> = bottom_n(&ds, Dimension::ProductType, 3).into_iter().map(|g| g.key).collect();
        assert_eq!(bottom, vec!["small", "first", "second"]);
    }

    #[test]
    fn summary_of_empty_dataset_is_zero() {
        let s = summarize(&Dataset::default());
        assert_eq!(s.records, 0);
        assert_eq!(s.total_sales, 0.0);
        assert_eq!(s.margin_pct, 0.0);
        assert_eq!(s.first_date, None);
    }

    #[test]
    fn cross_tab_fills_missing_cells_with_zero() {
        let ds = Dataset::from_rows(vec![
            row(ymd(2024, 1, 1), "AR", "A", 10.0),
            row(ymd(2024, 1, 1), "MX", "B", 5.0),
            row(ymd(2024, 1, 1), "AR", "B", 2.0),
            row(ymd(2024, 1, 1), "AR", "A", 1.0),
        ]);
        let tab = cross_tab(&ds, Dimension::Country, Dimension::ProductType);
        assert_eq!(tab.row_keys, vec!["AR", "MX"]);
        assert_eq!(tab.column_keys, vec!["A", "B"]);
        assert_eq!(tab.cells, vec![vec![11.0, 2.0], vec![0.0, 5.0]]);
    }
}
