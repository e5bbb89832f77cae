//! Row-level financial metrics.

use crate::domain::{Dataset, Metrics, Row, SaleRecord};

/// Compute sales, cost, profit, margin % and ROI % for one record.
///
/// Zero denominators yield `0.0` for margin/ROI rather than NaN or infinity.
pub fn derive_metrics(record: &SaleRecord) -> Metrics {
    let quantity = record.quantity as f64;
    let total_sales = quantity * record.sale_price;
    let total_cost = quantity * record.purchase_cost;
    let profit = total_sales - total_cost;

    Metrics {
        total_sales,
        total_cost,
        profit,
        margin_pct: ratio_pct(profit, total_sales),
        roi_pct: ratio_pct(profit, total_cost),
    }
}

/// Build a dataset from parsed records, deriving metrics for each row.
pub fn derive_dataset(records: Vec<SaleRecord>) -> Dataset {
    Dataset::from_rows(records.into_iter().map(Row::new).collect())
}

/// `numerator / denominator * 100`, or `0.0` when the denominator is zero.
pub fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let v = numerator / denominator * 100.0;
    if v.is_finite() { v } else { 0.0 }
}
