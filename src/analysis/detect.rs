//! Opportunity and anomaly flags based on quantiles of the current view.
//!
//! Thresholds are always computed from the dataset passed in (the filtered view),
//! so they move as filters change.

use serde::{Deserialize, Serialize};

use crate::domain::Dataset;
use crate::math::quantile;

/// Quantile levels used by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Opportunity rows have margin % at or above this quantile...
    pub opportunity_margin_q: f64,
    /// ...and total sales at or above this quantile.
    pub opportunity_sales_q: f64,
    /// Anomaly rows have margin % at or below this quantile...
    pub anomaly_margin_q: f64,
    /// ...or sale price at or above this quantile.
    pub anomaly_price_q: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            opportunity_margin_q: 0.90,
            opportunity_sales_q: 0.50,
            anomaly_margin_q: 0.05,
            anomaly_price_q: 0.95,
        }
    }
}

/// Threshold values resolved against a concrete dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub margin_high: f64,
    pub sales_floor: f64,
    pub margin_low: f64,
    pub price_high: f64,
}

/// Detector output. Empty subsets are a valid result, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub opportunities: Dataset,
    pub anomalies: Dataset,
    /// `None` when the dataset is too small (fewer than 2 rows) to rank.
    pub thresholds: Option<Thresholds>,
}

impl Detection {
    fn empty() -> Self {
        Self {
            opportunities: Dataset::default(),
            anomalies: Dataset::default(),
            thresholds: None,
        }
    }
}

/// Flag high-margin/high-sales opportunities and low-margin/high-price anomalies.
pub fn detect(dataset: &Dataset, config: &DetectorConfig) -> Detection {
    if dataset.len() < 2 {
        return Detection::empty();
    }

    let margins: Vec<f64> = dataset.iter().map(|r| r.metrics().margin_pct).collect();
    let sales: Vec<f64> = dataset.iter().map(|r| r.metrics().total_sales).collect();
    let prices: Vec<f64> = dataset.iter().map(|r| r.record().sale_price).collect();

    let (Some(margin_high), Some(sales_floor), Some(margin_low), Some(price_high)) = (
        quantile(&margins, config.opportunity_margin_q),
        quantile(&sales, config.opportunity_sales_q),
        quantile(&margins, config.anomaly_margin_q),
        quantile(&prices, config.anomaly_price_q),
    ) else {
        return Detection::empty();
    };

    let thresholds = Thresholds {
        margin_high,
        sales_floor,
        margin_low,
        price_high,
    };

    let opportunities = dataset
        .iter()
        .filter(|r| r.metrics().margin_pct >= margin_high && r.metrics().total_sales >= sales_floor)
        .cloned()
        .collect();
    let anomalies = dataset
        .iter()
        .filter(|r| r.metrics().margin_pct <= margin_low || r.record().sale_price >= price_high)
        .cloned()
        .collect();

    tracing::debug!(
        rows = dataset.len(),
        margin_high,
        sales_floor,
        margin_low,
        price_high,
        "Resolved detector thresholds"
    );

    Detection {
        opportunities: Dataset::from_rows(opportunities),
        anomalies: Dataset::from_rows(anomalies),
        thresholds: Some(thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Row, SaleRecord};
    use chrono::NaiveDate;

    fn row(quantity: u64, price: f64, cost: f64) -> Row {
        Row::new(SaleRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1),
            date_raw: String::new(),
            product_type: format!("P{quantity}-{price}"),
            product_line: "Line".to_string(),
            quantity,
            sale_price: price,
            purchase_cost: cost,
            ordering_method: "Web".to_string(),
            country: "AR".to_string(),
        })
    }

    /// 20 rows with margins 5%, 10%, ..., 100% priced 101..=120, plus one expensive item.
    fn sample() -> Dataset {
        let mut rows: Vec<Row> = (1..=20)
            .map(|i| {
                let price = 100.0 + i as f64;
                let margin = i as f64 * 5.0;
                row(1, price, price - price * margin / 100.0)
            })
            .collect();
        rows.push(row(1, 10_000.0, 9_000.0));
        Dataset::from_rows(rows)
    }

    #[test]
    fn small_datasets_yield_empty_subsets() {
        let none = detect(&Dataset::default(), &DetectorConfig::default());
        assert!(none.opportunities.is_empty());
        assert!(none.anomalies.is_empty());
        assert!(none.thresholds.is_none());

        let one = detect(&Dataset::from_rows(vec![row(1, 10.0, 1.0)]), &DetectorConfig::default());
        assert!(one.opportunities.is_empty());
        assert!(one.anomalies.is_empty());
    }

    #[test]
    fn flags_are_subsets_of_the_input() {
        let ds = sample();
        let d = detect(&ds, &DetectorConfig::default());
        for r in d.opportunities.iter().chain(d.anomalies.iter()) {
            assert!(ds.rows().contains(r));
        }
        assert!(d.thresholds.is_some());
    }

    #[test]
    fn anomaly_is_low_margin_or_high_price() {
        let ds = sample();
        let d = detect(&ds, &DetectorConfig::default());
        // lowest margin row (5%)
        assert!(d.anomalies.iter().any(|r| (r.metrics().margin_pct - 5.0).abs() < 1e-9));
        // most expensive row
        assert!(d.anomalies.iter().any(|r| r.record().sale_price == 10_000.0));
        // a mid-range row is not flagged
        assert!(!d.anomalies.iter().any(|r| (r.metrics().margin_pct - 50.0).abs() < 1e-9));
    }

    #[test]
    fn opportunity_needs_high_margin_and_sales() {
        let ds = sample();
        let d = detect(&ds, &DetectorConfig::default());
        let t = d.thresholds.unwrap();
        assert!(!d.opportunities.is_empty());
        for r in d.opportunities.iter() {
            assert!(r.metrics().margin_pct >= t.margin_high);
            assert!(r.metrics().total_sales >= t.sales_floor);
        }
        assert!(d.opportunities.iter().any(|r| (r.metrics().margin_pct - 100.0).abs() < 1e-9));
    }
}
