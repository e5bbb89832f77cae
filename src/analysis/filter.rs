//! Conjunctive filtering of a dataset.
//!
//! A row survives iff it passes every active predicate. Empty categorical
//! selections are inactive (they keep everything), never "match nothing".

use std::collections::BTreeSet;

use crate::domain::{Dataset, Dimension, FilterSpec, Row};

const CATEGORICAL: [Dimension; 4] = [
    Dimension::ProductType,
    Dimension::ProductLine,
    Dimension::Country,
    Dimension::OrderingMethod,
];

/// Return the subsequence of `dataset` matching `spec`, in original order.
pub fn apply_filter(dataset: &Dataset, spec: &FilterSpec) -> Dataset {
    let rows = dataset
        .iter()
        .filter(|row| matches(row, spec))
        .cloned()
        .collect();
    Dataset::from_rows(rows)
}

/// Whether a single row passes every active predicate of `spec`.
pub fn matches(row: &Row, spec: &FilterSpec) -> bool {
    let record = row.record();

    for dimension in CATEGORICAL {
        if !matches_selection(dimension.value(record), spec.selection(dimension)) {
            return false;
        }
    }

    // Rows with an invalid date cannot satisfy an active date range.
    if !spec.date_range.is_unbounded() {
        match record.date {
            Some(d) if spec.date_range.contains(d) => {}
            _ => return false,
        }
    }

    spec.margin_range.contains(row.metrics().margin_pct)
}

fn matches_selection(value: &str, selection: &BTreeSet<String>) -> bool {
    selection.is_empty() || selection.contains(value)
}
