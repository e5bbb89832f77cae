//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`DecimalSeparator`, `Granularity`, `Dimension`, `ExportFormat`)
//! - parsed records and their derived metrics (`SaleRecord`, `Metrics`, `Row`)
//! - the in-memory table and the user's predicates (`Dataset`, `FilterSpec`)

pub mod types;

pub use types::*;
