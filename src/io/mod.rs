//! Input/output helpers.
//!
//! - column-name mapping per file layout (`schema`)
//! - date column detection (`dates`)
//! - CSV ingest + validation (`ingest`)
//! - parsed-dataset cache (`cache`)
//! - CSV/spreadsheet/JSON exports (`export`)

pub mod cache;
pub mod dates;
pub mod export;
pub mod ingest;
pub mod schema;

pub use cache::*;
pub use export::*;
pub use ingest::*;
pub use schema::*;
