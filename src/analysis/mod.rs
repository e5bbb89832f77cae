//! Analysis over an in-memory dataset.
//!
//! - row-level financial metrics (`derive`)
//! - conjunctive predicate filtering (`filter`)
//! - grouping, time bucketing and rankings (`aggregate`)
//! - quantile-based opportunity/anomaly flags (`detect`)
//!
//! Everything here is a pure read of its input: nothing mutates a dataset in place.

pub mod aggregate;
pub mod derive;
pub mod detect;
pub mod filter;

pub use aggregate::*;
pub use derive::*;
pub use detect::*;
pub use filter::*;
