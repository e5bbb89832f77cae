//! Reporting utilities: formatted terminal output for loads, KPIs, groups and flags.

pub mod format;

pub use format::*;
