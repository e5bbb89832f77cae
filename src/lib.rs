//! `sales-dash` library crate.
//!
//! The binary (`sales`) is a thin wrapper around this library so that:
//!
//! - loading, filtering and aggregation are testable without spawning processes
//! - the pipeline can back other front-ends (a web dashboard, notebooks)
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod report;
