//! Synthetic data sources.

pub mod sample;

pub use sample::{DemoConfig, generate_demo_csv};
