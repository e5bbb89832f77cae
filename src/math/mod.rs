//! Small numeric helpers shared by the analysis modules.

pub mod quantile;

pub use quantile::*;
