//! Descriptive statistics and forecast error metrics.

pub mod stats;

pub use stats::*;
