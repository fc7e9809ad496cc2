//! Regression models used by the forecaster.
//!
//! The forest is generic over feature rows (`AsRef<[f64]>`) so fitting code
//! does not depend on how the pipeline lays out its features.

pub mod forest;
pub mod tree;

pub use forest::*;
pub use tree::*;
