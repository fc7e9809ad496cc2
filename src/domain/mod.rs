//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw and cleaned sales records (`RawRecord`, `RecordSet`, `CleanedRecord`)
//! - engineered model inputs (`FeatureRow`, `SeriesKey`)
//! - pipeline outputs (`PredictionSet`, `MetricsReport`, `Summary`, `ResultBundle`)
//! - run configuration (`PipelineConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
