//! Pipeline configuration.
//!
//! Values come from three layers, later layers winning:
//! 1. `Default` impls (documented below)
//! 2. an optional TOML file (every key optional)
//! 3. CLI flags (applied in `app`)

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ForestConfig;

/// Statistic used to fill a missing sales amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImputeStrategy {
    Mean,
    Median,
}

/// What to do with amounts outside the IQR fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutlierPolicy {
    /// Clip to the nearest fence (keeps the observation).
    Clip,
    /// Drop the record.
    Remove,
}

/// A full run's configuration as understood by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// chrono format for the `date` column. Default `%Y-%m-%d`.
    pub date_format: String,
    /// Default `mean`.
    pub impute: ImputeStrategy,
    /// Default `clip`.
    pub outlier_policy: OutlierPolicy,
    /// IQR multiplier for the outlier fences. Default 1.5.
    pub outlier_multiplier: f64,
    /// Raw region name -> canonical region name.
    pub region_aliases: BTreeMap<String, String>,
    /// Trailing window length in days. Default 7.
    pub trailing_window: u32,
    pub forest: ForestConfig,
    /// Share of historical rows held out for evaluation. Default 0.2.
    pub holdout_fraction: f64,
    /// Explicit holdout size in rows; overrides `holdout_fraction`.
    pub holdout_rows: Option<usize>,
    /// Days to forecast after the last observed day. Default 5.
    pub forecast_horizon: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            impute: ImputeStrategy::Mean,
            outlier_policy: OutlierPolicy::Clip,
            outlier_multiplier: 1.5,
            region_aliases: default_region_aliases(),
            trailing_window: 7,
            forest: ForestConfig::default(),
            holdout_fraction: 0.2,
            holdout_rows: None,
            forecast_horizon: 5,
        }
    }
}

/// Chinese region names found in legacy exports, mapped to English.
pub fn default_region_aliases() -> BTreeMap<String, String> {
    [
        ("华北", "North"),
        ("华东", "East"),
        ("华南", "South"),
        ("西北", "Northwest"),
        ("西南", "Southwest"),
        ("东北", "Northeast"),
        ("中部", "Central"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl PipelineConfig {
    /// Load a TOML config file. Missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read config file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| AppError::config(format!("{} ({})", e.message(), path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, AppError> {
        let config: PipelineConfig = toml::from_str(content)
            .map_err(|e| AppError::config(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.date_format.trim().is_empty() {
            return Err(AppError::config("`date_format` must not be empty."));
        }
        if !(self.outlier_multiplier.is_finite() && self.outlier_multiplier >= 0.0) {
            return Err(AppError::config(format!(
                "`outlier_multiplier` must be finite and >= 0, got {}.",
                self.outlier_multiplier
            )));
        }
        if self.trailing_window == 0 {
            return Err(AppError::config("`trailing_window` must be >= 1 day."));
        }
        if !(self.holdout_fraction.is_finite()
            && self.holdout_fraction > 0.0
            && self.holdout_fraction < 1.0)
        {
            return Err(AppError::config(format!(
                "`holdout_fraction` must be in (0, 1), got {}.",
                self.holdout_fraction
            )));
        }
        if self.holdout_rows == Some(0) {
            return Err(AppError::config("`holdout_rows` must be >= 1 when set."));
        }
        if self.forecast_horizon == 0 {
            return Err(AppError::config("`forecast_horizon` must be >= 1 day."));
        }
        self.forest.validate()
    }
}
