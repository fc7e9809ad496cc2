//! Random-forest sales forecaster.
//!
//! Rules:
//! 1. Training uses historical rows only (rows with a target).
//! 2. Refuse to fit with fewer than `max(2, 2 * min_samples_leaf)` rows.
//! 3. Refuse a single-valued target unless the caller explicitly allows it.
//! 4. Future rows carry the trailing features of each series' last row.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::domain::{FeatureRow, Prediction, PredictionSet, SeriesKey, FEATURE_COUNT};
use crate::error::AppError;
use crate::features::FeatureTable;
use crate::math::distinct_count;
use crate::models::{ForestConfig, RandomForest};

/// Whether fitting accepts a target with a single distinct value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetGuard {
    RequireVariation,
    AllowConstant,
}

/// Trailing features frozen at a series' last observed row.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SeriesState {
    trailing_mean: f64,
    trailing_count: u32,
}

/// A fitted forecaster plus what it needs to build future rows.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    forest: RandomForest,
    series: BTreeMap<SeriesKey, SeriesState>,
    last_day: u32,
    train_rows: usize,
}

impl TrainedModel {
    pub fn train_rows(&self) -> usize {
        self.train_rows
    }

    /// Latest `day_index` seen during training.
    pub fn last_day(&self) -> u32 {
        self.last_day
    }

    pub fn series(&self) -> impl Iterator<Item = SeriesKey> + '_ {
        self.series.keys().copied()
    }

    /// Predict the target of an existing feature row.
    pub fn predict_row(&self, row: &FeatureRow) -> f64 {
        self.forest.predict(&row.features())
    }
}

#[derive(Debug, Clone)]
pub struct Forecaster {
    config: ForestConfig,
}

impl Forecaster {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    /// Fit on the historical rows of `train`.
    pub fn fit(&self, train: &FeatureTable) -> Result<TrainedModel, AppError> {
        let rows: Vec<&FeatureRow> = train.historical().collect();
        self.fit_rows(&rows, TargetGuard::RequireVariation)
    }

    pub(crate) fn fit_rows(&self, rows: &[&FeatureRow], guard: TargetGuard) -> Result<TrainedModel, AppError> {
        let min_rows = self.config.min_training_rows();
        if rows.len() < min_rows {
            return Err(AppError::insufficient_data(format!(
                "Need at least {min_rows} historical rows to fit, got {}.",
                rows.len()
            )));
        }

        let mut features: Vec<[f64; FEATURE_COUNT]> = Vec::with_capacity(rows.len());
        let mut targets: Vec<f64> = Vec::with_capacity(rows.len());
        let mut series = BTreeMap::new();
        let mut last_day = 0;
        for row in rows {
            let Some(target) = row.target else { continue };
            features.push(row.features());
            targets.push(target);
            last_day = last_day.max(row.day_index);
            series.insert(
                row.series(),
                SeriesState {
                    trailing_mean: row.trailing_mean,
                    trailing_count: row.trailing_count,
                },
            );
        }

        if targets.len() < min_rows {
            return Err(AppError::insufficient_data(format!(
                "Need at least {min_rows} rows with a target, got {}.",
                targets.len()
            )));
        }
        if guard == TargetGuard::RequireVariation && distinct_count(&targets) < 2 {
            return Err(AppError::insufficient_data(
                "Training target has a single distinct value; nothing to learn.",
            ));
        }

        let forest = RandomForest::fit(&self.config, &features, &targets)?;

        tracing::debug!(
            rows = targets.len(),
            series = series.len(),
            last_day,
            "forecaster_fitted"
        );

        Ok(TrainedModel {
            forest,
            series,
            last_day,
            train_rows: targets.len(),
        })
    }

    /// Predict every day in `days` for each trained series whose codes are in
    /// both `regions` and `products`. Rows are day-major, then series order.
    pub fn predict(
        &self,
        model: &TrainedModel,
        days: Range<u32>,
        regions: &BTreeSet<u32>,
        products: &BTreeSet<u32>,
    ) -> PredictionSet {
        let selected: Vec<(&SeriesKey, &SeriesState)> = model
            .series
            .iter()
            .filter(|(key, _)| regions.contains(&key.region_code) && products.contains(&key.product_code))
            .collect();

        let mut rows = Vec::with_capacity(days.len() * selected.len());
        for day_index in days {
            for &(key, state) in &selected {
                let future = FeatureRow {
                    day_index,
                    region_code: key.region_code,
                    product_code: key.product_code,
                    trailing_mean: state.trailing_mean,
                    trailing_count: state.trailing_count,
                    target: None,
                };
                rows.push(Prediction {
                    day_index,
                    region_code: key.region_code,
                    product_code: key.product_code,
                    predicted_amount: model.predict_row(&future),
                });
            }
        }
        PredictionSet { rows }
    }

    /// Fit on `table` and predict the `horizon` days after its last day for
    /// every series in the table.
    pub fn forecast(&self, table: &FeatureTable, horizon: u32) -> Result<PredictionSet, AppError> {
        let model = self.fit(table)?;
        let start = model.last_day().saturating_add(1);
        let days = start..start.saturating_add(horizon);
        let regions: BTreeSet<u32> = (0..table.regions.len() as u32).collect();
        let products: BTreeSet<u32> = (0..table.products.len() as u32).collect();
        Ok(self.predict(&model, days, &regions, &products))
    }
}
