//! Random forest regressor.
//!
//! Each tree is grown on a bootstrap sample of the training rows with its own
//! `StdRng` seeded from `seed + tree_index`. Trees are built in parallel with
//! rayon; because every tree owns its RNG and results are collected in tree
//! order, the fitted forest is identical for a given seed regardless of
//! scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::tree::{RegressionTree, TreeParams};

/// Random forest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForestConfig {
    /// Number of trees. Default 100.
    pub n_trees: usize,
    /// Maximum tree depth in levels. Default 8.
    pub max_depth: usize,
    /// Minimum samples required to split a node. Default 2.
    pub min_samples_split: usize,
    /// Minimum samples per leaf. Default 1.
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` = ceil(sqrt(n_features)).
    pub max_features: Option<usize>,
    /// Base seed for bootstrap sampling and feature subsets. Default 42.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.n_trees == 0 {
            return Err(AppError::config("`forest.n_trees` must be >= 1."));
        }
        if self.max_depth == 0 {
            return Err(AppError::config("`forest.max_depth` must be >= 1."));
        }
        if self.min_samples_leaf == 0 {
            return Err(AppError::config("`forest.min_samples_leaf` must be >= 1."));
        }
        if self.max_features == Some(0) {
            return Err(AppError::config("`forest.max_features` must be >= 1 when set."));
        }
        Ok(())
    }

    /// Smallest training set a forest with this config will accept.
    pub fn min_training_rows(&self) -> usize {
        (2 * self.min_samples_leaf).max(2)
    }

    /// Features considered at each split for `n_features` inputs.
    pub fn features_per_split(&self, n_features: usize) -> usize {
        let default = (n_features as f64).sqrt().ceil() as usize;
        self.max_features
            .unwrap_or(default)
            .clamp(1, n_features.max(1))
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.features_per_split(n_features),
        }
    }
}

/// A fitted random forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit `config.n_trees` trees on bootstrap samples of `(features, targets)`.
    pub fn fit<R>(config: &ForestConfig, features: &[R], targets: &[f64]) -> Result<Self, AppError>
    where
        R: AsRef<[f64]> + Sync,
    {
        config.validate()?;
        let n = features.len();
        if n == 0 {
            return Err(AppError::insufficient_data("No training rows to fit the forest."));
        }
        if targets.len() != n {
            return Err(AppError::model(format!(
                "Feature/target length mismatch: {n} rows vs {} targets.",
                targets.len()
            )));
        }
        let n_features = features[0].as_ref().len();
        if n_features == 0 || features.iter().any(|row| row.as_ref().len() != n_features) {
            return Err(AppError::model("Feature rows must share a non-zero width."));
        }
        let finite = targets.iter().all(|t| t.is_finite())
            && features
                .iter()
                .all(|row| row.as_ref().iter().all(|v| v.is_finite()));
        if !finite {
            return Err(AppError::model("Non-finite value in training data."));
        }

        let params = config.tree_params(n_features);
        let trees: Vec<RegressionTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(features, targets, sample, &params, &mut rng)
            })
            .collect();

        tracing::debug!(
            n_trees = trees.len(),
            rows = n,
            features_per_split = params.max_features,
            "forest_fitted"
        );

        Ok(Self { trees, n_features })
    }

    /// Average of the tree predictions, summed in tree order.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.predict(x)).sum();
        total / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Vec<[f64; 2]>, Vec<f64>) {
        let features: Vec<[f64; 2]> = (0..60).map(|i| [i as f64, (i % 4) as f64]).collect();
        let targets: Vec<f64> = (0..60).map(|i| 3.0 * i as f64 + 10.0).collect();
        (features, targets)
    }

    #[test]
    fn same_seed_gives_identical_predictions() {
        let (features, targets) = linear_data();
        let config = ForestConfig {
            n_trees: 16,
            ..Default::default()
        };
        let a = RandomForest::fit(&config, &features, &targets).unwrap();
        let b = RandomForest::fit(&config, &features, &targets).unwrap();

        for x in [[5.0, 1.0], [31.5, 2.0], [59.0, 3.0]] {
            assert_eq!(a.predict(&x).to_bits(), b.predict(&x).to_bits());
        }
        assert_eq!(a.n_trees(), 16);
        assert_eq!(a.n_features(), 2);
    }

    #[test]
    fn tracks_a_trend_within_training_range() {
        let (features, targets) = linear_data();
        let forest = RandomForest::fit(&ForestConfig::default(), &features, &targets).unwrap();
        let y = forest.predict(&[30.0, 2.0]);
        assert!((y - 100.0).abs() < 15.0, "prediction {y} too far from 100");
    }

    #[test]
    fn rejects_empty_and_mismatched_inputs() {
        let config = ForestConfig::default();
        let empty: Vec<[f64; 2]> = Vec::new();
        let err = RandomForest::fit(&config, &empty, &[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InsufficientData);

        let (features, targets) = linear_data();
        assert!(RandomForest::fit(&config, &features, &targets[..10]).is_err());
    }

    #[test]
    fn default_features_per_split_is_sqrt() {
        let config = ForestConfig::default();
        assert_eq!(config.features_per_split(5), 3);
        assert_eq!(config.features_per_split(1), 1);
        let capped = ForestConfig {
            max_features: Some(10),
            ..Default::default()
        };
        assert_eq!(capped.features_per_split(5), 5);
    }
}
