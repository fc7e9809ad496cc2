//! Chronological holdout evaluation.

use crate::domain::{FeatureRow, MetricsReport};
use crate::error::AppError;
use crate::features::FeatureTable;
use crate::fit::forecaster::{Forecaster, TargetGuard};
use crate::math::{mean_absolute_error, root_mean_squared_error};
use crate::models::ForestConfig;

/// Scores the forecaster on the most recent historical rows.
#[derive(Debug, Clone)]
pub struct Evaluator {
    forecaster: Forecaster,
    holdout_fraction: f64,
    holdout_rows: Option<usize>,
}

impl Evaluator {
    pub fn new(config: ForestConfig, holdout_fraction: f64, holdout_rows: Option<usize>) -> Self {
        Self {
            forecaster: Forecaster::new(config),
            holdout_fraction,
            holdout_rows,
        }
    }

    /// Holdout size for `n` historical rows.
    pub fn holdout_size(&self, n: usize) -> usize {
        match self.holdout_rows {
            Some(rows) => rows,
            // tolerance keeps e.g. 0.2 * 15 from rounding up to 4
            None => (self.holdout_fraction * n as f64 - 1e-9).ceil().max(0.0) as usize,
        }
    }

    pub fn evaluate(&self, table: &FeatureTable) -> Result<MetricsReport, AppError> {
        let rows: Vec<&FeatureRow> = table.historical().collect();
        let n = rows.len();
        let holdout = self.holdout_size(n);
        if n == 0 || holdout == 0 || holdout >= n {
            return Err(AppError::insufficient_data(format!(
                "Cannot split {n} historical rows into train and a holdout of {holdout}."
            )));
        }

        let (train, test) = rows.split_at(n - holdout);
        let model = self.forecaster.fit_rows(train, TargetGuard::AllowConstant)?;

        let mut predicted = Vec::with_capacity(test.len());
        let mut actual = Vec::with_capacity(test.len());
        for row in test {
            let Some(target) = row.target else { continue };
            let y = model.predict_row(row);
            if !y.is_finite() {
                return Err(AppError::model("Non-finite prediction during evaluation."));
            }
            predicted.push(y);
            actual.push(target);
        }

        let Some((mae, rmse)) = holdout_errors(&predicted, &actual) else {
            return Err(AppError::insufficient_data("Holdout has no rows to score."));
        };

        let report = MetricsReport {
            mae,
            rmse,
            train_rows: model.train_rows(),
            holdout_rows: actual.len(),
        };
        tracing::info!(
            mae = report.mae,
            rmse = report.rmse,
            train_rows = report.train_rows,
            holdout_rows = report.holdout_rows,
            "evaluation_completed"
        );
        Ok(report)
    }
}

/// MAE and RMSE of a holdout. RMSE >= MAE holds exactly; rounding in the
/// two reductions can otherwise leave RMSE one ulp below MAE.
fn holdout_errors(predicted: &[f64], actual: &[f64]) -> Option<(f64, f64)> {
    let mae = mean_absolute_error(predicted, actual)?;
    let rmse = root_mean_squared_error(predicted, actual)?;
    Some((mae, rmse.max(mae)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CleanedRecord;
    use crate::error::ErrorKind;
    use crate::features::FeatureBuilder;
    use chrono::NaiveDate;

    fn evaluator() -> Evaluator {
        Evaluator::new(
            ForestConfig {
                n_trees: 25,
                ..Default::default()
            },
            0.2,
            None,
        )
    }

    fn series(days: u64, amount: impl Fn(u64) -> f64) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records: Vec<CleanedRecord> = (0..days)
            .map(|d| CleanedRecord {
                date: start + chrono::Days::new(d),
                product_id: "P1".to_string(),
                sales_amount: amount(d),
                region: "East".to_string(),
            })
            .collect();
        FeatureBuilder::new(7).build(&records)
    }

    #[test]
    fn constant_series_scores_perfectly() {
        let report = evaluator().evaluate(&series(31, |_| 100.0)).unwrap();
        assert_eq!(report.mae, 0.0);
        assert_eq!(report.rmse, 0.0);
        assert_eq!(report.holdout_rows, 7);
        assert_eq!(report.train_rows, 24);
    }

    #[test]
    fn mae_is_bounded_by_rmse() {
        let report = evaluator()
            .evaluate(&series(40, |d| 50.0 + (d % 5) as f64 * 3.0))
            .unwrap();
        assert!(report.mae >= 0.0);
        assert!(report.mae <= report.rmse);
    }

    #[test]
    fn equal_errors_keep_mae_at_most_rmse() {
        for n in [1usize, 3, 10, 37] {
            for e in [0.0411, 0.1, 1.0 / 3.0, 17.25, 123.456] {
                let predicted = vec![e; n];
                let actual = vec![0.0; n];
                let (mae, rmse) = holdout_errors(&predicted, &actual).unwrap();
                assert!(mae <= rmse, "e={e} n={n} mae={mae} rmse={rmse}");
                assert!((rmse - e).abs() < 1e-12);
            }
        }
        assert_eq!(holdout_errors(&[], &[]), None);
    }

    #[test]
    fn explicit_holdout_rows_override_fraction() {
        let eval = Evaluator::new(ForestConfig { n_trees: 5, ..Default::default() }, 0.2, Some(3));
        let report = eval.evaluate(&series(12, |d| d as f64)).unwrap();
        assert_eq!(report.holdout_rows, 3);
        assert_eq!(report.train_rows, 9);
    }

    #[test]
    fn empty_splits_are_insufficient_data() {
        let err = evaluator().evaluate(&series(0, |_| 1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);

        let eval = Evaluator::new(ForestConfig::default(), 0.2, Some(5));
        let err = eval.evaluate(&series(5, |d| d as f64)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
    }
}
