//! Shared pipeline logic used by every CLI subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! clean -> build features -> evaluate -> forecast -> summary
//!
//! The CLI can then focus on presentation (printing and exports).

use std::path::Path;

use crate::clean::Cleaner;
use crate::domain::{CleanedSet, PipelineConfig, RecordSet, ResultBundle};
use crate::error::AppError;
use crate::features::{FeatureBuilder, FeatureTable};
use crate::fit::{Evaluator, Forecaster};
use crate::io::ingest::load_record_set;
use crate::report::{compute_summary, daily_sales};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub cleaned: CleanedSet,
    pub features: FeatureTable,
    pub bundle: ResultBundle,
}

/// Execute the full pipeline over an in-memory record set.
pub fn run(raw: &RecordSet, config: &PipelineConfig) -> Result<ResultBundle, AppError> {
    run_detailed(raw, config).map(|out| out.bundle)
}

/// Ingest a CSV file, then run the pipeline.
pub fn run_file(path: &Path, config: &PipelineConfig) -> Result<ResultBundle, AppError> {
    let raw = load_record_set(path)?;
    run(&raw, config)
}

/// Like `run`, but also hands back the intermediate cleaned records and
/// feature table for exporters.
pub fn run_detailed(raw: &RecordSet, config: &PipelineConfig) -> Result<RunOutput, AppError> {
    config.validate()?;

    // 1) Clean.
    let cleaned = Cleaner::new(config).clean(raw)?;

    // 2) Features.
    let features = FeatureBuilder::new(config.trailing_window).build(&cleaned.records);

    // 3) Evaluate on a chronological holdout.
    let metrics = evaluator(config).evaluate(&features)?;

    // 4) Forecast the days after the last observation.
    let prediction = Forecaster::new(config.forest.clone()).forecast(&features, config.forecast_horizon)?;
    tracing::info!(
        rows = prediction.len(),
        horizon = config.forecast_horizon,
        "forecast_completed"
    );

    // 5) Summary statistics.
    let summary = compute_summary(&cleaned.records, &features.regions);
    let daily = daily_sales(&cleaned.records, features.start_date);
    tracing::info!(
        total_sales = summary.total_sales,
        avg_daily_sales = summary.avg_daily_sales,
        top_region = summary.top_region.as_deref().unwrap_or("-"),
        "summary_computed"
    );

    let bundle = ResultBundle {
        summary,
        daily_sales: daily,
        prediction,
        metrics,
        cleaning: cleaned.summary,
        regions: features.regions.clone(),
        products: features.products.clone(),
        start_date: features.start_date,
        artifacts: Vec::new(),
    };

    Ok(RunOutput {
        cleaned,
        features,
        bundle,
    })
}

/// Clean only (used by `salescast clean`).
pub fn clean_only(raw: &RecordSet, config: &PipelineConfig) -> Result<CleanedSet, AppError> {
    config.validate()?;
    Cleaner::new(config).clean(raw)
}

/// Clean, build features and evaluate (used by `salescast evaluate`).
pub fn evaluate_only(raw: &RecordSet, config: &PipelineConfig) -> Result<crate::domain::MetricsReport, AppError> {
    let cleaned = clean_only(raw, config)?;
    let features = FeatureBuilder::new(config.trailing_window).build(&cleaned.records);
    evaluator(config).evaluate(&features)
}

fn evaluator(config: &PipelineConfig) -> Evaluator {
    Evaluator::new(config.forest.clone(), config.holdout_fraction, config.holdout_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate_sample, SampleSpec};
    use crate::error::ErrorKind;
    use crate::models::ForestConfig;

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            forest: ForestConfig {
                n_trees: 15,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn zero_rows_abort_with_insufficient_data() {
        let err = run(&RecordSet::default(), &fast_config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn sample_dataset_runs_end_to_end() {
        let raw = generate_sample(&SampleSpec::default()).unwrap();
        let out = run_detailed(&raw, &fast_config()).unwrap();
        let bundle = &out.bundle;

        // 4 regions x 3 products x 5 forecast days
        assert_eq!(bundle.prediction.len(), 60);
        assert_eq!(bundle.regions.labels(), ["East", "North", "South", "West"]);
        assert!(bundle.metrics.mae <= bundle.metrics.rmse);
        assert_eq!(bundle.summary.data_days, 31);
        assert_eq!(bundle.daily_sales.len(), 31);
        assert!(bundle.prediction.rows.iter().all(|p| p.day_index >= 31));

        let c = bundle.cleaning;
        assert_eq!(c.output_records + c.dropped() + c.removed_outliers, c.input_records);
    }

    #[test]
    fn invalid_config_is_rejected_before_work() {
        let config = PipelineConfig {
            trailing_window: 0,
            ..fast_config()
        };
        let err = run(&RecordSet::default(), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
