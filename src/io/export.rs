//! Export run results to CSV.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Every file is rendered in memory, written to a temporary sibling
//! and renamed into place, so a failure never leaves a half-written file.
//! Region rows come out highest total first; predictions carry decoded labels
//! and calendar dates.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{Artifact, CleanedRecord, RecordSet, ResultBundle};
use crate::error::AppError;
use crate::io::bundle::bundle_json_bytes;

#[derive(Serialize)]
struct PredictionRow<'a> {
    date: String,
    day_index: u32,
    region: &'a str,
    product_id: &'a str,
    predicted_amount: f64,
}

#[derive(Serialize)]
struct RawRow<'a> {
    date: &'a str,
    product_id: &'a str,
    sales_amount: &'a str,
    region: &'a str,
}

/// Cleaned records in the input column layout, so they can be re-ingested.
pub fn write_cleaned_csv(path: &Path, records: &[CleanedRecord]) -> Result<(), AppError> {
    write_csv(path, records.iter())
}

/// Raw records as text, empty cells for absent values.
pub fn write_record_set_csv(path: &Path, records: &RecordSet) -> Result<(), AppError> {
    let rows = records.records().iter().map(|r| RawRow {
        date: r.date.as_deref().unwrap_or(""),
        product_id: r.product_id.as_deref().unwrap_or(""),
        sales_amount: r.sales_amount.as_deref().unwrap_or(""),
        region: r.region.as_deref().unwrap_or(""),
    });
    write_csv(path, rows)
}

/// Write the standard export set plus `bundle.json` into `out_dir` and list
/// what was written. The bundle copy on disk lists every artifact, itself
/// included.
///
/// All files are staged as `.tmp` siblings first and renamed only once every
/// one of them was written; on failure the staged and already-renamed files
/// are removed, so `out_dir` never holds part of a set.
pub fn write_exports(
    out_dir: &Path,
    bundle: &ResultBundle,
    cleaned: &[CleanedRecord],
) -> Result<Vec<Artifact>, AppError> {
    fs::create_dir_all(out_dir).map_err(|e| {
        AppError::io(format!(
            "Failed to create output directory '{}': {e}",
            out_dir.display()
        ))
    })?;

    let predictions = out_dir.join("predictions.csv");
    let regions = out_dir.join("region_summary.csv");
    let cleaned_path = out_dir.join("cleaned.csv");
    let bundle_path = out_dir.join("bundle.json");
    let artifacts = vec![
        artifact("predictions_csv", predictions.clone()),
        artifact("region_summary_csv", regions.clone()),
        artifact("cleaned_csv", cleaned_path.clone()),
        artifact("bundle_json", bundle_path.clone()),
    ];

    let mut listed = bundle.clone();
    listed.artifacts = artifacts.clone();
    let files = vec![
        (predictions.clone(), predictions_csv_bytes(&predictions, bundle)?),
        (regions.clone(), csv_bytes(&regions, bundle.summary.regions.iter())?),
        (cleaned_path.clone(), csv_bytes(&cleaned_path, cleaned.iter())?),
        (bundle_path, bundle_json_bytes(&listed)?),
    ];
    write_all_or_nothing(&files)?;

    for a in &artifacts {
        tracing::info!(kind = %a.kind, path = %a.path.display(), "artifact_written");
    }
    Ok(artifacts)
}

fn artifact(kind: &str, path: PathBuf) -> Artifact {
    Artifact {
        kind: kind.to_string(),
        path,
    }
}

fn predictions_csv_bytes(path: &Path, bundle: &ResultBundle) -> Result<Vec<u8>, AppError> {
    let rows = bundle.prediction.rows.iter().map(|p| PredictionRow {
        date: bundle
            .date_for(p.day_index)
            .map(|d| d.to_string())
            .unwrap_or_default(),
        day_index: p.day_index,
        region: bundle.regions.decode(p.region_code).unwrap_or(""),
        product_id: bundle.products.decode(p.product_code).unwrap_or(""),
        predicted_amount: p.predicted_amount,
    });
    csv_bytes(path, rows)
}

fn write_csv<S, I>(path: &Path, rows: I) -> Result<(), AppError>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let bytes = csv_bytes(path, rows)?;
    write_atomic(path, &bytes)
}

/// Render rows as CSV in memory; `path` only labels errors.
fn csv_bytes<S, I>(path: &Path, rows: I) -> Result<Vec<u8>, AppError>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::io(format!("Failed to encode CSV row for '{}': {e}", path.display())))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::io(format!("Failed to finish CSV '{}': {e}", path.display())))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    path.with_file_name(tmp_name)
}

/// Write `bytes` to a temporary sibling of `path`, then rename it into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    write_all_or_nothing(&[(path.to_path_buf(), bytes.to_vec())])
}

/// Stage every file, then rename them all into place.
fn write_all_or_nothing(files: &[(PathBuf, Vec<u8>)]) -> Result<(), AppError> {
    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        let tmp = tmp_sibling(path);
        if let Err(e) = fs::write(&tmp, bytes) {
            let _ = fs::remove_file(&tmp);
            remove_all(&staged);
            return Err(AppError::io(format!("Failed to write '{}': {e}", tmp.display())));
        }
        staged.push(tmp);
    }

    for (idx, (path, _)) in files.iter().enumerate() {
        if let Err(e) = fs::rename(&staged[idx], path) {
            let committed: Vec<PathBuf> = files[..idx].iter().map(|(p, _)| p.clone()).collect();
            remove_all(&committed);
            remove_all(&staged[idx..]);
            return Err(AppError::io(format!(
                "Failed to move output into '{}': {e}",
                path.display()
            )));
        }
    }
    Ok(())
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        let _ = fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRecord;
    use crate::io::ingest::load_record_set;
    use chrono::NaiveDate;

    #[test]
    fn cleaned_csv_can_be_reingested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleaned.csv");
        let records = vec![CleanedRecord {
            date: NaiveDate::from_ymd_opt(2025, 10, 25).unwrap(),
            product_id: "001".to_string(),
            sales_amount: 1234.5,
            region: "North".to_string(),
        }];
        write_cleaned_csv(&path, &records).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("date,product_id,sales_amount,region"));
        let set = load_record_set(&path).unwrap();
        assert_eq!(set.records()[0].sales_amount.as_deref(), Some("1234.5"));
        assert!(!dir.path().join("cleaned.csv.tmp").exists());
    }

    #[test]
    fn record_set_keeps_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let set: RecordSet = vec![RawRecord {
            position: 1,
            date: Some("2025-01-01".to_string()),
            product_id: Some("P1".to_string()),
            sales_amount: None,
            region: Some("East".to_string()),
        }]
        .into_iter()
        .collect();
        write_record_set_csv(&path, &set).unwrap();
        let back = load_record_set(&path).unwrap();
        assert_eq!(back, set);
    }

    fn tiny_bundle() -> ResultBundle {
        use crate::domain::{CleaningSummary, MetricsReport, Prediction, PredictionSet, RegionSummary, Summary};
        use crate::features::CategoryEncoder;
        ResultBundle {
            summary: Summary {
                total_sales: 30.0,
                avg_daily_sales: 30.0,
                top_region: Some("East".to_string()),
                top_region_code: Some(0),
                data_days: 1,
                regions: vec![RegionSummary {
                    region: "East".to_string(),
                    total_sales: 30.0,
                    mean_sales: 30.0,
                    median_sales: 30.0,
                    order_count: 1,
                    coverage_days: 1,
                    rank: 1,
                }],
            },
            daily_sales: Vec::new(),
            prediction: PredictionSet {
                rows: vec![Prediction {
                    day_index: 1,
                    region_code: 0,
                    product_code: 0,
                    predicted_amount: 31.5,
                }],
            },
            metrics: MetricsReport { mae: 1.0, rmse: 1.5, train_rows: 8, holdout_rows: 2 },
            cleaning: CleaningSummary::default(),
            regions: CategoryEncoder::from_labels(["East"]),
            products: CategoryEncoder::from_labels(["P1"]),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            artifacts: Vec::new(),
        }
    }

    const EXPORT_NAMES: [&str; 4] = ["predictions.csv", "region_summary.csv", "cleaned.csv", "bundle.json"];

    #[test]
    fn export_set_lists_itself_in_the_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = write_exports(dir.path(), &tiny_bundle(), &[]).unwrap();
        assert_eq!(artifacts.len(), 4);
        for name in EXPORT_NAMES {
            assert!(dir.path().join(name).exists(), "{name}");
            assert!(!dir.path().join(format!("{name}.tmp")).exists(), "{name}.tmp");
        }
        let back = crate::io::bundle::read_bundle_json(&dir.path().join("bundle.json")).unwrap();
        assert_eq!(back.artifacts, artifacts);

        let predictions = fs::read_to_string(dir.path().join("predictions.csv")).unwrap();
        assert_eq!(predictions.lines().nth(1), Some("2025-01-02,1,East,P1,31.5"));
    }

    #[test]
    fn failed_staging_leaves_no_export() {
        let dir = tempfile::tempdir().unwrap();
        // a directory in the way of the third staged file
        fs::create_dir(dir.path().join("cleaned.csv.tmp")).unwrap();
        assert!(write_exports(dir.path(), &tiny_bundle(), &[]).is_err());
        for name in EXPORT_NAMES {
            assert!(!dir.path().join(name).exists(), "{name}");
        }
        assert!(!dir.path().join("predictions.csv.tmp").exists());
        assert!(!dir.path().join("region_summary.csv.tmp").exists());
    }

    #[test]
    fn failed_rename_rolls_back_earlier_exports() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("bundle.json").join("occupied")).unwrap();
        assert!(write_exports(dir.path(), &tiny_bundle(), &[]).is_err());
        for name in &EXPORT_NAMES[..3] {
            assert!(!dir.path().join(name).exists(), "{name}");
        }
        assert!(!dir.path().join("bundle.json.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }
}
