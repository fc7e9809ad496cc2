//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages in memory
//! - exported to JSON/CSV
//! - reloaded later for printing or charting

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::features::CategoryEncoder;

/// Names of the columns every input must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "product_id", "sales_amount", "region"];

/// Column name -> column values, as handed over by the ingestion boundary.
///
/// Every column must have one entry per data row; `None` marks an empty cell.
pub type ColumnTable = BTreeMap<String, Vec<Option<String>>>;

/// One sales transaction exactly as ingested.
///
/// Values are kept as text; the cleaner owns parsing so malformed values can be
/// reported with their position and column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    /// 1-based data row position in the source (header excluded).
    pub position: usize,
    pub date: Option<String>,
    pub product_id: Option<String>,
    pub sales_amount: Option<String>,
    pub region: Option<String>,
}

/// Ordered raw records sharing one schema. Order is file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordSet {
    records: Vec<RawRecord>,
}

impl RecordSet {
    pub fn records(&self) -> &[RawRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: RawRecord) {
        self.records.push(record);
    }
}

impl FromIterator<RawRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = RawRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// A record that passed cleaning. No field is ever absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub date: NaiveDate,
    pub product_id: String,
    pub sales_amount: f64,
    pub region: String,
}

impl CleanedRecord {
    /// Re-express the record in raw form (ISO date, shortest round-trip amount).
    pub fn to_raw(&self, position: usize) -> RawRecord {
        RawRecord {
            position,
            date: Some(self.date.format("%Y-%m-%d").to_string()),
            product_id: Some(self.product_id.clone()),
            sales_amount: Some(self.sales_amount.to_string()),
            region: Some(self.region.clone()),
        }
    }
}

/// Counts describing what the cleaner did to a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub input_records: usize,
    pub output_records: usize,
    /// Records whose missing amount was filled in.
    pub imputed: usize,
    /// Records whose amount was clipped to an outlier fence.
    pub clipped: usize,
    /// Records removed as outliers (only with `OutlierPolicy::Remove`).
    pub removed_outliers: usize,
    pub dropped_missing_key: usize,
    pub dropped_negative: usize,
    pub dropped_unimputable: usize,
}

impl CleaningSummary {
    /// Records dropped before outlier handling.
    pub fn dropped(&self) -> usize {
        self.dropped_missing_key + self.dropped_negative + self.dropped_unimputable
    }
}

/// Cleaner output: surviving records (input order) plus the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedSet {
    pub records: Vec<CleanedRecord>,
    pub summary: CleaningSummary,
}

impl CleanedSet {
    /// Convert back into a raw record set, numbering positions from 1.
    pub fn to_record_set(&self) -> RecordSet {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, r)| r.to_raw(idx + 1))
            .collect()
    }
}

/// Identifies one (region, product) time series by its codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub region_code: u32,
    pub product_code: u32,
}

/// One engineered observation for a (region, product, day) key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Days since the earliest cleaned date.
    pub day_index: u32,
    pub region_code: u32,
    pub product_code: u32,
    pub trailing_mean: f64,
    /// Prior observations inside the trailing window (0 = cumulative-mean fallback).
    pub trailing_count: u32,
    /// Summed sales for the key; `None` for future rows.
    pub target: Option<f64>,
}

/// Number of model inputs derived from a `FeatureRow`.
pub const FEATURE_COUNT: usize = 5;

impl FeatureRow {
    pub fn series(&self) -> SeriesKey {
        SeriesKey {
            region_code: self.region_code,
            product_code: self.product_code,
        }
    }

    /// Model input vector.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.day_index),
            f64::from(self.region_code),
            f64::from(self.product_code),
            self.trailing_mean,
            f64::from(self.trailing_count),
        ]
    }
}

/// One forecast value for a (region, product, future day) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub day_index: u32,
    pub region_code: u32,
    pub product_code: u32,
    pub predicted_amount: f64,
}

/// Ordered forecast rows: day-major, then series order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PredictionSet {
    pub rows: Vec<Prediction>,
}

impl PredictionSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total predicted amount per future day, ascending by day.
    pub fn daily_totals(&self) -> Vec<(u32, f64)> {
        let mut totals: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for row in &self.rows {
            totals.entry(row.day_index).or_default().push(row.predicted_amount);
        }
        totals
            .into_iter()
            .map(|(day, values)| (day, crate::math::stable_sum(&values)))
            .collect()
    }
}

/// Holdout accuracy of the forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub mae: f64,
    pub rmse: f64,
    pub train_rows: usize,
    pub holdout_rows: usize,
}

/// Per-region breakdown of cleaned sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub total_sales: f64,
    /// Mean amount per cleaned record.
    pub mean_sales: f64,
    pub median_sales: f64,
    pub order_count: usize,
    /// Distinct days with at least one record.
    pub coverage_days: usize,
    /// 1 = highest total; ties share the lower rank.
    pub rank: usize,
}

/// Headline statistics for the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_sales: f64,
    /// Total divided by the number of distinct days.
    pub avg_daily_sales: f64,
    pub top_region: Option<String>,
    pub top_region_code: Option<u32>,
    pub data_days: usize,
    /// Sorted by total, descending.
    pub regions: Vec<RegionSummary>,
}

/// Total cleaned sales for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub day_index: u32,
    pub date: NaiveDate,
    pub total: f64,
}

/// File produced by an exporter from a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: String,
    pub path: PathBuf,
}

/// Everything one pipeline run hands to reporting collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub summary: Summary,
    pub daily_sales: Vec<DailySales>,
    pub prediction: PredictionSet,
    pub metrics: MetricsReport,
    pub cleaning: CleaningSummary,
    pub regions: CategoryEncoder,
    pub products: CategoryEncoder,
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl ResultBundle {
    /// Calendar date for a day index of this run.
    pub fn date_for(&self, day_index: u32) -> Option<NaiveDate> {
        self.start_date?
            .checked_add_days(chrono::Days::new(u64::from(day_index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_record_round_trips_to_raw_text() {
        let record = CleanedRecord {
            date: NaiveDate::from_ymd_opt(2025, 10, 3).unwrap(),
            product_id: "P1".to_string(),
            sales_amount: 1234.5,
            region: "East".to_string(),
        };
        let raw = record.to_raw(4);
        assert_eq!(raw.position, 4);
        assert_eq!(raw.date.as_deref(), Some("2025-10-03"));
        assert_eq!(raw.sales_amount.as_deref(), Some("1234.5"));
    }

    #[test]
    fn daily_totals_group_by_day() {
        let set = PredictionSet {
            rows: vec![
                Prediction { day_index: 31, region_code: 0, product_code: 0, predicted_amount: 10.0 },
                Prediction { day_index: 31, region_code: 1, product_code: 0, predicted_amount: 5.0 },
                Prediction { day_index: 32, region_code: 0, product_code: 0, predicted_amount: 7.0 },
            ],
        };
        assert_eq!(set.daily_totals(), vec![(31, 15.0), (32, 7.0)]);
    }
}
