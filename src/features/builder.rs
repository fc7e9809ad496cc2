//! Per-series feature engineering.
//!
//! Cleaned records are aggregated to one observation per (region, product,
//! day) and each observation gets trailing aggregates computed from earlier
//! days of the same series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{CleanedRecord, FeatureRow, SeriesKey};
use crate::features::CategoryEncoder;
use crate::math::{mean, stable_sum};

/// Engineered rows plus the encoders needed to read them back.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    /// Sorted by `(day_index, region_code, product_code)`.
    pub rows: Vec<FeatureRow>,
    pub regions: CategoryEncoder,
    pub products: CategoryEncoder,
    /// Earliest cleaned date; `day_index` counts from here.
    pub start_date: Option<NaiveDate>,
    pub window_days: u32,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows with an observed target, in chronological order.
    pub fn historical(&self) -> impl Iterator<Item = &FeatureRow> + '_ {
        self.rows.iter().filter(|row| row.target.is_some())
    }

    pub fn series_keys(&self) -> BTreeSet<SeriesKey> {
        self.rows.iter().map(FeatureRow::series).collect()
    }

    pub fn last_day(&self) -> Option<u32> {
        self.rows.iter().map(|row| row.day_index).max()
    }

    pub fn date_for(&self, day_index: u32) -> Option<NaiveDate> {
        self.start_date?
            .checked_add_days(chrono::Days::new(u64::from(day_index)))
    }
}

/// Builds a `FeatureTable` from cleaned records.
#[derive(Debug, Clone, Copy)]
pub struct FeatureBuilder {
    window_days: u32,
}

impl FeatureBuilder {
    pub fn new(window_days: u32) -> Self {
        Self {
            window_days: window_days.max(1),
        }
    }

    pub fn build(&self, cleaned: &[CleanedRecord]) -> FeatureTable {
        let Some(start_date) = cleaned.iter().map(|r| r.date).min() else {
            return FeatureTable {
                rows: Vec::new(),
                regions: CategoryEncoder::default(),
                products: CategoryEncoder::default(),
                start_date: None,
                window_days: self.window_days,
            };
        };

        let regions = CategoryEncoder::from_labels(cleaned.iter().map(|r| r.region.as_str()));
        let products = CategoryEncoder::from_labels(cleaned.iter().map(|r| r.product_id.as_str()));

        // series -> day -> amounts recorded that day
        let mut grouped: BTreeMap<SeriesKey, BTreeMap<u32, Vec<f64>>> = BTreeMap::new();
        for record in cleaned {
            let (Some(region_code), Some(product_code)) = (
                regions.encode(&record.region),
                products.encode(&record.product_id),
            ) else {
                continue;
            };
            let day_index = (record.date - start_date).num_days() as u32;
            grouped
                .entry(SeriesKey {
                    region_code,
                    product_code,
                })
                .or_default()
                .entry(day_index)
                .or_default()
                .push(record.sales_amount);
        }

        let mut rows = Vec::with_capacity(cleaned.len());
        for (series, days) in &grouped {
            let observations: Vec<(u32, f64)> = days
                .iter()
                .map(|(&day, amounts)| (day, stable_sum(amounts)))
                .collect();
            rows.extend(self.series_rows(*series, &observations));
        }
        rows.sort_by_key(|row| (row.day_index, row.region_code, row.product_code));

        tracing::info!(
            rows = rows.len(),
            series = grouped.len(),
            regions = regions.len(),
            products = products.len(),
            window_days = self.window_days,
            "features_built"
        );

        FeatureTable {
            rows,
            regions,
            products,
            start_date: Some(start_date),
            window_days: self.window_days,
        }
    }

    /// Rows for one series; `observations` is ascending by day.
    fn series_rows(&self, series: SeriesKey, observations: &[(u32, f64)]) -> Vec<FeatureRow> {
        let mut rows = Vec::with_capacity(observations.len());
        let mut window_start = 0usize;

        for (idx, &(day, amount)) in observations.iter().enumerate() {
            let earliest = day.saturating_sub(self.window_days);
            while window_start < idx && observations[window_start].0 < earliest {
                window_start += 1;
            }
            let prior: Vec<f64> = observations[window_start..idx]
                .iter()
                .map(|&(_, v)| v)
                .collect();

            let (trailing_mean, trailing_count) = match mean(&prior) {
                Some(m) => (m, prior.len() as u32),
                None => {
                    // cumulative mean of earlier days; the first day only has itself
                    let earlier: Vec<f64> = observations[..idx].iter().map(|&(_, v)| v).collect();
                    (mean(&earlier).unwrap_or(amount), 0)
                }
            };

            rows.push(FeatureRow {
                day_index: day,
                region_code: series.region_code,
                product_code: series.product_code,
                trailing_mean,
                trailing_count,
                target: Some(amount),
            });
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(date: &str, region: &str, product: &str, amount: f64) -> CleanedRecord {
        CleanedRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            product_id: product.to_string(),
            sales_amount: amount,
            region: region.to_string(),
        }
    }

    #[test]
    fn duplicate_keys_are_summed() {
        let table = FeatureBuilder::new(7).build(&[
            rec("2025-01-01", "East", "P1", 10.0),
            rec("2025-01-01", "East", "P1", 15.0),
            rec("2025-01-02", "East", "P1", 5.0),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].target, Some(25.0));
        assert_eq!(table.rows[1].target, Some(5.0));
    }

    #[test]
    fn day_index_is_monotone_in_date() {
        let table = FeatureBuilder::new(7).build(&[
            rec("2025-01-05", "West", "P1", 1.0),
            rec("2025-01-01", "East", "P2", 1.0),
            rec("2025-01-05", "East", "P1", 1.0),
            rec("2025-01-03", "West", "P2", 1.0),
        ]);
        let days: Vec<u32> = table.rows.iter().map(|r| r.day_index).collect();
        assert_eq!(days, vec![0, 2, 4, 4]);
        assert_eq!(table.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(table.date_for(4), NaiveDate::from_ymd_opt(2025, 1, 5));
        assert_eq!(table.regions.labels(), ["East", "West"]);
    }

    #[test]
    fn trailing_window_excludes_current_and_stale_days() {
        let table = FeatureBuilder::new(2).build(&[
            rec("2025-01-01", "East", "P1", 10.0),
            rec("2025-01-02", "East", "P1", 20.0),
            rec("2025-01-03", "East", "P1", 30.0),
            rec("2025-01-10", "East", "P1", 40.0),
        ]);
        let r = &table.rows;
        // first day has no history but its own amount
        assert_eq!((r[0].trailing_count, r[0].trailing_mean), (0, 10.0));
        assert_eq!((r[1].trailing_count, r[1].trailing_mean), (1, 10.0));
        assert_eq!((r[2].trailing_count, r[2].trailing_mean), (2, 15.0));
        // gap longer than the window: cumulative mean of the earlier days
        assert_eq!((r[3].trailing_count, r[3].trailing_mean), (0, 20.0));
    }

    #[test]
    fn gap_fallback_ignores_the_rows_own_amount() {
        let mut means = Vec::new();
        for last in [40.0, 400.0, 4000.0] {
            let table = FeatureBuilder::new(2).build(&[
                rec("2025-01-01", "East", "P1", 10.0),
                rec("2025-01-02", "East", "P1", 20.0),
                rec("2025-01-03", "East", "P1", 30.0),
                rec("2025-01-10", "East", "P1", last),
            ]);
            let row = &table.rows[3];
            assert_eq!(row.target, Some(last));
            assert_eq!(row.trailing_count, 0);
            means.push(row.trailing_mean);
        }
        assert_eq!(means, vec![20.0, 20.0, 20.0]);
    }

    #[test]
    fn constant_series_has_constant_trailing_mean() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let records: Vec<CleanedRecord> = (0..31)
            .map(|d| CleanedRecord {
                date: start + chrono::Days::new(d),
                product_id: "P1".to_string(),
                sales_amount: 100.0,
                region: "East".to_string(),
            })
            .collect();
        let table = FeatureBuilder::new(7).build(&records);
        assert_eq!(table.len(), 31);
        assert!(table.rows.iter().all(|r| r.trailing_mean == 100.0));
        assert_eq!(table.last_day(), Some(30));
    }

    #[test]
    fn targets_conserve_series_totals() {
        let records = vec![
            rec("2025-01-01", "East", "P1", 1.25),
            rec("2025-01-01", "East", "P1", 2.5),
            rec("2025-01-02", "West", "P1", 7.0),
            rec("2025-01-04", "East", "P1", 0.75),
            rec("2025-01-04", "West", "P1", 3.0),
        ];
        let table = FeatureBuilder::new(7).build(&records);
        for key in table.series_keys() {
            let region = table.regions.decode(key.region_code).unwrap();
            let product = table.products.decode(key.product_code).unwrap();
            let expected: f64 = records
                .iter()
                .filter(|r| r.region == region && r.product_id == product)
                .map(|r| r.sales_amount)
                .sum();
            let actual: f64 = table
                .rows
                .iter()
                .filter(|r| r.series() == key)
                .filter_map(|r| r.target)
                .sum();
            assert!((expected - actual).abs() < 1e-9);
        }
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = FeatureBuilder::new(7).build(&[]);
        assert!(table.is_empty());
        assert_eq!(table.start_date, None);
        assert_eq!(table.last_day(), None);
    }
}
