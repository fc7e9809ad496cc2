//! IQR outlier fences, computed per region.

use std::collections::BTreeMap;

use crate::domain::{CleanedRecord, OutlierPolicy};
use crate::math::quantile_lower;

/// Inclusive bounds outside which an amount is an outlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fences {
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    /// `[Q1 - k*IQR, Q3 + k*IQR]` with order-statistic quartiles.
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        let q1 = quantile_lower(values, 0.25)?;
        let q3 = quantile_lower(values, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.lower, self.upper)
    }
}

/// Result of outlier handling over a batch of records.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierOutcome {
    pub records: Vec<CleanedRecord>,
    pub clipped: usize,
    pub removed: usize,
}

/// Apply per-region fences to `records`, keeping input order.
pub fn handle_outliers(
    records: Vec<CleanedRecord>,
    policy: OutlierPolicy,
    multiplier: f64,
) -> OutlierOutcome {
    let mut by_region: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in &records {
        by_region
            .entry(record.region.as_str())
            .or_default()
            .push(record.sales_amount);
    }
    let fences: BTreeMap<String, Fences> = by_region
        .into_iter()
        .filter_map(|(region, values)| {
            Fences::from_values(&values, multiplier).map(|f| (region.to_string(), f))
        })
        .collect();

    let mut clipped = 0;
    let mut removed = 0;
    let mut kept = Vec::with_capacity(records.len());
    for mut record in records {
        let Some(fence) = fences.get(&record.region) else {
            kept.push(record);
            continue;
        };
        if fence.contains(record.sales_amount) {
            kept.push(record);
            continue;
        }
        match policy {
            OutlierPolicy::Clip => {
                record.sales_amount = fence.clip(record.sales_amount);
                clipped += 1;
                kept.push(record);
            }
            OutlierPolicy::Remove => removed += 1,
        }
    }

    OutlierOutcome {
        records: kept,
        clipped,
        removed,
    }
}
