//! Small statistics helpers shared by cleaning, reporting and evaluation.
//!
//! Everything here is deterministic for a given input slice:
//! - order-sensitive reductions (sums) sort their input first
//! - quantiles are order statistics, never interpolated

use std::cmp::Ordering;

/// Sum of values, reduced in sorted order so the result does not depend on
/// the order the caller collected them in.
pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.iter().sum()
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(stable_sum(values) / values.len() as f64)
}

/// Median (average of the two middle values for even lengths).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Lower order-statistic quantile: `sorted[floor(q * (n - 1))]`.
///
/// Clipping values beyond fences derived from these quartiles never moves the
/// quartiles themselves, which keeps outlier clipping a fixed point.
pub fn quantile_lower(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let idx = (q * (sorted.len() - 1) as f64).floor() as usize;
    sorted.get(idx).copied()
}

/// Count of distinct values (exact comparison).
pub fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    sorted.len()
}

/// Mean absolute error. Slices must have equal, non-zero length.
pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let errors: Vec<f64> = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .collect();
    mean(&errors)
}

/// Root mean squared error. Slices must have equal, non-zero length.
pub fn root_mean_squared_error(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return None;
    }
    let squared: Vec<f64> = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).powi(2))
        .collect();
    mean(&squared).map(f64::sqrt)
}
