//! Synthetic sales dataset generation.
//!
//! Each (region, product) series follows a base level with a mild linear
//! trend, a weekly cycle and log-normal noise. A small share of rows is then
//! damaged the way real exports are: blank amounts, spikes, negative refunds.

use chrono::{Datelike, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{RawRecord, RecordSet};
use crate::error::AppError;

/// Knobs for `generate_sample`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    pub start_date: NaiveDate,
    pub days: u32,
    pub regions: Vec<String>,
    pub products: Vec<String>,
    /// Share of rows with a blank amount.
    pub missing_rate: f64,
    /// Share of rows multiplied by `spike_factor`.
    pub spike_rate: f64,
    pub spike_factor: f64,
    /// Share of rows recorded as a negative refund.
    pub negative_rate: f64,
    /// Daily log-volatility of the noise.
    pub volatility: f64,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap_or_default(),
            days: 31,
            regions: ["华北", "华东", "华南", "West"].map(String::from).to_vec(),
            products: ["P001", "P002", "P003"].map(String::from).to_vec(),
            missing_rate: 0.02,
            spike_rate: 0.01,
            spike_factor: 8.0,
            negative_rate: 0.005,
            volatility: 0.12,
            seed: 42,
        }
    }
}

impl SampleSpec {
    fn validate(&self) -> Result<(), AppError> {
        if self.days == 0 {
            return Err(AppError::config("Sample day count must be > 0."));
        }
        if self.regions.is_empty() || self.products.is_empty() {
            return Err(AppError::config("Sample needs at least one region and one product."));
        }
        let rates = [self.missing_rate, self.spike_rate, self.negative_rate];
        if rates.iter().any(|r| !(0.0..1.0).contains(r)) || rates.iter().sum::<f64>() >= 1.0 {
            return Err(AppError::config("Invalid sample damage rates."));
        }
        if !(self.spike_factor.is_finite() && self.spike_factor > 0.0) {
            return Err(AppError::config("Invalid sample spike factor."));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0) {
            return Err(AppError::config("Invalid sample volatility."));
        }
        Ok(())
    }
}

/// Generate a raw record set: one row per day x region x product, day-major.
pub fn generate_sample(spec: &SampleSpec) -> Result<RecordSet, AppError> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::model(format!("Noise distribution error: {e}")))?;

    // Series levels are drawn up front so they do not depend on the day loop.
    let mut levels = Vec::with_capacity(spec.regions.len() * spec.products.len());
    for _ in &spec.regions {
        for _ in &spec.products {
            let base = rng.gen_range(500.0..3000.0);
            let trend = rng.gen_range(-0.003..0.006);
            levels.push((base, trend));
        }
    }

    let sigma = spec.volatility;
    let mut records = RecordSet::default();
    for day in 0..spec.days {
        let date = spec
            .start_date
            .checked_add_days(chrono::Days::new(u64::from(day)))
            .ok_or_else(|| AppError::config("Sample date range overflows the calendar."))?;
        let weekday = f64::from(date.weekday().num_days_from_monday());
        let weekly = 1.0 + 0.15 * (std::f64::consts::TAU * weekday / 7.0).sin();

        for (r_idx, region) in spec.regions.iter().enumerate() {
            for (p_idx, product) in spec.products.iter().enumerate() {
                let (base, trend) = levels[r_idx * spec.products.len() + p_idx];
                let z: f64 = normal.sample(&mut rng);
                // mean-corrected log-normal noise
                let noise = (sigma * z - 0.5 * sigma * sigma).exp();
                let mut amount = base * (1.0 + trend * f64::from(day)) * weekly * noise;

                let u: f64 = rng.r#gen();
                let sales_amount = if u < spec.missing_rate {
                    None
                } else if u < spec.missing_rate + spec.spike_rate {
                    amount *= spec.spike_factor;
                    Some(format!("{amount:.2}"))
                } else if u < spec.missing_rate + spec.spike_rate + spec.negative_rate {
                    Some(format!("{:.2}", -amount))
                } else {
                    Some(format!("{amount:.2}"))
                };

                let position = records.len() + 1;
                records.push(RawRecord {
                    position,
                    date: Some(date.format("%Y-%m-%d").to_string()),
                    product_id: Some(product.clone()),
                    sales_amount,
                    region: Some(region.clone()),
                });
            }
        }
    }

    tracing::info!(
        records = records.len(),
        days = spec.days,
        series = levels.len(),
        seed = spec.seed,
        "sample_generated"
    );
    Ok(records)
}
