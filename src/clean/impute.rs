//! Missing-amount imputation.
//!
//! The fallback chain is an explicit, ordered list of rules. The first rule
//! that can produce a value wins; when none can, the record is dropped.

use std::collections::BTreeMap;

use crate::domain::ImputeStrategy;
use crate::math::{mean, median};

/// One step of the imputation fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputeRule {
    /// Statistic over observed amounts of the same region and product.
    GroupStatistic,
    /// Statistic over every observed amount.
    OverallStatistic,
}

/// Ordered imputation rules plus the statistic they use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImputationPolicy {
    pub strategy: ImputeStrategy,
    pub rules: Vec<ImputeRule>,
}

impl ImputationPolicy {
    /// Group statistic, then overall statistic, then drop.
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            rules: vec![ImputeRule::GroupStatistic, ImputeRule::OverallStatistic],
        }
    }

    /// Precompute the statistics each rule needs from the observed amounts.
    pub fn prepare(&self, observed: &ObservedAmounts) -> Imputer {
        let stat = |values: &[f64]| match self.strategy {
            ImputeStrategy::Mean => mean(values),
            ImputeStrategy::Median => median(values),
        };
        let groups = observed
            .by_group
            .iter()
            .filter_map(|(key, values)| stat(values.as_slice()).map(|v| (key.clone(), v)))
            .collect();
        Imputer {
            rules: self.rules.clone(),
            groups,
            overall: stat(observed.all.as_slice()),
        }
    }
}

/// Observed (non-missing, non-negative) amounts collected before imputation.
#[derive(Debug, Clone, Default)]
pub struct ObservedAmounts {
    by_group: BTreeMap<(String, String), Vec<f64>>,
    all: Vec<f64>,
}

impl ObservedAmounts {
    pub fn record(&mut self, region: &str, product_id: &str, amount: f64) {
        self.by_group
            .entry((region.to_string(), product_id.to_string()))
            .or_default()
            .push(amount);
        self.all.push(amount);
    }
}

/// Imputation statistics ready to fill missing amounts.
#[derive(Debug, Clone)]
pub struct Imputer {
    rules: Vec<ImputeRule>,
    groups: BTreeMap<(String, String), f64>,
    overall: Option<f64>,
}

impl Imputer {
    /// Fill value for a missing amount and the rule that produced it.
    pub fn impute(&self, region: &str, product_id: &str) -> Option<(f64, ImputeRule)> {
        self.rules.iter().find_map(|&rule| {
            let value = match rule {
                ImputeRule::GroupStatistic => self
                    .groups
                    .get(&(region.to_string(), product_id.to_string()))
                    .copied(),
                ImputeRule::OverallStatistic => self.overall,
            };
            value.map(|v| (v, rule))
        })
    }
}
