//! Record cleaning: keys, dates, amounts, imputation and outliers.
//!
//! Cleaning never reorders records. It is deterministic, and with
//! `OutlierPolicy::Clip` re-cleaning a cleaned set yields the same records.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::clean::impute::{ImputationPolicy, ObservedAmounts};
use crate::clean::outliers::handle_outliers;
use crate::domain::{CleanedRecord, CleanedSet, CleaningSummary, OutlierPolicy, PipelineConfig, RecordSet};
use crate::error::AppError;

/// Unambiguous layouts tried when the configured date format does not match.
const DATE_FALLBACKS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// A record that passed key/date/amount checks, amount possibly missing.
struct Pending {
    date: NaiveDate,
    product_id: String,
    region: String,
    amount: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Cleaner {
    date_format: String,
    imputation: ImputationPolicy,
    outlier_policy: OutlierPolicy,
    outlier_multiplier: f64,
    region_aliases: BTreeMap<String, String>,
}

impl Cleaner {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            date_format: config.date_format.clone(),
            imputation: ImputationPolicy::new(config.impute),
            outlier_policy: config.outlier_policy,
            outlier_multiplier: config.outlier_multiplier,
            region_aliases: config.region_aliases.clone(),
        }
    }

    /// Replace the imputation chain (e.g. to disable the overall fallback).
    pub fn with_imputation(mut self, policy: ImputationPolicy) -> Self {
        self.imputation = policy;
        self
    }

    pub fn clean(&self, raw: &RecordSet) -> Result<CleanedSet, AppError> {
        let mut summary = CleaningSummary {
            input_records: raw.len(),
            ..Default::default()
        };

        let mut pending = Vec::with_capacity(raw.len());
        let mut observed = ObservedAmounts::default();

        for record in raw.records() {
            let region = non_empty(record.region.as_deref()).map(|r| self.canonical_region(r));
            let product_id = non_empty(record.product_id.as_deref());
            let (Some(region), Some(product_id)) = (region, product_id) else {
                summary.dropped_missing_key += 1;
                continue;
            };

            let date = self.parse_date(record.date.as_deref()).map_err(|e| {
                e.at_row(record.position).in_column("date")
            })?;
            let amount = parse_amount(record.sales_amount.as_deref())
                .map_err(|e| e.at_row(record.position).in_column("sales_amount"))?;

            if let Some(value) = amount {
                if value < 0.0 {
                    summary.dropped_negative += 1;
                    continue;
                }
                observed.record(&region, product_id, value);
            }

            pending.push(Pending {
                date,
                product_id: product_id.to_string(),
                region,
                amount,
            });
        }

        let imputer = self.imputation.prepare(&observed);
        let mut filled = Vec::with_capacity(pending.len());
        for p in pending {
            let sales_amount = match p.amount {
                Some(v) => v,
                None => match imputer.impute(&p.region, &p.product_id) {
                    Some((v, _rule)) => {
                        summary.imputed += 1;
                        v
                    }
                    None => {
                        summary.dropped_unimputable += 1;
                        continue;
                    }
                },
            };
            filled.push(CleanedRecord {
                date: p.date,
                product_id: p.product_id,
                sales_amount,
                region: p.region,
            });
        }

        let outcome = handle_outliers(filled, self.outlier_policy, self.outlier_multiplier);
        summary.clipped = outcome.clipped;
        summary.removed_outliers = outcome.removed;
        summary.output_records = outcome.records.len();

        tracing::info!(
            input = summary.input_records,
            output = summary.output_records,
            imputed = summary.imputed,
            clipped = summary.clipped,
            removed_outliers = summary.removed_outliers,
            dropped = summary.dropped(),
            "cleaning_completed"
        );

        Ok(CleanedSet {
            records: outcome.records,
            summary,
        })
    }

    fn canonical_region(&self, region: &str) -> String {
        self.region_aliases
            .get(region)
            .cloned()
            .unwrap_or_else(|| region.to_string())
    }

    fn parse_date(&self, text: Option<&str>) -> Result<NaiveDate, AppError> {
        let Some(text) = non_empty(text) else {
            return Err(AppError::format("Missing date."));
        };
        std::iter::once(self.date_format.as_str())
            .chain(DATE_FALLBACKS)
            .find_map(|fmt| parse_date_with(text, fmt))
            .ok_or_else(|| {
                AppError::format(format!(
                    "Invalid date '{text}'. Expected `{}` or an ISO date (YYYY-MM-DD).",
                    self.date_format
                ))
            })
    }
}

fn parse_date_with(text: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, fmt)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(text, fmt).ok().map(|dt| dt.date()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// `Ok(None)` for a missing amount; thousands separators are ignored.
fn parse_amount(text: Option<&str>) -> Result<Option<f64>, AppError> {
    let Some(text) = non_empty(text) else {
        return Ok(None);
    };
    let digits: String = text.chars().filter(|&c| c != ',').collect();
    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(AppError::format(format!("Invalid sales amount '{text}'."))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ImputeStrategy, RawRecord};
    use crate::error::ErrorKind;

    fn raw(position: usize, date: &str, product: &str, amount: Option<&str>, region: &str) -> RawRecord {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        RawRecord {
            position,
            date: opt(date),
            product_id: opt(product),
            sales_amount: amount.map(str::to_string),
            region: opt(region),
        }
    }

    fn cleaner() -> Cleaner {
        Cleaner::new(&PipelineConfig::default())
    }

    #[test]
    fn imputes_group_mean() {
        let set: RecordSet = vec![
            raw(1, "2025-01-01", "P1", Some("90"), "East"),
            raw(2, "2025-01-02", "P1", Some("100"), "East"),
            raw(3, "2025-01-03", "P1", Some("110"), "East"),
            raw(4, "2025-01-04", "P1", None, "East"),
        ]
        .into_iter()
        .collect();
        let out = cleaner().clean(&set).unwrap();
        assert_eq!(out.records.len(), 4);
        assert_eq!(out.records[3].sales_amount, 100.0);
        assert_eq!(out.summary.imputed, 1);
    }

    #[test]
    fn bad_date_reports_position_and_column() {
        let set: RecordSet = vec![
            raw(1, "2025-01-01", "P1", Some("10"), "East"),
            raw(2, "not-a-date", "P1", Some("10"), "East"),
        ]
        .into_iter()
        .collect();
        let err = cleaner().clean(&set).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.row(), Some(2));
        assert_eq!(err.column(), Some("date"));
    }

    #[test]
    fn bad_amount_reports_column() {
        let set: RecordSet = vec![raw(5, "2025-01-01", "P1", Some("12abc"), "East")]
            .into_iter()
            .collect();
        let err = cleaner().clean(&set).unwrap_err();
        assert_eq!(err.row(), Some(5));
        assert_eq!(err.column(), Some("sales_amount"));
    }

    #[test]
    fn accepts_fallback_dates_and_thousands_separators() {
        let set: RecordSet = vec![
            raw(1, "2025/01/02", "P1", Some("1,250.5"), "East"),
            raw(2, "2025-01-03 08:30:00", "P1", Some("1,000"), "East"),
        ]
        .into_iter()
        .collect();
        let out = cleaner().clean(&set).unwrap();
        assert_eq!(out.records[0].date, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(out.records[0].sales_amount, 1250.5);
        assert_eq!(out.records[1].date, NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
    }

    #[test]
    fn custom_date_format_is_tried_first() {
        let config = PipelineConfig {
            date_format: "%m/%d/%Y".to_string(),
            ..Default::default()
        };
        let set: RecordSet = vec![raw(1, "10/25/2025", "001", Some("1000"), "华北")]
            .into_iter()
            .collect();
        let out = Cleaner::new(&config).clean(&set).unwrap();
        assert_eq!(out.records[0].date, NaiveDate::from_ymd_opt(2025, 10, 25).unwrap());
        assert_eq!(out.records[0].region, "North");
    }

    #[test]
    fn drops_are_counted_and_conserved() {
        let set: RecordSet = vec![
            raw(1, "2025-01-01", "P1", Some("10"), "East"),
            raw(2, "2025-01-01", "", Some("10"), "East"),
            raw(3, "2025-01-01", "P1", Some("10"), "  "),
            raw(4, "2025-01-01", "P1", Some("-500"), "East"),
            raw(5, "2025-01-02", "P1", Some("12"), "East"),
        ]
        .into_iter()
        .collect();
        let out = cleaner().clean(&set).unwrap();
        let s = out.summary;
        assert_eq!(s.dropped_missing_key, 2);
        assert_eq!(s.dropped_negative, 1);
        assert_eq!(s.output_records + s.dropped() + s.removed_outliers, s.input_records);
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn unimputable_records_are_dropped() {
        let policy = ImputationPolicy {
            strategy: ImputeStrategy::Mean,
            rules: vec![crate::clean::ImputeRule::GroupStatistic],
        };
        let set: RecordSet = vec![
            raw(1, "2025-01-01", "P1", Some("10"), "East"),
            raw(2, "2025-01-01", "P2", None, "East"),
        ]
        .into_iter()
        .collect();
        let out = cleaner().with_imputation(policy).clean(&set).unwrap();
        assert_eq!(out.summary.dropped_unimputable, 1);
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn cleaning_is_a_fixed_point() {
        let mut records = Vec::new();
        for day in 1..=20 {
            let amount = if day == 7 { "9000".to_string() } else { format!("{}", 100 + day) };
            records.push(raw(day, &format!("2025-01-{day:02}"), "P1", Some(amount.as_str()), "华东"));
        }
        records.push(raw(21, "2025-01-21", "P1", None, "华东"));
        let set: RecordSet = records.into_iter().collect();

        let once = cleaner().clean(&set).unwrap();
        // the spike and the mean it drags into the imputed value
        assert_eq!(once.summary.clipped, 2);
        let twice = cleaner().clean(&once.to_record_set()).unwrap();
        assert_eq!(twice.records, once.records);
    }

    #[test]
    fn complete_records_keep_their_count() {
        let set: RecordSet = (1..=10)
            .map(|d| raw(d, &format!("2025-02-{d:02}"), "P1", Some("50"), "West"))
            .collect();
        let out = cleaner().clean(&set).unwrap();
        assert_eq!(out.records.len(), 10);
        assert_eq!(out.summary.dropped(), 0);
    }
}
