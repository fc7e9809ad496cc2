//! Headline sales statistics computed from cleaned records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{CleanedRecord, DailySales, RegionSummary, Summary};
use crate::features::CategoryEncoder;
use crate::math::{mean, median, stable_sum};

/// Totals, daily average, top region and the per-region breakdown.
///
/// Top-region ties go to the lowest region code.
pub fn compute_summary(records: &[CleanedRecord], regions: &CategoryEncoder) -> Summary {
    let amounts: Vec<f64> = records.iter().map(|r| r.sales_amount).collect();
    let total_sales = stable_sum(&amounts);
    let data_days = records.iter().map(|r| r.date).collect::<BTreeSet<_>>().len();
    let avg_daily_sales = if data_days == 0 {
        0.0
    } else {
        total_sales / data_days as f64
    };

    let breakdown = region_breakdown(records);

    let mut top: Option<(u32, f64)> = None;
    for region in &breakdown {
        let Some(code) = regions.encode(&region.region) else {
            continue;
        };
        let better = match top {
            None => true,
            Some((best_code, best_total)) => {
                region.total_sales > best_total
                    || (region.total_sales == best_total && code < best_code)
            }
        };
        if better {
            top = Some((code, region.total_sales));
        }
    }
    let top_region_code = top.map(|(code, _)| code);
    let top_region = top_region_code
        .and_then(|code| regions.decode(code))
        .map(str::to_string);

    Summary {
        total_sales,
        avg_daily_sales,
        top_region,
        top_region_code,
        data_days,
        regions: breakdown,
    }
}

/// Per-region totals, sorted by total descending then name. Ties share a rank.
pub fn region_breakdown(records: &[CleanedRecord]) -> Vec<RegionSummary> {
    let mut grouped: BTreeMap<&str, (Vec<f64>, BTreeSet<NaiveDate>)> = BTreeMap::new();
    for record in records {
        let entry = grouped.entry(record.region.as_str()).or_default();
        entry.0.push(record.sales_amount);
        entry.1.insert(record.date);
    }

    let mut out: Vec<RegionSummary> = grouped
        .into_iter()
        .map(|(region, (amounts, days))| RegionSummary {
            region: region.to_string(),
            total_sales: stable_sum(&amounts),
            mean_sales: mean(&amounts).unwrap_or(0.0),
            median_sales: median(&amounts).unwrap_or(0.0),
            order_count: amounts.len(),
            coverage_days: days.len(),
            rank: 0,
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_sales
            .total_cmp(&a.total_sales)
            .then_with(|| a.region.cmp(&b.region))
    });

    let mut prev_total = None;
    let mut rank = 0;
    for (idx, row) in out.iter_mut().enumerate() {
        if prev_total != Some(row.total_sales) {
            rank = idx + 1;
            prev_total = Some(row.total_sales);
        }
        row.rank = rank;
    }
    out
}

/// Total cleaned sales per distinct day, ascending.
pub fn daily_sales(records: &[CleanedRecord], start_date: Option<NaiveDate>) -> Vec<DailySales> {
    let Some(start) = start_date.or_else(|| records.iter().map(|r| r.date).min()) else {
        return Vec::new();
    };
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for record in records {
        by_day.entry(record.date).or_default().push(record.sales_amount);
    }
    by_day
        .into_iter()
        .map(|(date, amounts)| DailySales {
            day_index: (date - start).num_days().max(0) as u32,
            date,
            total: stable_sum(&amounts),
        })
        .collect()
}
