//! Terminal formatting for run results.
//!
//! Tables are plain fixed-width text with trailing whitespace trimmed, so the
//! output is stable enough for snapshot tests.

use crate::domain::{CleaningSummary, MetricsReport, PredictionSet, ResultBundle, Summary};
use crate::features::CategoryEncoder;

/// Headline report for a full run.
pub fn format_run_summary(bundle: &ResultBundle) -> String {
    let mut out = String::new();

    out.push_str("=== salescast - Sales Forecast Report ===\n");
    if let (Some(first), Some(last)) = (bundle.daily_sales.first(), bundle.daily_sales.last()) {
        out.push_str(&format!("Period: {} .. {}\n", first.date, last.date));
    }
    out.push_str(&format_summary(&bundle.summary));
    out.push('\n');
    out.push_str(&format_cleaning(&bundle.cleaning));
    out.push('\n');
    out.push_str(&format_metrics(&bundle.metrics));
    out.push('\n');
    out.push_str(&format_region_table(&bundle.summary));
    out.push('\n');
    out.push_str("Forecast:\n");
    out.push_str(&format_predictions(bundle));

    out
}

pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Total sales: {:.2}\n", summary.total_sales));
    out.push_str(&format!(
        "Average daily sales: {:.2} ({} days)\n",
        summary.avg_daily_sales, summary.data_days
    ));
    out.push_str(&format!(
        "Top region: {}\n",
        summary.top_region.as_deref().unwrap_or("-")
    ));
    out
}

pub fn format_cleaning(cleaning: &CleaningSummary) -> String {
    let mut out = String::new();
    out.push_str("Cleaning:\n");
    out.push_str(&format!(
        "- records: {} -> {}\n",
        cleaning.input_records, cleaning.output_records
    ));
    out.push_str(&format!(
        "- imputed={} clipped={} removed_outliers={}\n",
        cleaning.imputed, cleaning.clipped, cleaning.removed_outliers
    ));
    out.push_str(&format!(
        "- dropped: missing_key={} negative={} unimputable={}\n",
        cleaning.dropped_missing_key, cleaning.dropped_negative, cleaning.dropped_unimputable
    ));
    out
}

pub fn format_metrics(metrics: &MetricsReport) -> String {
    format!(
        "Holdout metrics: MAE={:.3} RMSE={:.3} (train={} holdout={})\n",
        metrics.mae, metrics.rmse, metrics.train_rows, metrics.holdout_rows
    )
}

/// Per-region table, highest total first.
pub fn format_region_table(summary: &Summary) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:>4} {:<16} {:>14} {:>12} {:>12} {:>8} {:>6}",
            "rank", "region", "total", "mean", "median", "orders", "days"
        ),
    );
    push_row(
        &mut out,
        format!(
            "{:-<4} {:-<16} {:-<14} {:-<12} {:-<12} {:-<8} {:-<6}",
            "", "", "", "", "", "", ""
        ),
    );
    for r in &summary.regions {
        push_row(
            &mut out,
            format!(
                "{:>4} {:<16} {:>14.2} {:>12.2} {:>12.2} {:>8} {:>6}",
                r.rank,
                truncate(&r.region, 16),
                r.total_sales,
                r.mean_sales,
                r.median_sales,
                r.order_count,
                r.coverage_days
            ),
        );
    }
    out
}

/// Forecast rows with decoded labels and calendar dates.
pub fn format_predictions(bundle: &ResultBundle) -> String {
    format_prediction_rows(&bundle.prediction, &bundle.regions, &bundle.products, |day| {
        bundle.date_for(day).map(|d| d.to_string())
    })
}

fn format_prediction_rows(
    prediction: &PredictionSet,
    regions: &CategoryEncoder,
    products: &CategoryEncoder,
    date_for: impl Fn(u32) -> Option<String>,
) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!(
            "{:<10} {:>5} {:<16} {:<16} {:>14}",
            "date", "day", "region", "product", "predicted"
        ),
    );
    push_row(
        &mut out,
        format!("{:-<10} {:-<5} {:-<16} {:-<16} {:-<14}", "", "", "", "", ""),
    );
    for p in &prediction.rows {
        push_row(
            &mut out,
            format!(
                "{:<10} {:>5} {:<16} {:<16} {:>14.2}",
                date_for(p.day_index).unwrap_or_default(),
                p.day_index,
                truncate(regions.decode(p.region_code).unwrap_or("?"), 16),
                truncate(products.decode(p.product_code).unwrap_or("?"), 16),
                p.predicted_amount
            ),
        );
    }
    for (day, total) in prediction.daily_totals() {
        push_row(
            &mut out,
            format!(
                "{:<10} {:>5} {:<16} {:<16} {:>14.2}",
                date_for(day).unwrap_or_default(),
                day,
                "(all)",
                "(total)",
                total
            ),
        );
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
