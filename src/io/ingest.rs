//! CSV ingest.
//!
//! This module turns a delimited text file into a `ColumnTable` (column name ->
//! values) and then into a `RecordSet`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **No value parsing**: values stay text; the cleaner owns interpretation
//! - **Forgiving headers**: BOM-stripped, case-insensitive, common aliases

use std::fs::File;
use std::path::Path;

use crate::domain::{ColumnTable, RawRecord, RecordSet, REQUIRED_COLUMNS};
use crate::error::AppError;

/// Alternative header spellings mapped to canonical column names.
const HEADER_ALIASES: [(&str, &str); 7] = [
    ("日期", "date"),
    ("产品id", "product_id"),
    ("销售额", "sales_amount"),
    ("区域", "region"),
    ("product", "product_id"),
    ("sales", "sales_amount"),
    ("amount", "sales_amount"),
];

/// Read a CSV/TSV file into columns. Empty cells become `None`.
pub fn read_columns(path: &Path) -> Result<ColumnTable, AppError> {
    let delimiter = delimiter_for(path)?;
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open input '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::format(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(canonical_header)
        .collect();

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (idx, result) in reader.records().enumerate() {
        let position = idx + 1;
        let record = result.map_err(|e| {
            AppError::format(format!("CSV parse error: {e}")).at_row(position)
        })?;
        for (col, values) in columns.iter_mut().enumerate() {
            let cell = record
                .get(col)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            values.push(cell);
        }
    }

    let mut table = ColumnTable::new();
    for (name, values) in headers.into_iter().zip(columns) {
        // first occurrence of a duplicated header wins
        table.entry(name).or_insert(values);
    }

    tracing::debug!(
        path = %path.display(),
        columns = table.len(),
        rows = table.values().map(Vec::len).max().unwrap_or(0),
        "input_read"
    );
    Ok(table)
}

/// Build a `RecordSet` from a column table.
pub fn record_set_from_columns(columns: &ColumnTable) -> Result<RecordSet, AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| !columns.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::schema(format!(
            "Missing required column(s): {}",
            missing
                .iter()
                .map(|m| format!("`{m}`"))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let column = |name: &str| columns.get(name).map(Vec::as_slice).unwrap_or(&[]);
    let date = column("date");
    let product_id = column("product_id");
    let sales_amount = column("sales_amount");
    let region = column("region");

    let n = date.len();
    for (name, values) in [
        ("product_id", product_id),
        ("sales_amount", sales_amount),
        ("region", region),
    ] {
        if values.len() != n {
            return Err(AppError::schema(format!(
                "Column length mismatch: `date` has {n} values, `{name}` has {}.",
                values.len()
            ))
            .in_column(name));
        }
    }

    Ok((0..n)
        .map(|i| RawRecord {
            position: i + 1,
            date: date[i].clone(),
            product_id: product_id[i].clone(),
            sales_amount: sales_amount[i].clone(),
            region: region[i].clone(),
        })
        .collect())
}

/// `read_columns` followed by `record_set_from_columns`.
pub fn load_record_set(path: &Path) -> Result<RecordSet, AppError> {
    let columns = read_columns(path)?;
    let records = record_set_from_columns(&columns)?;
    tracing::info!(path = %path.display(), records = records.len(), "records_loaded");
    Ok(records)
}

fn delimiter_for(path: &Path) -> Result<u8, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "tsv" => Ok(b'\t'),
        "xlsx" | "xls" => Err(AppError::config(format!(
            "Spreadsheet input is not supported ('{}'); export it to CSV first.",
            path.display()
        ))),
        _ => Ok(b','),
    }
}

fn canonical_header(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}').to_lowercase();
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(name)
}
