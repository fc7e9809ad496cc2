//! Result bundle JSON read/write.

use std::fs;
use std::path::Path;

use crate::domain::ResultBundle;
use crate::error::AppError;

/// Pretty JSON for a bundle; `write_exports` stages it with the CSV files.
pub fn bundle_json_bytes(bundle: &ResultBundle) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec_pretty(bundle)
        .map_err(|e| AppError::io(format!("Failed to serialize bundle JSON: {e}")))
}

pub fn read_bundle_json(path: &Path) -> Result<ResultBundle, AppError> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read bundle JSON '{}': {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::format(format!("Invalid bundle JSON '{}': {e}", path.display())))
}
