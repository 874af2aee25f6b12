//! Raw trip record loading
//!
//! Pure I/O boundary: reads tabular trip data and reports what it found.
//! No transformation happens here; that is the feature builder's job.

use crate::error::{FarecastError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Name of the target column in raw trip data
pub const TARGET_COLUMN: &str = "Booking Value";

/// Base predictor columns the pipeline knows how to use.
/// Order is fixed: it is the prefix of every feature schema.
pub const BASE_COLUMNS: [&str; 5] = [
    "Ride Distance",
    "Driver Ratings",
    "Customer Rating",
    "Avg VTAT",
    "Avg CTAT",
];

/// Loader for raw trip records
#[derive(Debug, Clone, Default)]
pub struct RecordLoader;

impl RecordLoader {
    /// Load raw trip records from a CSV file.
    ///
    /// Fails with [`FarecastError::DataSourceMissing`] if the path does not
    /// exist. Extra columns are kept; downstream stages ignore what they
    /// don't need.
    pub fn load(path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FarecastError::DataSourceMissing(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| FarecastError::DataError(e.to_string()))?;

        tracing::info!(path = %path.display(), rows = df.height(), "loaded trip records");
        Ok(df)
    }
}
