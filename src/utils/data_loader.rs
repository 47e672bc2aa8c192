//! Data loading utilities

use crate::error::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Name of the derived time index column
pub const DAY_COUNT_COLUMN: &str = "dayCount";

/// Hours per day, used to derive `dayCount` from the row position
const HOURS_PER_DAY: f64 = 24.0;

/// CSV loader for the hourly rental table
pub struct DataLoader {
    /// Rows used for schema inference
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
        }
    }

    /// Set how many rows are scanned to infer column types
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()?;

        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            ms = start.elapsed().as_millis() as u64,
            "Loaded CSV"
        );
        Ok(df)
    }

    /// Return a copy of `df` with `dayCount = row_index / 24` appended.
    ///
    /// An existing `dayCount` column is replaced.
    pub fn with_day_count(df: &DataFrame) -> Result<DataFrame> {
        let values: Vec<f64> = (0..df.height())
            .map(|i| i as f64 / HOURS_PER_DAY)
            .collect();

        let mut out = df.clone();
        out.with_column(Series::new(DAY_COUNT_COLUMN.into(), values))?;
        Ok(out)
    }
}
