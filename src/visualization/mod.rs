//! Visualization module: per-hour charts of holdout predictions.

pub mod time_series;
pub use time_series::{hourly_series, plot_hour, HourlySeries, PREDICTION_COLUMN};
