//! Actual vs predicted demand charts for a single hour of the day

use crate::error::{ForecastError, Result};
use crate::preprocessing::features::column_values;
use crate::utils::DAY_COUNT_COLUMN;
use plotters::prelude::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Column holding holdout predictions
pub const PREDICTION_COLUMN: &str = "predictedCounts_test";

/// Points of one hour, ordered as in the evaluated frame
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    pub hour: i64,
    pub day_count: Vec<f64>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
}

impl HourlySeries {
    pub fn len(&self) -> usize {
        self.day_count.len()
    }

    pub fn is_empty(&self) -> bool {
        self.day_count.is_empty()
    }
}

/// Rows of `df` with `hr == hour`, as `(dayCount, actual, predicted)` series
pub fn hourly_series(df: &DataFrame, hour: i64, target: &str) -> Result<HourlySeries> {
    let hr = df
        .column("hr")
        .map_err(|_| ForecastError::FeatureNotFound("hr".to_string()))?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    let mask = hr.i64()?.equal(hour);
    let rows = df.filter(&mask)?;

    Ok(HourlySeries {
        hour,
        day_count: column_values(&rows, DAY_COUNT_COLUMN)?,
        actual: column_values(&rows, target)?,
        predicted: column_values(&rows, PREDICTION_COLUMN)?,
    })
}

/// Draw one chart per hour series into `dir` as `hour_HH.svg`.
///
/// Returns `None` when the hour has no rows in the evaluated frame.
pub fn plot_hour(series: &HourlySeries, dir: &Path) -> Result<Option<PathBuf>> {
    if series.is_empty() {
        warn!(hour = series.hour, "No test rows for hour, skipping chart");
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("hour_{:02}.svg", series.hour));

    draw(series, &path).map_err(|e| ForecastError::PlotError(e.to_string()))?;

    info!(hour = series.hour, points = series.len(), path = %path.display(), "Chart written");
    Ok(Some(path))
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let span = if (hi - lo).abs() < f64::EPSILON { 1.0 } else { hi - lo };
    (lo - span * 0.05, hi + span * 0.05)
}

fn draw(series: &HourlySeries, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (xlo, xhi) = bounds(series.day_count.iter().copied());
    let (ylo, yhi) = bounds(series.actual.iter().chain(series.predicted.iter()).copied());

    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = format!("Hour {}: actual vs predicted rentals", series.hour);
    let mut chart = ChartBuilder::on(&root)
        .margin(12)
        .caption(caption, ("sans-serif", 22))
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(xlo..xhi, ylo..yhi)?;

    chart
        .configure_mesh()
        .x_desc(DAY_COUNT_COLUMN)
        .y_desc("cnt")
        .axis_style(BLACK.mix(0.6))
        .light_line_style(BLACK.mix(0.06))
        .label_style(("sans-serif", 13))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            series.day_count.iter().copied().zip(series.actual.iter().copied()),
            &BLUE,
        ))?
        .label("cnt")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            series.day_count.iter().copied().zip(series.predicted.iter().copied()),
            &RED,
        ))?
        .label(PREDICTION_COLUMN)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .border_style(BLACK.mix(0.4))
        .background_style(WHITE.mix(0.8))
        .label_font(("sans-serif", 12))
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluated() -> DataFrame {
        df! {
            "hr" => [9i64, 18, 9, 18, 9],
            "dayCount" => [0.375, 0.75, 1.375, 1.75, 2.375],
            "cnt" => [200i64, 400, 220, 380, 210],
            "predictedCounts_test" => [195.0, 410.0, 230.0, 370.0, 205.0],
        }
        .unwrap()
    }

    #[test]
    fn test_hourly_series_filters_hour() {
        let s = hourly_series(&evaluated(), 9, "cnt").unwrap();
        assert_eq!(s.day_count, vec![0.375, 1.375, 2.375]);
        assert_eq!(s.actual, vec![200.0, 220.0, 210.0]);
        assert_eq!(s.predicted, vec![195.0, 230.0, 205.0]);
    }

    #[test]
    fn test_missing_prediction_column() {
        let df = evaluated().drop(PREDICTION_COLUMN).unwrap();
        assert!(matches!(
            hourly_series(&df, 9, "cnt"),
            Err(ForecastError::FeatureNotFound(_))
        ));
    }

    #[test]
    fn test_plot_hour_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let s = hourly_series(&evaluated(), 18, "cnt").unwrap();

        let path = plot_hour(&s, dir.path()).unwrap().unwrap();
        assert_eq!(path.file_name().unwrap(), "hour_18.svg");
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_plot_empty_hour_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let s = hourly_series(&evaluated(), 3, "cnt").unwrap();
        assert!(s.is_empty());
        assert_eq!(plot_hour(&s, dir.path()).unwrap(), None);
    }
}
