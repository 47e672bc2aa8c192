//! Standard (z-score) feature scaling

use crate::error::{ForecastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters learned for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    column: String,
    mean: f64,
    /// Population standard deviation, 1.0 for constant columns
    scale: f64,
}

/// Standardizes columns to zero mean and unit variance: (x - mean) / std
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    /// Create a new scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn mean and scale of `columns` from `df`
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut params = Vec::with_capacity(columns.len());
        for col_name in columns {
            let series = float_series(df, col_name)?;
            let ca = series.f64()?;

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(0).unwrap_or(1.0);
            // near-constant columns keep their values centred but unscaled
            let scale = if std <= 10.0 * f64::EPSILON * mean.abs().max(1.0) {
                1.0
            } else {
                std
            };

            debug!(column = *col_name, mean, scale, "Scaler fitted");
            params.push(ScalerParams {
                column: col_name.to_string(),
                mean,
                scale,
            });
        }

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Return a copy of `df` with the fitted columns standardized
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.apply(df, |v, p| (v - p.mean) / p.scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Undo `transform`
    pub fn inverse_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.apply(df, |v, p| v * p.scale + p.mean)
    }

    /// Fitted mean of a column
    pub fn mean(&self, column: &str) -> Option<f64> {
        self.param(column).map(|p| p.mean)
    }

    /// Fitted scale of a column
    pub fn scale(&self, column: &str) -> Option<f64> {
        self.param(column).map(|p| p.scale)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn param(&self, column: &str) -> Option<&ScalerParams> {
        self.params.iter().find(|p| p.column == column)
    }

    /// Build all replacement columns first, then apply them to one clone
    fn apply<F>(&self, df: &DataFrame, f: F) -> Result<DataFrame>
    where
        F: Fn(f64, &ScalerParams) -> f64,
    {
        if !self.is_fitted {
            return Err(ForecastError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|params| -> Result<Series> {
                let series = float_series(df, &params.column)?;
                let scaled: Float64Chunked = series
                    .f64()?
                    .into_iter()
                    .map(|opt| opt.map(|v| f(v, params)))
                    .collect();
                Ok(scaled.with_name(series.name().clone()).into_series())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }

        Ok(result)
    }
}

fn float_series(df: &DataFrame, col_name: &str) -> Result<Series> {
    let column = df
        .column(col_name)
        .map_err(|_| ForecastError::FeatureNotFound(col_name.to_string()))?;
    Ok(column.as_materialized_series().cast(&DataType::Float64)?)
}
