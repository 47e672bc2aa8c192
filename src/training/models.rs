//! Regression metrics and scoring rules

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for regression evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Mean Squared Error
    pub mse: Option<f64>,
    /// Root Mean Squared Error
    pub rmse: Option<f64>,
    /// Mean Absolute Error
    pub mae: Option<f64>,
    /// R-squared
    pub r2: Option<f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
    /// Number of features
    pub n_features: usize,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute regression metrics
    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self::new();
        metrics.n_samples = y_true.len();

        if y_true.is_empty() {
            return metrics;
        }

        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        metrics.mse = Some(mse);
        metrics.rmse = Some(mse.sqrt());

        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        metrics.mae = Some(mae);

        let y_mean: f64 = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();

        metrics.r2 = if ss_tot > 0.0 {
            Some(1.0 - ss_res / ss_tot)
        } else {
            Some(0.0)
        };

        metrics
    }
}

/// Mean squared error between two vectors
pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

/// Mean absolute error between two vectors
pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / y_true.len() as f64
}

/// Scoring rule for model selection. Higher is always better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scoring {
    /// Negated mean squared error
    NegMeanSquaredError,
    /// Negated mean absolute error
    NegMeanAbsoluteError,
}

impl Scoring {
    /// Score predictions against ground truth
    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        match self {
            Scoring::NegMeanSquaredError => -mean_squared_error(y_true, y_pred),
            Scoring::NegMeanAbsoluteError => -mean_absolute_error(y_true, y_pred),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::NegMeanSquaredError => "neg_mean_squared_error",
            Scoring::NegMeanAbsoluteError => "neg_mean_absolute_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = ModelMetrics::compute_regression(&y_true, &y_pred);

        assert!(metrics.mse.is_some());
        assert!(metrics.rmse.is_some());
        assert!(metrics.r2.is_some());
        assert!(metrics.r2.unwrap() > 0.9);
        assert_eq!(metrics.n_samples, 5);
    }

    #[test]
    fn test_rmse_is_sqrt_of_mse() {
        let y_true = array![0.0, 0.0, 0.0, 0.0];
        let y_pred = array![2.0, -2.0, 2.0, -2.0];

        let metrics = ModelMetrics::compute_regression(&y_true, &y_pred);
        assert!((metrics.mse.unwrap() - 4.0).abs() < 1e-12);
        assert!((metrics.rmse.unwrap() - 2.0).abs() < 1e-12);
        assert!((metrics.mae.unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_scoring_sign() {
        let y_true = array![1.0, 2.0, 3.0];
        let y_pred = array![2.0, 2.0, 5.0];

        let mse = Scoring::NegMeanSquaredError.score(&y_true, &y_pred);
        let mae = Scoring::NegMeanAbsoluteError.score(&y_true, &y_pred);
        assert!((mse + 5.0 / 3.0).abs() < 1e-12);
        assert!((mae + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_metrics() {
        let empty = Array1::<f64>::zeros(0);
        let metrics = ModelMetrics::compute_regression(&empty, &empty);
        assert!(metrics.rmse.is_none());
        assert_eq!(mean_squared_error(&empty, &empty), 0.0);
    }
}
