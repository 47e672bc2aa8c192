//! Cross-validation splitting and scoring

use crate::error::{ForecastError, Result};
use super::engine::Estimator;
use super::models::{mean_absolute_error, mean_squared_error, Scoring};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation over contiguous folds
    KFold { n_splits: usize, shuffle: bool },
    /// A single shuffled split holding out `ceil(test_size * n)` samples
    ShuffleSplit { test_size: f64 },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::KFold { n_splits: 5, shuffle: false }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        match &self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => {
                self.k_fold_split(n_samples, *n_splits, *shuffle)
            }
            CVStrategy::ShuffleSplit { test_size } => {
                self.shuffle_split(n_samples, *test_size)
            }
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn k_fold_split(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Result<Vec<CVSplit>> {
        if n_splits < 2 {
            return Err(ForecastError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(ForecastError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();

        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }

    fn shuffle_split(&self, n_samples: usize, test_size: f64) -> Result<Vec<CVSplit>> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "test_size".to_string(),
                value: test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }

        let n_test = (test_size * n_samples as f64).ceil() as usize;
        if n_test == 0 || n_test >= n_samples {
            return Err(ForecastError::ValidationError(format!(
                "test_size {} leaves an empty subset for {} samples",
                test_size, n_samples
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        indices.shuffle(&mut self.rng());

        let test_indices = indices[..n_test].to_vec();
        let train_indices = indices[n_test..].to_vec();

        Ok(vec![CVSplit {
            train_indices,
            test_indices,
            fold_idx: 0,
        }])
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: 0.0,
                std_score: 0.0,
                n_folds,
            };
        }
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}

/// Per-fold error metrics for one estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVScores {
    pub mae: CVResults,
    pub mse: CVResults,
    /// Square root of each fold's MSE
    pub rmse: CVResults,
}

/// Fit one clone of the estimator per fold and return its held-out predictions
fn fold_predictions(
    estimator: &Estimator,
    x: &Array2<f64>,
    y: &Array1<f64>,
    split: &CVSplit,
) -> Result<(Array1<f64>, Array1<f64>)> {
    let x_train = x.select(Axis(0), &split.train_indices);
    let y_train = y.select(Axis(0), &split.train_indices);
    let x_test = x.select(Axis(0), &split.test_indices);
    let y_test = y.select(Axis(0), &split.test_indices);

    let mut model = estimator.clone();
    model.fit(&x_train, &y_train)?;
    let y_pred = model.predict(&x_test)?;

    Ok((y_test, y_pred))
}

/// Cross-validate an estimator on MAE, MSE and RMSE at once
pub fn cross_validate(
    estimator: &Estimator,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
) -> Result<CVScores> {
    check_lengths(x, y)?;

    let mut mae = Vec::with_capacity(splits.len());
    let mut mse = Vec::with_capacity(splits.len());

    for split in splits {
        let (y_test, y_pred) = fold_predictions(estimator, x, y, split)?;
        let fold_mae = mean_absolute_error(&y_test, &y_pred);
        let fold_mse = mean_squared_error(&y_test, &y_pred);
        debug!(
            model = %estimator.model_type(),
            fold = split.fold_idx,
            mae = fold_mae,
            rmse = fold_mse.sqrt(),
            "Fold scored"
        );
        mae.push(fold_mae);
        mse.push(fold_mse);
    }

    let rmse = mse.iter().map(|m| m.sqrt()).collect();

    Ok(CVScores {
        mae: CVResults::from_scores(mae),
        mse: CVResults::from_scores(mse),
        rmse: CVResults::from_scores(rmse),
    })
}

/// Cross-validate an estimator with a single scoring rule
pub fn cross_val_score(
    estimator: &Estimator,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[CVSplit],
    scoring: Scoring,
) -> Result<CVResults> {
    check_lengths(x, y)?;

    let scores = splits
        .iter()
        .map(|split| -> Result<f64> {
            let (y_test, y_pred) = fold_predictions(estimator, x, y, split)?;
            Ok(scoring.score(&y_test, &y_pred))
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(CVResults::from_scores(scores))
}

fn check_lengths(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(ForecastError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LinearRegression;
    use ndarray::array;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: false });
        let splits = cv.split(100).unwrap();

        assert_eq!(splits.len(), 5);

        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_uneven_and_contiguous() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 3, shuffle: false });
        let splits = cv.split(10).unwrap();

        assert_eq!(splits[0].test_indices, vec![0, 1, 2, 3]);
        assert_eq!(splits[1].test_indices, vec![4, 5, 6]);
        assert_eq!(splits[2].test_indices, vec![7, 8, 9]);
    }

    #[test]
    fn test_k_fold_too_few_samples() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 10, shuffle: false });
        assert!(matches!(cv.split(5), Err(ForecastError::ValidationError(_))));
    }

    #[test]
    fn test_shuffle_split_sizes_and_determinism() {
        let cv = CrossValidator::new(CVStrategy::ShuffleSplit { test_size: 0.3 })
            .with_random_state(42);
        let first = cv.split(101).unwrap();
        let second = cv.split(101).unwrap();

        assert_eq!(first.len(), 1);
        // ceil(0.3 * 101) = 31
        assert_eq!(first[0].test_indices.len(), 31);
        assert_eq!(first[0].train_indices.len(), 70);
        assert_eq!(first[0].test_indices, second[0].test_indices);

        let mut all: Vec<usize> = first[0]
            .test_indices
            .iter()
            .chain(first[0].train_indices.iter())
            .copied()
            .collect();
        all.sort();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_split_rejects_bad_size() {
        let cv = CrossValidator::new(CVStrategy::ShuffleSplit { test_size: 1.5 });
        assert!(cv.split(10).is_err());
    }

    #[test]
    fn test_cross_validate_linear() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0], [9.0], [10.0]];
        let y = x.column(0).mapv(|v| 3.0 * v + 1.0);

        let splits = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: false })
            .split(10)
            .unwrap();
        let scores = cross_validate(
            &Estimator::LinearRegression(LinearRegression::new()),
            &x,
            &y,
            &splits,
        )
        .unwrap();

        assert_eq!(scores.rmse.n_folds, 5);
        assert!(scores.rmse.mean_score < 1e-8);
        assert!(scores.mae.mean_score < 1e-8);
    }

    #[test]
    fn test_cross_val_score_is_negated() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 5.0, 2.0, 8.0, 3.0, 9.0];

        let splits = CrossValidator::new(CVStrategy::KFold { n_splits: 3, shuffle: false })
            .split(6)
            .unwrap();
        let estimator = Estimator::LinearRegression(LinearRegression::new());
        let neg_mse = cross_val_score(&estimator, &x, &y, &splits, Scoring::NegMeanSquaredError).unwrap();
        let scores = cross_validate(&estimator, &x, &y, &splits).unwrap();

        assert!(neg_mse.mean_score <= 0.0);
        assert!((neg_mse.mean_score + scores.mse.mean_score).abs() < 1e-9);
    }

    #[test]
    fn test_cv_results_stats() {
        let results = CVResults::from_scores(vec![1.0, 3.0]);
        assert_eq!(results.mean_score, 2.0);
        assert_eq!(results.std_score, 1.0);
        assert_eq!(results.n_folds, 2);
    }
}
