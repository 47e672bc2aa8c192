//! Exhaustive grid search with K-Fold cross-validation

use crate::error::{ForecastError, Result};
use crate::training::{cross_val_score, CVStrategy, CrossValidator, Estimator, ModelType, Scoring};
use super::search_space::{format_params, ParameterValue, TrialParams};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

/// Candidate values per hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParameterValue>>,
}

impl Default for ParamGrid {
    /// Forest grid: 2 x 2 x 2 candidates
    fn default() -> Self {
        Self::default_for(ModelType::RandomForest)
    }
}

impl ParamGrid {
    pub fn new() -> Self {
        Self {
            params: BTreeMap::new(),
        }
    }

    /// Default search space of a model family.
    ///
    /// Linear regression has no hyperparameters, so its grid is empty.
    pub fn default_for(model_type: ModelType) -> Self {
        let ints = |values: &[i64]| -> Vec<ParameterValue> {
            values.iter().copied().map(ParameterValue::Int).collect()
        };
        match model_type {
            ModelType::RandomForest => Self::new()
                .add("n_estimators", ints(&[120, 150]))
                .add("max_features", ints(&[10, 12]))
                .add("max_depth", ints(&[15, 28])),
            ModelType::DecisionTree => Self::new()
                .add("max_features", ints(&[10, 12]))
                .add("max_depth", ints(&[15, 28])),
            ModelType::LinearRegression => Self::new(),
        }
    }

    /// Add (or replace) the candidate values of a parameter
    pub fn add(mut self, name: impl Into<String>, values: Vec<ParameterValue>) -> Self {
        self.params.insert(name.into(), values);
        self
    }

    /// Cartesian product of all values.
    ///
    /// Parameters are iterated in name order and the last name varies
    /// fastest. A grid without parameters has one empty candidate.
    pub fn candidates(&self) -> Vec<TrialParams> {
        let mut combos: Vec<TrialParams> = vec![TrialParams::new()];
        for (name, values) in &self.params {
            combos = combos
                .into_iter()
                .flat_map(|combo| {
                    values.iter().map(move |value| {
                        let mut next = combo.clone();
                        next.insert(name.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }
        combos
    }

    pub fn n_candidates(&self) -> usize {
        self.params.values().map(Vec::len).product()
    }

    /// True when no parameters are searched
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Cross-validation outcome of one grid candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub params: TrialParams,
    pub mean_test_score: f64,
    pub std_test_score: f64,
    pub split_scores: Vec<f64>,
    pub rank: usize,
}

/// Result of a grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best_params: TrialParams,
    /// Mean score of the best candidate (higher is better)
    pub best_score: f64,
    /// Best candidate refit on the full data
    pub best_estimator: Estimator,
    pub cv_results: Vec<CandidateResult>,
    pub scoring: Scoring,
    pub total_time_secs: f64,
}

/// Grid search over an estimator's hyperparameters
#[derive(Debug, Clone)]
pub struct GridSearchCV {
    pub grid: ParamGrid,
    pub cv_folds: usize,
    pub scoring: Scoring,
}

impl GridSearchCV {
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            cv_folds: 5,
            scoring: Scoring::NegMeanSquaredError,
        }
    }

    pub fn with_cv(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Score every candidate, then refit the best on all of `x`/`y`.
    ///
    /// Ties keep the candidate that comes first in grid order. An empty grid
    /// scores and refits `base` as is.
    pub fn fit(&self, base: &Estimator, x: &Array2<f64>, y: &Array1<f64>) -> Result<GridSearchResult> {
        if self.grid.n_candidates() == 0 {
            return Err(ForecastError::ValidationError(
                "parameter grid has a parameter with no values".to_string(),
            ));
        }

        let start = Instant::now();
        let splits = CrossValidator::new(CVStrategy::KFold {
            n_splits: self.cv_folds,
            shuffle: false,
        })
        .split(x.nrows())?;

        let candidates = self.grid.candidates();
        info!(
            model = %base.model_type(),
            candidates = candidates.len(),
            folds = self.cv_folds,
            scoring = self.scoring.name(),
            "Starting grid search"
        );

        let mut cv_results: Vec<CandidateResult> = candidates
            .into_par_iter()
            .map(|params| -> Result<CandidateResult> {
                let mut estimator = base.clone();
                estimator.set_params(&params)?;
                let results = cross_val_score(&estimator, x, y, &splits, self.scoring)?;
                debug!(
                    params = %format_params(&params),
                    mean_score = results.mean_score,
                    "Candidate scored"
                );
                Ok(CandidateResult {
                    params,
                    mean_test_score: results.mean_score,
                    std_test_score: results.std_score,
                    split_scores: results.scores,
                    rank: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut best_idx = 0;
        for (idx, result) in cv_results.iter().enumerate() {
            if result.mean_test_score > cv_results[best_idx].mean_test_score {
                best_idx = idx;
            }
        }

        let mut order: Vec<usize> = (0..cv_results.len()).collect();
        order.sort_by(|&a, &b| {
            cv_results[b]
                .mean_test_score
                .total_cmp(&cv_results[a].mean_test_score)
        });
        for (rank, idx) in order.into_iter().enumerate() {
            cv_results[idx].rank = rank + 1;
        }

        let best_params = cv_results[best_idx].params.clone();
        let best_score = cv_results[best_idx].mean_test_score;

        let mut best_estimator = base.clone();
        best_estimator.set_params(&best_params)?;
        best_estimator.fit(x, y)?;

        let total_time_secs = start.elapsed().as_secs_f64();
        info!(
            best = %format_params(&best_params),
            best_score,
            secs = total_time_secs,
            "Grid search finished"
        );

        Ok(GridSearchResult {
            best_params,
            best_score,
            best_estimator,
            cv_results,
            scoring: self.scoring,
            total_time_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{LinearRegression, RandomForest, TrainingConfig};
    use ndarray::array;

    #[test]
    fn test_default_grid_order() {
        let candidates = ParamGrid::default().candidates();
        assert_eq!(candidates.len(), 8);

        let first = &candidates[0];
        assert_eq!(first["max_depth"], ParameterValue::Int(15));
        assert_eq!(first["max_features"], ParameterValue::Int(10));
        assert_eq!(first["n_estimators"], ParameterValue::Int(120));

        // n_estimators is last by name and varies fastest
        assert_eq!(candidates[1]["n_estimators"], ParameterValue::Int(150));
        assert_eq!(candidates[1]["max_depth"], ParameterValue::Int(15));
        assert_eq!(candidates[4]["max_depth"], ParameterValue::Int(28));
    }

    #[test]
    fn test_family_grids() {
        let tree = ParamGrid::default_for(ModelType::DecisionTree);
        assert_eq!(tree.n_candidates(), 4);
        assert!(tree.candidates().iter().all(|c| !c.contains_key("n_estimators")));
        assert!(ParamGrid::default_for(ModelType::LinearRegression).is_empty());
        assert_eq!(ParamGrid::default(), ParamGrid::default_for(ModelType::RandomForest));
    }

    #[test]
    fn test_empty_grid_refits_base() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let search = GridSearchCV::new(ParamGrid::new()).with_cv(2);
        let base = Estimator::LinearRegression(LinearRegression::new());

        let result = search.fit(&base, &x, &y).unwrap();
        assert!(result.best_params.is_empty());
        assert_eq!(result.cv_results.len(), 1);
        assert_eq!(result.cv_results[0].rank, 1);
        assert!(result.best_score.abs() < 1e-8);
        assert!(result.best_estimator.predict(&x).is_ok());
    }

    #[test]
    fn test_parameter_without_values_rejected() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let grid = ParamGrid::new().add("max_depth", vec![]);
        let base = Estimator::RandomForest(RandomForest::new_regressor(2));
        assert!(GridSearchCV::new(grid).with_cv(2).fit(&base, &x, &y).is_err());
    }

    #[test]
    fn test_grid_search_picks_member_and_refits() {
        let x = Array2::from_shape_fn((30, 2), |(r, c)| if c == 0 { r as f64 } else { (r % 3) as f64 });
        let y = x.column(0).mapv(|v| v * 2.0);

        let grid = ParamGrid::new()
            .add("n_estimators", vec![ParameterValue::Int(3), ParameterValue::Int(5)])
            .add("max_depth", vec![ParameterValue::Int(1), ParameterValue::Int(6)]);
        let base = Estimator::default_for(ModelType::RandomForest, &TrainingConfig::default());

        let result = GridSearchCV::new(grid.clone()).with_cv(3).fit(&base, &x, &y).unwrap();

        assert_eq!(result.cv_results.len(), 4);
        assert!(grid.candidates().contains(&result.best_params));
        assert_eq!(result.best_params["max_depth"], ParameterValue::Int(6));
        assert!(result.best_score <= 0.0);
        for c in &result.cv_results {
            assert!(c.mean_test_score <= result.best_score);
            assert_eq!(c.split_scores.len(), 3);
        }
        assert!(result.cv_results.iter().any(|c| c.rank == 1));
        assert!(result.best_estimator.predict(&x).is_ok());
    }

    #[test]
    fn test_unknown_parameter_fails() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let grid = ParamGrid::new().add("learning_rate", vec![ParameterValue::Float(0.1)]);
        let base = Estimator::RandomForest(RandomForest::new_regressor(2));
        assert!(GridSearchCV::new(grid).with_cv(2).fit(&base, &x, &y).is_err());
    }

    #[test]
    fn test_grid_json_roundtrip_shape() {
        let grid: ParamGrid = serde_json::from_str(r#"{"max_depth": [15, 28]}"#).unwrap();
        assert_eq!(grid.n_candidates(), 2);
    }
}
