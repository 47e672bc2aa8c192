//! Training engine: estimator dispatch and model comparison

use crate::error::{ForecastError, Result};
use crate::optimizer::{ParameterValue, TrialParams};
use super::cross_validation::{cross_validate, CVScores, CVStrategy, CrossValidator};
use super::decision_tree::DecisionTree;
use super::linear_models::LinearRegression;
use super::random_forest::{MaxFeatures, RandomForest};
use super::{ModelType, SelectionPolicy, TrainingConfig};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// A regression model the pipeline can fit, predict with and tune
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    DecisionTree(DecisionTree),
    LinearRegression(LinearRegression),
    RandomForest(RandomForest),
}

impl Estimator {
    /// Unfitted estimator with default hyperparameters for a model family
    pub fn default_for(model_type: ModelType, config: &TrainingConfig) -> Self {
        let seed = config.random_state.unwrap_or(42);
        match model_type {
            ModelType::DecisionTree => {
                Estimator::DecisionTree(DecisionTree::new_regressor().with_random_state(seed))
            }
            ModelType::LinearRegression => Estimator::LinearRegression(LinearRegression::new()),
            ModelType::RandomForest => Estimator::RandomForest(
                RandomForest::new_regressor(config.n_estimators)
                    .with_max_features(MaxFeatures::All)
                    .with_random_state(seed),
            ),
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            Estimator::DecisionTree(_) => ModelType::DecisionTree,
            Estimator::LinearRegression(_) => ModelType::LinearRegression,
            Estimator::RandomForest(_) => ModelType::RandomForest,
        }
    }

    /// Fit the wrapped model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Estimator::DecisionTree(m) => {
                m.fit(x, y)?;
            }
            Estimator::LinearRegression(m) => {
                m.fit(x, y)?;
            }
            Estimator::RandomForest(m) => {
                m.fit(x, y)?;
            }
        }
        Ok(())
    }

    /// Predict with the wrapped model
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::DecisionTree(m) => m.predict(x),
            Estimator::LinearRegression(m) => m.predict(x),
            Estimator::RandomForest(m) => m.predict(x),
        }
    }

    /// Impurity-based importances, tree models only
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        match self {
            Estimator::DecisionTree(m) => m.feature_importances(),
            Estimator::RandomForest(m) => m.feature_importances(),
            Estimator::LinearRegression(_) => None,
        }
    }

    /// Override hyperparameters by name.
    ///
    /// Recognised names are `n_estimators` (forest only), `max_features` and
    /// `max_depth` (tree models). Anything else is rejected.
    pub fn set_params(&mut self, params: &TrialParams) -> Result<()> {
        for (name, value) in params {
            match (&mut *self, name.as_str()) {
                (Estimator::RandomForest(rf), "n_estimators") => {
                    rf.n_estimators = positive_int(name, value)?;
                }
                (Estimator::RandomForest(rf), "max_features") => {
                    rf.max_features = MaxFeatures::Fixed(positive_int(name, value)?);
                }
                (Estimator::RandomForest(rf), "max_depth") => {
                    rf.max_depth = Some(positive_int(name, value)?);
                }
                (Estimator::DecisionTree(dt), "max_features") => {
                    dt.max_features = Some(positive_int(name, value)?);
                }
                (Estimator::DecisionTree(dt), "max_depth") => {
                    dt.max_depth = Some(positive_int(name, value)?);
                }
                (estimator, _) => {
                    return Err(ForecastError::InvalidParameter {
                        name: name.clone(),
                        value: format!("{:?}", value),
                        reason: format!("not a parameter of {}", estimator.model_type()),
                    });
                }
            }
        }
        Ok(())
    }
}

fn positive_int(name: &str, value: &ParameterValue) -> Result<usize> {
    match value.as_int() {
        Some(v) if v >= 1 => Ok(v as usize),
        _ => Err(ForecastError::InvalidParameter {
            name: name.to_string(),
            value: format!("{:?}", value),
            reason: "expected a positive integer".to_string(),
        }),
    }
}

/// Cross-validated scores of one model family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub model_type: ModelType,
    pub cv: CVScores,
    pub training_time_secs: f64,
}

impl ModelComparison {
    pub fn mean_mae(&self) -> f64 {
        self.cv.mae.mean_score
    }

    pub fn mean_rmse(&self) -> f64 {
        self.cv.rmse.mean_score
    }
}

/// Cross-validate every model family with its defaults on the same folds
pub fn compare_models(
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &TrainingConfig,
) -> Result<Vec<ModelComparison>> {
    let splits = CrossValidator::new(CVStrategy::KFold {
        n_splits: config.cv_folds,
        shuffle: false,
    })
    .split(x.nrows())?;

    info!(
        n_samples = x.nrows(),
        n_features = x.ncols(),
        folds = config.cv_folds,
        "Comparing models"
    );

    ModelType::all()
        .iter()
        .map(|&model_type| -> Result<ModelComparison> {
            let start = Instant::now();
            let estimator = Estimator::default_for(model_type, config);
            let cv = cross_validate(&estimator, x, y, &splits)?;
            let training_time_secs = start.elapsed().as_secs_f64();

            info!(
                model = %model_type,
                mae = cv.mae.mean_score,
                rmse = cv.rmse.mean_score,
                secs = training_time_secs,
                "Cross-validation finished"
            );

            Ok(ModelComparison {
                model_type,
                cv,
                training_time_secs,
            })
        })
        .collect()
}

/// Pick the model family to tune
pub fn select_model(policy: &SelectionPolicy, comparisons: &[ModelComparison]) -> Result<ModelType> {
    let selected = match policy {
        SelectionPolicy::Fixed(model_type) => *model_type,
        SelectionPolicy::MinRmse => comparisons
            .iter()
            .min_by(|a, b| a.mean_rmse().total_cmp(&b.mean_rmse()))
            .map(|c| c.model_type)
            .ok_or_else(|| {
                ForecastError::ValidationError("no model comparisons to select from".to_string())
            })?,
    };
    debug!(?policy, model = %selected, "Model selected");
    Ok(selected)
}
