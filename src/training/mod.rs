//! Model training module
//!
//! Provides the regression models compared by the pipeline:
//! - CART decision tree
//! - Ordinary least squares
//! - Random Forest (bagged trees, parallel fitting)
//!
//! plus K-Fold cross-validation and the [`Estimator`] wrapper used for
//! comparison and tuning.

mod config;
mod engine;
mod models;
pub mod cross_validation;
pub mod linear_models;
pub mod decision_tree;
pub mod random_forest;

pub use config::{TrainingConfig, ModelType, SelectionPolicy};
pub use engine::{Estimator, ModelComparison, compare_models, select_model};
pub use models::{ModelMetrics, Scoring, mean_absolute_error, mean_squared_error};
pub use cross_validation::{
    CrossValidator, CVStrategy, CVSplit, CVResults, CVScores, cross_validate, cross_val_score,
};
pub use linear_models::LinearRegression;
pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{RandomForest, MaxFeatures};
