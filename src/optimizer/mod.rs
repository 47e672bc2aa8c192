//! Hyperparameter search
//!
//! Exhaustive grid search scored by K-Fold cross-validation, mirroring the
//! `GridSearchCV` workflow: every candidate of a [`ParamGrid`] is scored on
//! the same folds and the best one is refit on the full training set.

mod search_space;
pub mod grid_search;

pub use search_space::{ParameterValue, TrialParams, format_params};
pub use grid_search::{ParamGrid, GridSearchCV, GridSearchResult, CandidateResult};
