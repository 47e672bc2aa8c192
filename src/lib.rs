//! Bikeshare Forecast - hourly bike rental demand regression
//!
//! This crate reproduces a compact supervised-learning workflow on the
//! hourly bike sharing table:
//! - Data loading and a derived `dayCount` time index
//! - Seeded train/test splitting and leakage-free standard scaling
//! - K-Fold comparison of a decision tree, linear regression and a random forest
//! - Grid search over forest hyperparameters
//! - Holdout evaluation and per-hour charts
//!
//! # Modules
//!
//! ## Core ML Modules
//! - [`preprocessing`] - Splitting, scaling, feature matrices
//! - [`training`] - Regression models and cross-validation
//! - [`optimizer`] - Grid search
//!
//! ## Workflow
//! - [`pipeline`] - End-to-end run and report
//! - [`visualization`] - Actual vs predicted charts
//!
//! ## Services
//! - [`cli`] - Command-line interface
//!
//! ## Utilities
//! - [`utils`] - CSV loading

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod optimizer;

// Workflow
pub mod pipeline;
pub mod visualization;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{ForecastError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForecastError, Result};

    // Preprocessing
    pub use crate::preprocessing::{StandardScaler, train_test_split};

    // Training
    pub use crate::training::{Estimator, ModelType, SelectionPolicy, TrainingConfig};

    // Optimization
    pub use crate::optimizer::{GridSearchCV, ParamGrid, ParameterValue};

    // Pipeline
    pub use crate::pipeline::{ForecastPipeline, PipelineConfig, PipelineReport};

    // Loading
    pub use crate::utils::DataLoader;
}
