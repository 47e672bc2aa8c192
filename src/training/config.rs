//! Training configuration

use serde::{Deserialize, Serialize};

/// Type of model to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// CART regression tree
    DecisionTree,
    /// Ordinary least squares
    LinearRegression,
    /// Bagged regression trees
    RandomForest,
}

impl ModelType {
    /// All model families compared by the pipeline, in report order
    pub fn all() -> [ModelType; 3] {
        [
            ModelType::DecisionTree,
            ModelType::LinearRegression,
            ModelType::RandomForest,
        ]
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::DecisionTree => "Decision Tree",
            ModelType::LinearRegression => "Linear Regression",
            ModelType::RandomForest => "Random Forest",
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How the model family passed to the tuner is chosen after comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Always tune this family, whatever the comparison says
    Fixed(ModelType),
    /// Tune the family with the lowest mean cross-validated RMSE
    MinRmse,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::Fixed(ModelType::RandomForest)
    }
}

/// Configuration for model comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,

    /// Columns excluded from the feature matrix (target and leakage columns)
    pub drop_columns: Vec<String>,

    /// Number of cross-validation folds for model comparison
    pub cv_folds: usize,

    /// Random seed handed to the tree-based models
    pub random_state: Option<u64>,

    /// Number of trees in the untuned forest
    pub n_estimators: usize,

    /// Which family goes on to hyperparameter tuning
    pub selection: SelectionPolicy,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "cnt".to_string(),
            drop_columns: ["cnt", "casual", "registered", "dteday", "atemp", "instant"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cv_folds: 10,
            random_state: Some(42),
            n_estimators: 100,
            selection: SelectionPolicy::default(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration for the given target
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target_column: target.into(),
            ..Default::default()
        }
    }

    /// Builder method to set CV folds
    pub fn with_cv(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Builder method to set number of estimators
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set the selection policy
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Builder method to replace the dropped columns
    pub fn with_drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = columns.into_iter().map(Into::into).collect();
        self
    }
}
