//! Pipeline configuration

use crate::error::Result;
use crate::optimizer::ParamGrid;
use crate::training::{ModelType, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Every constant the pipeline uses.
///
/// Defaults: `hour.csv`, seed 42, 30% holdout, scaled `temp`/`hum`/`windspeed`,
/// 10 comparison folds, 5 tuning folds, charts for hours 9 and 18.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hourly rentals CSV
    pub data_path: PathBuf,

    /// Seed of the train/test shuffle
    pub seed: u64,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Columns standardized with training statistics
    pub scale_columns: Vec<String>,

    /// Model comparison settings
    pub training: TrainingConfig,

    /// Hyperparameter grid per model family, used for whichever family is
    /// selected; a missing or empty grid refits the family's defaults
    pub grids: BTreeMap<ModelType, ParamGrid>,

    /// Folds used while tuning
    pub tuning_cv_folds: usize,

    /// Hours of the day to chart
    pub plot_hours: Vec<i64>,

    /// Output directory for charts, `None` disables plotting
    pub plot_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("hour.csv"),
            seed: 42,
            test_size: 0.3,
            scale_columns: vec!["temp".to_string(), "hum".to_string(), "windspeed".to_string()],
            training: TrainingConfig::default(),
            grids: ModelType::all()
                .into_iter()
                .map(|model_type| (model_type, ParamGrid::default_for(model_type)))
                .collect(),
            tuning_cv_folds: 5,
            plot_hours: vec![9, 18],
            plot_dir: Some(PathBuf::from("plots")),
        }
    }
}

impl PipelineConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Self::default()
        }
    }

    /// Read a JSON config; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    /// Replace the grid of one model family
    pub fn with_grid(mut self, model_type: ModelType, grid: ParamGrid) -> Self {
        self.grids.insert(model_type, grid);
        self
    }

    /// Grid searched when `model_type` is selected
    pub fn grid_for(&self, model_type: ModelType) -> ParamGrid {
        self.grids.get(&model_type).cloned().unwrap_or_else(ParamGrid::new)
    }

    pub fn with_tuning_cv(mut self, folds: usize) -> Self {
        self.tuning_cv_folds = folds;
        self
    }

    pub fn with_plot_hours(mut self, hours: Vec<i64>) -> Self {
        self.plot_hours = hours;
        self
    }

    pub fn with_plot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.plot_dir = dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use crate::training::SelectionPolicy;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.scale_columns, vec!["temp", "hum", "windspeed"]);
        assert_eq!(config.training.cv_folds, 10);
        assert_eq!(config.tuning_cv_folds, 5);
        assert_eq!(config.grid_for(ModelType::RandomForest).n_candidates(), 8);
        assert_eq!(config.grid_for(ModelType::DecisionTree).n_candidates(), 4);
        assert!(config.grid_for(ModelType::LinearRegression).is_empty());
        assert_eq!(config.plot_hours, vec![9, 18]);
        assert_eq!(
            config.training.selection,
            SelectionPolicy::Fixed(ModelType::RandomForest)
        );
    }

    #[test]
    fn test_load_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"seed": 7, "plot_dir": null, "grids": {{"RandomForest": {{"max_depth": [4]}}}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.plot_dir, None);
        assert_eq!(config.grid_for(ModelType::RandomForest).n_candidates(), 1);
        assert!(config.grid_for(ModelType::DecisionTree).is_empty());
        assert_eq!(config.test_size, 0.3);
    }

    #[test]
    fn test_load_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PipelineConfig::load(file.path()),
            Err(ForecastError::SerializationError(_))
        ));
    }
}
