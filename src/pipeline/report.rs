//! Serializable summary of a pipeline run

use crate::error::Result;
use crate::optimizer::{CandidateResult, TrialParams};
use crate::training::{ModelComparison, ModelMetrics, ModelType, SelectionPolicy};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Training statistics of one standardized column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaledColumn {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

/// Grid search outcome without the fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningReport {
    pub model_type: ModelType,
    pub best_params: TrialParams,
    /// Mean cross-validated negative MSE of the best candidate
    pub best_score: f64,
    pub candidates: Vec<CandidateResult>,
    pub total_time_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Everything a run computed, in stage order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_columns: Vec<String>,
    pub scaling: Vec<ScaledColumn>,
    pub comparisons: Vec<ModelComparison>,
    pub selection: SelectionPolicy,
    pub selected_model: ModelType,
    pub tuning: TuningReport,
    /// Sorted by decreasing importance, tree models only
    pub feature_importances: Option<Vec<FeatureImportance>>,
    /// Holdout metrics of the tuned model
    pub evaluation: ModelMetrics,
    pub plots: Vec<PathBuf>,
    pub total_time_secs: f64,
}

impl PipelineReport {
    /// Holdout RMSE of the tuned model
    pub fn final_rmse(&self) -> f64 {
        self.evaluation.rmse.unwrap_or(f64::NAN)
    }

    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
