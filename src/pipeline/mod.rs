//! End-to-end forecasting pipeline
//!
//! Stages run in order, each returning new values:
//! 1. load `hour.csv` and derive `dayCount`
//! 2. seeded train/test split
//! 3. standard scaling fitted on the training rows
//! 4. K-Fold comparison of the three model families
//! 5. model selection and grid search
//! 6. holdout evaluation in `dayCount` order
//! 7. optional per-hour charts

mod config;
mod report;

pub use config::PipelineConfig;
pub use report::{FeatureImportance, PipelineReport, ScaledColumn, TuningReport};

use crate::error::Result;
use crate::optimizer::GridSearchCV;
use crate::preprocessing::{columns_to_array2, feature_columns, target_array, train_test_split, StandardScaler};
use crate::training::{compare_models, select_model, Estimator, ModelMetrics};
use crate::utils::{DataLoader, DAY_COUNT_COLUMN};
use crate::visualization::{hourly_series, plot_hour, PREDICTION_COLUMN};
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Report plus the sorted test frame carrying the prediction column
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: PipelineReport,
    pub evaluated: DataFrame,
}

/// Runs the forecasting workflow for one configuration
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl ForecastPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured CSV and run every stage
    pub fn run(&self) -> Result<PipelineOutput> {
        let df = DataLoader::new().load_csv(&self.config.data_path)?;
        self.run_on_frame(&df)
    }

    /// Run every stage on an already loaded table
    pub fn run_on_frame(&self, raw: &DataFrame) -> Result<PipelineOutput> {
        let start = Instant::now();
        let config = &self.config;

        let data = DataLoader::with_day_count(raw)?;
        let (train, test) = train_test_split(&data, config.test_size, config.seed)?;

        let scale_cols: Vec<&str> = config.scale_columns.iter().map(String::as_str).collect();
        let mut scaler = StandardScaler::new();
        let train = scaler.fit_transform(&train, &scale_cols)?;
        let test = scaler.transform(&test)?;
        let scaling = scale_cols
            .iter()
            .map(|&column| ScaledColumn {
                column: column.to_string(),
                mean: scaler.mean(column).unwrap_or(0.0),
                scale: scaler.scale(column).unwrap_or(1.0),
            })
            .collect();
        info!(columns = ?config.scale_columns, "Scaled features with training statistics");

        let features = feature_columns(&train, &config.training.drop_columns)?;
        let x_train = columns_to_array2(&train, &features)?;
        let y_train = target_array(&train, &config.training.target_column)?;

        let comparisons = compare_models(&x_train, &y_train, &config.training)?;
        let selected_model = select_model(&config.training.selection, &comparisons)?;
        info!(
            policy = ?config.training.selection,
            model = %selected_model,
            "Selected model for tuning"
        );

        let base = Estimator::default_for(selected_model, &config.training);
        let search =
            GridSearchCV::new(config.grid_for(selected_model)).with_cv(config.tuning_cv_folds);
        let tuned = search.fit(&base, &x_train, &y_train)?;

        let feature_importances = tuned.best_estimator.feature_importances().map(|imp| {
            let mut ranked: Vec<FeatureImportance> = features
                .iter()
                .zip(imp.iter())
                .map(|(feature, &importance)| FeatureImportance {
                    feature: feature.clone(),
                    importance,
                })
                .collect();
            ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
            ranked
        });

        let (evaluated, evaluation) = self.evaluate(&test, &features, &tuned.best_estimator)?;

        let mut plots = Vec::new();
        if let Some(dir) = &config.plot_dir {
            for &hour in &config.plot_hours {
                let series = hourly_series(&evaluated, hour, &config.training.target_column)?;
                if let Some(path) = plot_hour(&series, dir)? {
                    plots.push(path);
                }
            }
        }

        let report = PipelineReport {
            n_rows: data.height(),
            n_train: train.height(),
            n_test: test.height(),
            feature_columns: features,
            scaling,
            comparisons,
            selection: config.training.selection.clone(),
            selected_model,
            tuning: TuningReport {
                model_type: selected_model,
                best_params: tuned.best_params,
                best_score: tuned.best_score,
                candidates: tuned.cv_results,
                total_time_secs: tuned.total_time_secs,
            },
            feature_importances,
            evaluation,
            plots,
            total_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            rmse = report.final_rmse(),
            secs = report.total_time_secs,
            "Pipeline finished"
        );
        Ok(PipelineOutput { report, evaluated })
    }

    /// Predict the test rows in `dayCount` order and score them
    fn evaluate(
        &self,
        test: &DataFrame,
        features: &[String],
        model: &Estimator,
    ) -> Result<(DataFrame, ModelMetrics)> {
        let sorted = test.sort([DAY_COUNT_COLUMN], SortMultipleOptions::default())?;
        let x_test = columns_to_array2(&sorted, features)?;
        let y_test = target_array(&sorted, &self.config.training.target_column)?;

        let predictions = model.predict(&x_test)?;
        let mut metrics = ModelMetrics::compute_regression(&y_test, &predictions);
        metrics.n_features = features.len();

        let mut evaluated = sorted;
        evaluated.with_column(Series::new(PREDICTION_COLUMN.into(), predictions.to_vec()))?;

        info!(
            rows = metrics.n_samples,
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            "Holdout evaluation"
        );
        Ok((evaluated, metrics))
    }
}

/// Run the pipeline described by `config`
pub fn run(config: PipelineConfig) -> Result<PipelineOutput> {
    ForecastPipeline::new(config).run()
}
