//! Bikeshare forecast CLI Module
//!
//! Command-line entry for the forecasting pipeline and its terminal summary.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::optimizer::format_params;
use crate::pipeline::{ForecastPipeline, PipelineConfig, PipelineReport};
use crate::training::SelectionPolicy;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    println!("  {} {}...", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("  {} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "bikeshare-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hourly bike rental demand forecasting with tree ensembles")]
#[command(long_about = None)]
pub struct Cli {
    /// Hourly rentals CSV (defaults to the config value, then hour.csv)
    pub data: Option<PathBuf>,

    /// JSON file overriding pipeline defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the per-hour charts
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long, conflicts_with = "plot_dir")]
    pub no_plots: bool,

    /// Tune the model family with the lowest CV RMSE instead of the forest
    #[arg(long)]
    pub select_best: bool,

    /// Write the full run report as JSON
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Merge command-line overrides into the configuration
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if self.no_plots {
            config.plot_dir = None;
        } else if let Some(dir) = &self.plot_dir {
            config.plot_dir = Some(dir.clone());
        }
        if self.select_best {
            config.training.selection = SelectionPolicy::MinRmse;
        }

        Ok(config)
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Run the pipeline and print its summary
pub fn cmd_run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.pipeline_config()?;

    section("Forecast");
    kv("Data", &config.data_path.display().to_string());
    kv("Seed", &config.seed.to_string());
    kv("Test size", &config.test_size.to_string());

    step_run("Running pipeline");
    let start = Instant::now();
    let output = ForecastPipeline::new(config).run()?;
    step_done(&format!("{:.1?}", start.elapsed()));

    print_report(&output.report);

    if let Some(path) = &cli.report {
        output.report.save(path)?;
        step_ok(&format!("Report written to {}", path.display()));
    }

    println!();
    println!("Final RMSE: {}", output.report.final_rmse());
    Ok(())
}

fn print_report(report: &PipelineReport) {
    section("Data");
    kv("Rows", &report.n_rows.to_string());
    kv("Train / test", &format!("{} / {}", report.n_train, report.n_test));
    kv("Features", &report.feature_columns.join(", "));
    for col in &report.scaling {
        kv(
            &format!("Scaled {}", col.column),
            &format!("mean {:.4}  std {:.4}", col.mean, col.scale),
        );
    }

    section("Model comparison");
    println!(
        "  {:<20} {:>10} {:>10} {:>10} {:>9}",
        muted("Model"),
        muted("MAE"),
        muted("RMSE"),
        muted("RMSE std"),
        muted("Time")
    );
    for c in &report.comparisons {
        let name = if c.model_type == report.selected_model {
            c.model_type.display_name().cyan().bold()
        } else {
            c.model_type.display_name().white()
        };
        println!(
            "  {:<20} {:>10.3} {:>10.3} {:>10.3} {:>8.1}s",
            name,
            c.mean_mae(),
            c.mean_rmse(),
            c.cv.rmse.std_score,
            c.training_time_secs
        );
    }
    let policy = match &report.selection {
        SelectionPolicy::Fixed(_) => "fixed",
        SelectionPolicy::MinRmse => "lowest CV RMSE",
    };
    kv("Selected", &format!("{} ({})", report.selected_model, policy));

    section("Tuning");
    if report.tuning.best_params.is_empty() {
        kv("Best params", "defaults (nothing to search)");
    } else {
        kv("Best params", &format_params(&report.tuning.best_params));
    }
    kv("Best CV RMSE", &format!("{:.3}", (-report.tuning.best_score).sqrt()));
    kv("Candidates", &report.tuning.candidates.len().to_string());
    if let Some(importances) = &report.feature_importances {
        for fi in importances.iter().take(5) {
            kv(&fi.feature, &format!("{:.4}", fi.importance));
        }
    }

    section("Holdout");
    if let Some(mae) = report.evaluation.mae {
        kv("MAE", &format!("{:.3}", mae));
    }
    if let Some(r2) = report.evaluation.r2 {
        kv("R²", &format!("{:.4}", r2));
    }
    for path in &report.plots {
        step_ok(&format!("Chart {}", path.display()));
    }
}
