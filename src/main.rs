//! Bikeshare forecast - Main Entry Point
//!
//! Runs the hourly demand pipeline and prints the holdout RMSE.

use bikeshare_forecast::cli::{cmd_run, Cli};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the summary
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bikeshare_forecast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cmd_run(&cli)
}
