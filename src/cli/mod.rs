//! Command-line parsing for the ideal-function matcher.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the matching code.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::domain::DomainPolicy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ideal", version, about = "Match noisy training data to ideal functions and classify test points")]
pub struct Cli {
    /// Increase log verbosity (`-v` info, `-vv` debug). `RUST_LOG` takes precedence; `dashboard` logs nothing.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select references, estimate thresholds, assign test points, and print/export the results.
    Run(RunArgs),
    /// Launch the interactive dashboard.
    ///
    /// This runs the same pipeline as `ideal run`, but renders results in a
    /// terminal UI using Ratatui.
    Dashboard(RunArgs),
    /// Write a synthetic train/ideal/test dataset to a directory.
    Generate(GenerateArgs),
}

/// Inputs and options for a matching run.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Training CSV (`x,y1..yK`).
    #[arg(long, env = "IDEAL_TRAIN", default_value = "train.csv")]
    pub train: PathBuf,

    /// Ideal-function CSV (`x,y1..yN`).
    #[arg(long, env = "IDEAL_IDEAL", default_value = "ideal.csv")]
    pub ideal: PathBuf,

    /// Test CSV (`x,y`).
    #[arg(long, env = "IDEAL_TEST", default_value = "test.csv")]
    pub test: PathBuf,

    /// Expected number of training columns (0 disables the check).
    #[arg(long, default_value_t = 4)]
    pub expected_train: usize,

    /// What to do when a training x is missing from a reference.
    #[arg(long, value_enum, default_value_t = DomainPolicy::Abort)]
    pub domain_policy: DomainPolicy,

    /// Allow several training series to select the same reference.
    #[arg(long)]
    pub allow_shared: bool,

    /// Export only assigned rows.
    #[arg(long)]
    pub accepted_only: bool,

    /// Lowest-SSD entries shown per training series.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Result rows printed to the terminal (0 prints all).
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the assignment table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export a run summary (fits, thresholds, SSD table, counts) to JSON.
    #[arg(long = "export-summary")]
    pub export_summary: Option<PathBuf>,
}

/// Options for synthetic data generation.
#[derive(Debug, Parser, Clone)]
pub struct GenerateArgs {
    /// Output directory for `train.csv`, `ideal.csv` and `test.csv`.
    #[arg(long, env = "IDEAL_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of ideal functions.
    #[arg(long, default_value_t = 50)]
    pub ideal_count: usize,

    /// Number of training columns.
    #[arg(long, default_value_t = 4)]
    pub train_count: usize,

    /// Number of test rows.
    #[arg(long, default_value_t = 100)]
    pub test_count: usize,

    /// Gaussian noise standard deviation.
    #[arg(long, default_value_t = 0.3)]
    pub noise: f64,

    /// Share of test rows generated as outliers.
    #[arg(long, default_value_t = 0.1)]
    pub outlier_fraction: f64,

    /// Grid start.
    #[arg(long, default_value_t = -20.0, allow_hyphen_values = true)]
    pub x_min: f64,

    /// Grid end.
    #[arg(long, default_value_t = 20.0, allow_hyphen_values = true)]
    pub x_max: f64,

    /// Grid spacing.
    #[arg(long, default_value_t = 0.1)]
    pub step: f64,
}
