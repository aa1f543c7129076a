//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - runs the matching pipeline
//! - prints reports/plots
//! - writes optional exports

use std::path::Path;

use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Command, GenerateArgs, RunArgs};
use crate::data::{GenerateConfig, generate_dataset};
use crate::domain::RunConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `ideal` binary.
pub fn run() -> Result<(), AppError> {
    // Missing `.env` is fine; explicit flags and real env vars still apply.
    dotenvy::dotenv().ok();

    // `ideal` and `ideal --train a.csv` behave like `ideal run ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(log_filter(cli.verbose, &cli.command));

    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Dashboard(args) => handle_dashboard(&args),
        Command::Generate(args) => handle_generate(&args),
    }
}

/// Log level for a command. The dashboard draws on the terminal's alternate
/// screen, so stderr output would tear it; it reports through its status line.
fn log_filter(verbose: u8, command: &Command) -> Option<LevelFilter> {
    if matches!(command, Command::Dashboard(_)) {
        return None;
    }
    Some(match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    })
}

fn init_logging(filter: Option<LevelFilter>) {
    let result = match filter {
        Some(level) => {
            let env = env_logger::Env::default().default_filter_or(level.as_str());
            env_logger::Builder::from_env(env).format_timestamp(None).try_init()
        }
        None => env_logger::Builder::new().filter_level(LevelFilter::Off).try_init(),
    };
    // A second init (e.g. from tests) is harmless.
    let _ = result;
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args);
    let run = pipeline::run_match(&config)?;
    let outcome = &run.outcome;

    println!("{}", crate::report::format_run_summary(&run.ingest, outcome));
    println!("{}", crate::report::format_ssd_table(&outcome.selection, config.top_ssd));
    println!("{}", crate::report::format_results(&outcome.results, config.print_rows));

    if config.plot {
        println!(
            "{}",
            crate::plot::render_ssd_bars(&outcome.selection, config.top_ssd, config.plot_width)
        );
        let plot = crate::plot::render_results_plot(
            &outcome.selection,
            &run.ingest.ideal,
            &outcome.results,
            config.plot_width,
            config.plot_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &outcome.results, config.accepted_only)?;
    }
    if let Some(path) = &config.export_summary {
        let summary =
            crate::io::export::build_summary(&outcome.selection, &outcome.thresholds, &outcome.results);
        crate::io::export::write_summary_json(path, &summary)?;
    }

    Ok(())
}

fn handle_dashboard(args: &RunArgs) -> Result<(), AppError> {
    crate::tui::run(run_config_from_args(args))
}

fn handle_generate(args: &GenerateArgs) -> Result<(), AppError> {
    let config = GenerateConfig {
        seed: args.seed,
        ideal_count: args.ideal_count,
        train_count: args.train_count,
        test_count: args.test_count,
        noise: args.noise,
        outlier_fraction: args.outlier_fraction,
        x_min: args.x_min,
        x_max: args.x_max,
        step: args.step,
    };
    let data = generate_dataset(&config)?;
    write_dataset(&args.out_dir, &data)?;

    println!(
        "Wrote train.csv ({} series), ideal.csv ({} series), test.csv ({} rows) to {}",
        data.train.len(),
        data.ideal.len(),
        data.test.len(),
        args.out_dir.display()
    );
    println!("Hidden references: {}", data.chosen.join(", "));
    Ok(())
}

/// Write a generated dataset as `train.csv`, `ideal.csv` and `test.csv` under `dir`.
pub fn write_dataset(dir: &Path, data: &crate::data::SyntheticData) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
    crate::io::export::write_series_table_csv(&dir.join("train.csv"), &data.train)?;
    crate::io::export::write_series_table_csv(&dir.join("ideal.csv"), &data.ideal)?;
    crate::io::export::write_test_points_csv(&dir.join("test.csv"), &data.test)?;
    info!("generated dataset in {}", dir.display());
    Ok(())
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        train_path: args.train.clone(),
        ideal_path: args.ideal.clone(),
        test_path: args.test.clone(),
        expected_train: args.expected_train,
        domain_policy: args.domain_policy,
        require_distinct: !args.allow_shared,
        accepted_only: args.accepted_only,
        top_ssd: args.top,
        print_rows: args.rows,
        plot: args.plot && !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_results: args.export.clone(),
        export_summary: args.export_summary.clone(),
    }
}

/// Rewrite argv so `ideal` defaults to `ideal run`.
///
/// Rules:
/// - `ideal`                         -> `ideal run`
/// - `ideal --train a.csv ...`       -> `ideal run --train a.csv ...`
/// - `ideal --help/--version/-h`     -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "dashboard" | "generate");
    if is_subcommand {
        return argv;
    }

    // A leading flag means "run flags"; global `-v` still works after `run`.
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_runs() {
        assert_eq!(rewrite_args(args(&["ideal"])), args(&["ideal", "run"]));
    }

    #[test]
    fn leading_flags_imply_run() {
        assert_eq!(
            rewrite_args(args(&["ideal", "-v", "--train", "t.csv"])),
            args(&["ideal", "run", "-v", "--train", "t.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        for argv in [
            args(&["ideal", "generate"]),
            args(&["ideal", "dashboard", "--no-plot"]),
            args(&["ideal", "--help"]),
        ] {
            assert_eq!(rewrite_args(argv.clone()), argv);
        }
    }

    #[test]
    fn config_maps_flags() {
        let cli = crate::cli::Cli::parse_from(["ideal", "run", "--allow-shared", "--no-plot", "--rows", "0"]);
        let Command::Run(run_args) = cli.command else {
            panic!("expected run");
        };
        let config = run_config_from_args(&run_args);
        assert!(!config.require_distinct);
        assert!(!config.plot);
        assert_eq!(config.print_rows, 0);
        assert_eq!(config.expected_train, 4);
    }

    #[test]
    fn dashboard_silences_logging() {
        let cli = crate::cli::Cli::parse_from(["ideal", "-vv", "dashboard"]);
        assert_eq!(log_filter(cli.verbose, &cli.command), None);

        let cli = crate::cli::Cli::parse_from(["ideal", "run", "-v"]);
        assert_eq!(log_filter(cli.verbose, &cli.command), Some(LevelFilter::Info));
        assert_eq!(log_filter(0, &cli.command), Some(LevelFilter::Warn));
    }
}
