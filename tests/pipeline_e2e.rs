use std::path::Path;

use ideal_match::app::pipeline::{match_tables, run_match};
use ideal_match::app::write_dataset;
use ideal_match::data::{GenerateConfig, generate_dataset};
use ideal_match::domain::{DomainPolicy, RunConfig};
use ideal_match::fit::SelectOptions;
use ideal_match::io::export::{build_summary, read_summary_json, write_results_csv, write_summary_json};

fn quiet_config() -> GenerateConfig {
    GenerateConfig {
        seed: 7,
        noise: 0.1,
        outlier_fraction: 0.1,
        ..GenerateConfig::default()
    }
}

fn run_config(dir: &Path) -> RunConfig {
    RunConfig {
        train_path: dir.join("train.csv"),
        ideal_path: dir.join("ideal.csv"),
        test_path: dir.join("test.csv"),
        expected_train: 4,
        domain_policy: DomainPolicy::Abort,
        require_distinct: true,
        accepted_only: false,
        top_ssd: 5,
        print_rows: 20,
        plot: false,
        plot_width: 80,
        plot_height: 20,
        export_results: None,
        export_summary: None,
    }
}

#[test]
fn recovers_hidden_references_from_generated_data() {
    let data = generate_dataset(&quiet_config()).unwrap();
    let outcome = match_tables(&data.train, &data.ideal, &data.test, &SelectOptions::default()).unwrap();

    let chosen: Vec<&str> = outcome.selection.fits.iter().map(|f| f.reference_id.as_str()).collect();
    assert_eq!(chosen, data.chosen.iter().map(String::as_str).collect::<Vec<_>>());

    let results = &outcome.results;
    assert_eq!(results.len(), data.test.len());
    assert!(results.records().windows(2).all(|w| w[0].x <= w[1].x));
    assert!(results.assigned_count() * 2 > results.len());

    for rec in results.assigned() {
        let id = rec.reference_id.as_deref().unwrap();
        assert!(rec.deviation <= outcome.thresholds[id].threshold);
    }
}

#[test]
fn matching_is_deterministic() {
    let data = generate_dataset(&quiet_config()).unwrap();
    let a = match_tables(&data.train, &data.ideal, &data.test, &SelectOptions::default()).unwrap();
    let b = match_tables(&data.train, &data.ideal, &data.test, &SelectOptions::default()).unwrap();
    assert_eq!(a.selection.fits, b.selection.fits);
    assert_eq!(a.thresholds, b.thresholds);
    assert_eq!(a.results.export_rows(false), b.results.export_rows(false));
}

#[test]
fn files_round_trip_through_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let data = generate_dataset(&quiet_config()).unwrap();
    write_dataset(dir.path(), &data).unwrap();

    let config = run_config(dir.path());
    let run = run_match(&config).unwrap();
    let in_memory = match_tables(&data.train, &data.ideal, &data.test, &SelectOptions::default()).unwrap();

    assert_eq!(run.ingest.train.len(), 4);
    assert_eq!(run.ingest.ideal.len(), 50);
    assert!(run.ingest.row_errors.is_empty());
    assert_eq!(run.outcome.selection.fits, in_memory.selection.fits);
    assert_eq!(run.outcome.results.len(), in_memory.results.len());

    let results_path = dir.path().join("results.csv");
    write_results_csv(&results_path, &run.outcome.results, true).unwrap();
    let text = std::fs::read_to_string(&results_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("x,y,ideal_function,deviation"));
    assert_eq!(lines.count(), run.outcome.results.assigned_count());

    let summary_path = dir.path().join("summary.json");
    let summary = build_summary(&run.outcome.selection, &run.outcome.thresholds, &run.outcome.results);
    write_summary_json(&summary_path, &summary).unwrap();
    let back = read_summary_json(&summary_path).unwrap();
    assert_eq!(back.fits, summary.fits);
    assert_eq!(back.counts.test_points, data.test.len());
}

#[test]
fn wrong_training_width_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let data = generate_dataset(&GenerateConfig {
        train_count: 3,
        ..quiet_config()
    })
    .unwrap();
    write_dataset(dir.path(), &data).unwrap();

    let err = run_match(&run_config(dir.path())).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn missing_training_x_aborts_or_excludes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("train.csv"), "x,y1\n0,0\n1,1\n2,4\n").unwrap();
    std::fs::write(dir.path().join("ideal.csv"), "x,y1,y2\n0,0,9\n1,1,9\n").unwrap();
    std::fs::write(dir.path().join("test.csv"), "x,y\n1,1\n").unwrap();

    let mut config = run_config(dir.path());
    config.expected_train = 1;

    let err = run_match(&config).unwrap_err();
    assert_eq!(err.exit_code(), 3);

    // Every reference misses x=2, so nothing is left to select from.
    config.domain_policy = DomainPolicy::Exclude;
    let err = run_match(&config).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
