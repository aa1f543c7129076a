//! Persistence: result CSV, run summary JSON, and input-table CSVs.
//!
//! Every writer creates or replaces its target file.

use std::fs::File;
use std::path::Path;

use chrono::Utc;
use log::info;

use crate::data::{SeriesTable, TestPoints};
use crate::domain::{AssignmentCounts, SummaryFile};
use crate::error::{AppError, MatchError};
use crate::fit::selection::FitSelection;
use crate::fit::threshold::ThresholdMap;
use crate::report::ResultSet;

/// Write the assignment table (`x,y,ideal_function,deviation`), sorted by x.
pub fn write_results_csv(path: &Path, results: &ResultSet, accepted_only: bool) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create results CSV '{}': {e}", path.display())))?;

    let rows = results.export_rows(accepted_only);
    for row in &rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write results CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush results CSV: {e}")))?;

    info!("wrote {} result rows to {}", rows.len(), path.display());
    Ok(())
}

/// Build the audit summary of a run.
pub fn build_summary(selection: &FitSelection, thresholds: &ThresholdMap, results: &ResultSet) -> SummaryFile {
    // Thresholds follow the training order of the fits.
    let thresholds = selection
        .chosen_reference_ids()
        .into_iter()
        .filter_map(|id| thresholds.get(id).cloned())
        .collect();

    SummaryFile {
        tool: "ideal".to_string(),
        generated_at: Utc::now(),
        fits: selection.fits.clone(),
        thresholds,
        ssd_table: selection.scores.clone(),
        counts: AssignmentCounts {
            test_points: results.len(),
            assigned: results.assigned_count(),
            unassigned: results.unassigned_count(),
        },
    }
}

/// Write a run summary JSON file.
pub fn write_summary_json(path: &Path, summary: &SummaryFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    info!("wrote run summary to {}", path.display());
    Ok(())
}

/// Read a run summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<SummaryFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let summary: SummaryFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    Ok(summary)
}

/// Write a series table as `x,<col>...`.
///
/// All series must share the first series' domain.
pub fn write_series_table_csv(path: &Path, table: &SeriesTable) -> Result<(), AppError> {
    let Some(first) = table.iter().next() else {
        return Err(MatchError::configuration(format!("table `{}` is empty", table.name())).into());
    };

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;

    let mut header = vec!["x".to_string()];
    header.extend(table.ids().map(|id| table.column_name(id).to_string()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for x in first.xs() {
        let mut row = Vec::with_capacity(header.len());
        row.push(x.to_string());
        for s in table.iter() {
            row.push(s.lookup(x)?.to_string());
        }
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;
    Ok(())
}

/// Write test rows as `x,y` in their stored order.
pub fn write_test_points_csv(path: &Path, points: &TestPoints) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    for s in points.samples() {
        writer
            .serialize(s)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentRecord, FitResult, Sample, Threshold};
    use crate::io::ingest::{parse_series_table, parse_test_points};

    #[test]
    fn results_csv_has_mapping_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let results = ResultSet::from_records(vec![
            AssignmentRecord::unassigned(Sample::new(2.0, 7.5)),
            AssignmentRecord::assigned(Sample::new(-1.0, 0.5), "ideal.y3", 0.25),
        ]);

        write_results_csv(&path, &results, false).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "x,y,ideal_function,deviation\n-1.0,0.5,ideal.y3,0.25\n2.0,7.5,,\n");

        write_results_csv(&path, &results, true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn summary_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let selection = FitSelection {
            fits: vec![FitResult {
                training_id: "train.y1".to_string(),
                reference_id: "ideal.y4".to_string(),
                ssd: 3.5,
            }],
            scores: Vec::new(),
            excluded: Vec::new(),
        };
        let mut thresholds = ThresholdMap::new();
        thresholds.insert("ideal.y4".to_string(), Threshold::from_residual("ideal.y4", 0.5));
        let results = ResultSet::from_records(vec![AssignmentRecord::assigned(
            Sample::new(0.0, 0.0),
            "ideal.y4",
            0.1,
        )]);

        let summary = build_summary(&selection, &thresholds, &results);
        assert_eq!(summary.counts.assigned, 1);
        assert_eq!(summary.thresholds.len(), 1);

        write_summary_json(&path, &summary).unwrap();
        let back = read_summary_json(&path).unwrap();
        assert_eq!(back.fits, summary.fits);
        assert_eq!(back.counts, summary.counts);
        assert_eq!(back.generated_at, summary.generated_at);
        assert_eq!(back.thresholds[0].reference_id, "ideal.y4");
        assert_eq!(back.thresholds[0].threshold, summary.thresholds[0].threshold);
    }

    #[test]
    fn summary_json_keeps_scores_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let selection = FitSelection {
            fits: vec![FitResult {
                training_id: "train.y1".to_string(),
                reference_id: "ideal.y42".to_string(),
                ssd: 3.6650733398390907,
            }],
            scores: Vec::new(),
            excluded: Vec::new(),
        };
        let mut thresholds = ThresholdMap::new();
        thresholds.insert(
            "ideal.y42".to_string(),
            Threshold::from_residual("ideal.y42", 2.0f64.sqrt() / 3.0),
        );

        let summary = build_summary(&selection, &thresholds, &ResultSet::default());
        write_summary_json(&path, &summary).unwrap();
        let back = read_summary_json(&path).unwrap();
        assert_eq!(back.fits[0].ssd.to_bits(), 3.6650733398390907f64.to_bits());
        assert_eq!(back.thresholds[0].threshold.to_bits(), summary.thresholds[0].threshold.to_bits());
    }

    #[test]
    fn tables_written_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let table = SeriesTable::from_columns(
            "ideal",
            &[-0.1, 0.0, 0.30000000000000004],
            vec![
                ("y1".to_string(), vec![1.0, 2.0, 3.0]),
                ("y2".to_string(), vec![-1.5, 0.0, 1e-9]),
            ],
        )
        .unwrap();
        let path = dir.path().join("ideal.csv");
        write_series_table_csv(&path, &table).unwrap();
        let back = parse_series_table(File::open(&path).unwrap(), "ideal").unwrap();
        assert_eq!(back.as_slice(), table.as_slice());

        let points = TestPoints::new(vec![Sample::new(1.0, 2.0), Sample::new(1.0, -3.25)]);
        let path = dir.path().join("test.csv");
        write_test_points_csv(&path, &points).unwrap();
        let parsed = parse_test_points(File::open(&path).unwrap()).unwrap();
        assert_eq!(parsed.points, points);
    }
}
