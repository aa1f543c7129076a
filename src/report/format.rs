//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the matching code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::MatchOutcome;
use crate::domain::ScoreEntry;
use crate::fit::selection::{FitSelection, rank_scores};
use crate::io::ingest::IngestedData;
use crate::report::ResultSet;

/// Format the run summary (inputs + chosen references + thresholds + totals).
pub fn format_run_summary(ingest: &IngestedData, outcome: &MatchOutcome) -> String {
    let mut out = String::new();

    out.push_str("=== ideal - reference matching ===\n");
    out.push_str(&format!(
        "Train: {} series | Ideal: {} series | Test: {} points",
        ingest.train.len(),
        ingest.ideal.len(),
        ingest.test.len(),
    ));
    if !ingest.row_errors.is_empty() {
        out.push_str(&format!(" ({} test rows skipped)", ingest.row_errors.len()));
    }
    out.push('\n');

    out.push_str("\nChosen references:\n");
    for fit in &outcome.selection.fits {
        let (max_res, threshold) = outcome
            .thresholds
            .get(&fit.reference_id)
            .map(|t| (t.max_training_residual, t.threshold))
            .unwrap_or((f64::NAN, f64::NAN));
        out.push_str(&format!(
            "  {:<10} -> {:<12} SSD={:<12.4} max_residual={:.4} threshold={:.4}\n",
            fit.training_id, fit.reference_id, fit.ssd, max_res, threshold
        ));
    }

    if !outcome.selection.excluded.is_empty() {
        out.push_str(&format!(
            "\nExcluded pairs ({}):\n",
            outcome.selection.excluded.len()
        ));
        for e in &outcome.selection.excluded {
            out.push_str(&format!("  {}\n", e.reason));
        }
    }

    let results = &outcome.results;
    out.push_str(&format!(
        "\nAssignment: {}/{} assigned, {} unassigned\n",
        results.assigned_count(),
        results.len(),
        results.unassigned_count()
    ));
    for id in outcome.selection.chosen_reference_ids() {
        out.push_str(&format!("  {:<12} {}\n", id, results.assigned_to(id).count()));
    }

    out
}

/// Lowest `top_n` SSD scores per training series; the chosen one is starred.
pub fn format_ssd_table(selection: &FitSelection, top_n: usize) -> String {
    let mut out = String::new();
    for ts in &selection.scores {
        let chosen = selection
            .fit_for(&ts.training_id)
            .map(|f| f.reference_id.as_str())
            .unwrap_or("");

        out.push_str(&format!("SSD for {} (lowest {}):\n", ts.training_id, top_n.min(ts.scores.len())));
        for e in lowest_scores(&ts.scores, top_n) {
            let mark = if e.reference_id == chosen { "*" } else { " " };
            out.push_str(&format!("{mark} {:<14} {:>16.4}\n", e.reference_id, e.ssd));
        }
        out.push('\n');
    }
    out
}

/// Format the result table (all rows when `limit == 0`).
pub fn format_results(results: &ResultSet, limit: usize) -> String {
    let mut out = String::new();
    out.push_str(
        format!("{:>12} {:>12} {:<16} {:>12}", "x", "y", "ideal_function", "deviation").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:->12} {:->12} {:-<16} {:->12}", "", "", "", "").trim_end());
    out.push('\n');

    let shown = if limit == 0 { results.len() } else { limit.min(results.len()) };
    for r in &results.records()[..shown] {
        let (id, dev) = match &r.reference_id {
            Some(id) => (truncate(id, 16), format!("{:.4}", r.deviation)),
            None => ("-".to_string(), "-".to_string()),
        };
        out.push_str(format!("{:>12.4} {:>12.4} {:<16} {:>12}", r.x, r.y, id, dev).trim_end());
        out.push('\n');
    }
    if shown < results.len() {
        out.push_str(&format!("... {} more rows\n", results.len() - shown));
    }

    out
}

/// The `n` lowest scores in ascending order (ties by natural reference id).
pub fn lowest_scores(scores: &[ScoreEntry], n: usize) -> Vec<&ScoreEntry> {
    let mut sorted: Vec<&ScoreEntry> = scores.iter().collect();
    sorted.sort_by(|a, b| rank_scores(a, b));
    sorted.truncate(n);
    sorted
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssignmentRecord, FitResult, Sample, TrainingScores};

    fn selection() -> FitSelection {
        FitSelection {
            fits: vec![FitResult {
                training_id: "train.y1".to_string(),
                reference_id: "ideal.y2".to_string(),
                ssd: 1.0,
            }],
            scores: vec![TrainingScores {
                training_id: "train.y1".to_string(),
                scores: vec![
                    ScoreEntry { reference_id: "ideal.y1".to_string(), ssd: 9.0 },
                    ScoreEntry { reference_id: "ideal.y2".to_string(), ssd: 1.0 },
                    ScoreEntry { reference_id: "ideal.y3".to_string(), ssd: 4.0 },
                ],
            }],
            excluded: Vec::new(),
        }
    }

    #[test]
    fn ssd_table_lists_lowest_first_and_marks_choice() {
        let text = format_ssd_table(&selection(), 2);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "SSD for train.y1 (lowest 2):");
        assert!(lines[1].starts_with("* ideal.y2"));
        assert!(lines[2].starts_with("  ideal.y3"));
        assert!(!text.contains("ideal.y1 "));
    }

    #[test]
    fn result_table_truncates_with_footer() {
        let results = ResultSet::from_records(vec![
            AssignmentRecord::assigned(Sample::new(0.0, 1.0), "ideal.y2", 0.25),
            AssignmentRecord::unassigned(Sample::new(1.0, 9.0)),
            AssignmentRecord::unassigned(Sample::new(2.0, 9.0)),
        ]);
        let text = format_results(&results, 2);
        assert!(text.contains("ideal.y2"));
        assert!(text.contains("0.2500"));
        assert!(text.ends_with("... 1 more rows\n"));

        let all = format_results(&results, 0);
        assert_eq!(all.lines().count(), 2 + 3);
    }
}
