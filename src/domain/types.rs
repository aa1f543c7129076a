//! Shared domain types.
//!
//! These types are value objects owned by a single run. They are kept
//! lightweight and serializable so they can be:
//!
//! - used in-memory during selection and assignment
//! - exported to CSV/JSON
//! - reloaded later for inspection

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;

/// Multiplier applied to the largest training residual to obtain the
/// acceptance threshold of a reference.
pub const ACCEPTANCE_FACTOR: f64 = std::f64::consts::SQRT_2;

/// A single `(x, y)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A named sequence of samples, sorted by x with no duplicate x.
///
/// Lookups are exact: a value exists only at the x values the series was
/// built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    id: String,
    samples: Vec<Sample>,
}

impl Series {
    /// Build a series, sorting by x.
    ///
    /// Fails with `Configuration` on non-finite values or duplicate x.
    pub fn new(id: impl Into<String>, samples: Vec<Sample>) -> Result<Self, MatchError> {
        let id = id.into();
        let mut samples: Vec<Sample> = samples
            .into_iter()
            .map(|s| Sample::new(canonical_x(s.x), s.y))
            .collect();

        if let Some(bad) = samples.iter().find(|s| !s.x.is_finite() || !s.y.is_finite()) {
            return Err(MatchError::configuration(format!(
                "series `{id}` has a non-finite sample ({}, {})",
                bad.x, bad.y
            )));
        }

        samples.sort_by(|a, b| a.x.total_cmp(&b.x));

        if let Some(w) = samples.windows(2).find(|w| w[0].x == w[1].x) {
            return Err(MatchError::configuration(format!(
                "series `{id}` has duplicate x={}",
                w[0].x
            )));
        }

        Ok(Self { id, samples })
    }

    /// Convenience constructor from `(x, y)` pairs.
    pub fn from_pairs(id: impl Into<String>, pairs: &[(f64, f64)]) -> Result<Self, MatchError> {
        Self::new(id, pairs.iter().map(|&(x, y)| Sample::new(x, y)).collect())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The series' domain, in ascending order.
    pub fn xs(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.x)
    }

    /// Value at `x`, if `x` is part of the domain.
    pub fn value_at(&self, x: f64) -> Option<f64> {
        let x = canonical_x(x);
        self.samples
            .binary_search_by(|s| s.x.total_cmp(&x))
            .ok()
            .map(|idx| self.samples[idx].y)
    }

    /// Value at `x`, or a `Domain` error naming this series.
    pub fn lookup(&self, x: f64) -> Result<f64, MatchError> {
        self.value_at(x).ok_or_else(|| MatchError::Domain {
            series: self.id.clone(),
            x,
        })
    }
}

/// `-0.0` and `0.0` must address the same sample.
pub(crate) fn canonical_x(x: f64) -> f64 {
    if x == 0.0 { 0.0 } else { x }
}

/// Best reference for one training series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub training_id: String,
    pub reference_id: String,
    pub ssd: f64,
}

/// Acceptance bound for one chosen reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub reference_id: String,
    pub max_training_residual: f64,
    pub threshold: f64,
}

impl Threshold {
    pub fn from_residual(reference_id: impl Into<String>, max_training_residual: f64) -> Self {
        Self {
            reference_id: reference_id.into(),
            max_training_residual,
            threshold: max_training_residual * ACCEPTANCE_FACTOR,
        }
    }

    /// Inclusive gate: a deviation equal to the threshold is accepted.
    pub fn accepts(&self, deviation: f64) -> bool {
        deviation <= self.threshold
    }
}

/// Outcome for one test sample.
///
/// Unassigned records have `reference_id = None` and `deviation = NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRecord {
    pub x: f64,
    pub y: f64,
    pub reference_id: Option<String>,
    pub deviation: f64,
}

impl AssignmentRecord {
    pub fn assigned(sample: Sample, reference_id: impl Into<String>, deviation: f64) -> Self {
        Self {
            x: sample.x,
            y: sample.y,
            reference_id: Some(reference_id.into()),
            deviation,
        }
    }

    pub fn unassigned(sample: Sample) -> Self {
        Self {
            x: sample.x,
            y: sample.y,
            reference_id: None,
            deviation: f64::NAN,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.reference_id.is_some()
    }
}

/// Compare series ids in natural order: digit runs compare numerically, so
/// `ideal.y2 < ideal.y10`. Ids that are naturally equal (`y01` vs `y1`) fall
/// back to plain string order, keeping the ordering total.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    let (mut rest_a, mut rest_b) = (a, b);
    while !rest_a.is_empty() && !rest_b.is_empty() {
        let (chunk_a, next_a) = split_chunk(rest_a);
        let (chunk_b, next_b) = split_chunk(rest_b);

        let both_numeric = chunk_a.as_bytes()[0].is_ascii_digit() && chunk_b.as_bytes()[0].is_ascii_digit();
        let ord = if both_numeric {
            let na = chunk_a.trim_start_matches('0');
            let nb = chunk_b.trim_start_matches('0');
            na.len().cmp(&nb.len()).then_with(|| na.cmp(nb))
        } else {
            chunk_a.cmp(chunk_b)
        };
        if ord != Ordering::Equal {
            return ord;
        }

        rest_a = next_a;
        rest_b = next_b;
    }

    // Whichever ran out first is the prefix and sorts first.
    rest_b
        .is_empty()
        .cmp(&rest_a.is_empty())
        .then_with(|| a.cmp(b))
}

/// Split off the leading run of digits or non-digits.
fn split_chunk(s: &str) -> (&str, &str) {
    let numeric = s.starts_with(|c: char| c.is_ascii_digit());
    let end = s
        .find(|c: char| c.is_ascii_digit() != numeric)
        .unwrap_or(s.len());
    s.split_at(end)
}

/// What to do when a reference does not cover a training x during scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DomainPolicy {
    /// Fail the run, naming the pair.
    Abort,
    /// Drop the pair from selection and report it.
    Exclude,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` / environment fallbacks).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub train_path: PathBuf,
    pub ideal_path: PathBuf,
    pub test_path: PathBuf,

    /// Expected number of training y-columns (`0` disables the check).
    pub expected_train: usize,
    pub domain_policy: DomainPolicy,
    /// Require every training series to select a different reference.
    pub require_distinct: bool,

    /// Persist only assigned rows.
    pub accepted_only: bool,
    /// Lowest-SSD entries shown per training series.
    pub top_ssd: usize,
    /// Result rows printed to the terminal (`0` prints all).
    pub print_rows: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
}

/// One SSD score of a training series against one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub reference_id: String,
    pub ssd: f64,
}

/// All SSD scores of one training series, in reference table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingScores {
    pub training_id: String,
    pub scores: Vec<ScoreEntry>,
}

/// Assignment totals for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCounts {
    pub test_points: usize,
    pub assigned: usize,
    pub unassigned: usize,
}

/// A saved run summary (JSON): what was chosen, why, and how tests were assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub fits: Vec<FitResult>,
    pub thresholds: Vec<Threshold>,
    pub ssd_table: Vec<TrainingScores>,
    pub counts: AssignmentCounts,
}
