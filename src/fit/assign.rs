//! Test-point assignment.
//!
//! For each test sample:
//! 1. candidates whose domain does not contain the sample's x are skipped
//! 2. the candidate with the smallest `|y - reference.y(x)|` is picked
//!    (ties go to the naturally smallest reference id)
//! 3. the pick is kept only if its deviation is within that reference's threshold
//!
//! Every sample yields exactly one record, assigned or not.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::data::{SeriesTable, TestPoints};
use crate::domain::{AssignmentRecord, Sample, Series, Threshold, compare_ids};
use crate::error::MatchError;
use crate::fit::selection::FitSelection;
use crate::fit::threshold::ThresholdMap;
use crate::report::ResultSet;

/// A chosen reference together with its acceptance threshold.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub series: &'a Series,
    pub threshold: &'a Threshold,
}

impl<'a> Candidate<'a> {
    pub fn id(&self) -> &'a str {
        self.series.id()
    }
}

/// Pair every chosen reference with its threshold.
///
/// Fails if a chosen reference is missing from `references` or has no threshold.
pub fn resolve_candidates<'a>(
    selection: &FitSelection,
    references: &'a SeriesTable,
    thresholds: &'a ThresholdMap,
) -> Result<Vec<Candidate<'a>>, MatchError> {
    selection
        .chosen_reference_ids()
        .into_iter()
        .map(|id| -> Result<Candidate<'a>, MatchError> {
            let series = references.series(id)?;
            let threshold = thresholds.get(id).ok_or_else(|| {
                MatchError::configuration(format!("no threshold for chosen reference `{id}`"))
            })?;
            Ok(Candidate { series, threshold })
        })
        .collect()
}

/// Assign one test sample to at most one candidate.
pub fn assign_point(point: Sample, candidates: &[Candidate<'_>]) -> AssignmentRecord {
    let closest = candidates
        .iter()
        .filter_map(|c| {
            c.series
                .value_at(point.x)
                .map(|y_ref| (c, (point.y - y_ref).abs()))
        })
        .min_by(|(a, da), (b, db)| rank_deviation(a, *da, b, *db));

    match closest {
        Some((c, deviation)) if c.threshold.accepts(deviation) => {
            AssignmentRecord::assigned(point, c.id(), deviation)
        }
        _ => AssignmentRecord::unassigned(point),
    }
}

/// Assign every test sample (in parallel) and collect the ordered result set.
pub fn assign_all(points: &TestPoints, candidates: &[Candidate<'_>]) -> ResultSet {
    let records: Vec<AssignmentRecord> = points
        .samples()
        .par_iter()
        .map(|&p| assign_point(p, candidates))
        .collect();
    ResultSet::from_records(records)
}

fn rank_deviation(a: &Candidate<'_>, da: f64, b: &Candidate<'_>, db: f64) -> Ordering {
    da.total_cmp(&db).then_with(|| compare_ids(a.id(), b.id()))
}
