//! Shared matching pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> score & select -> estimate thresholds -> assign all -> emit
//!
//! Each stage consumes the previous stage's immutable output, so re-running on
//! the same tables always yields the same result set.

use log::info;

use crate::data::{SeriesTable, TestPoints};
use crate::domain::RunConfig;
use crate::error::{AppError, MatchError};
use crate::fit::assign::{assign_all, resolve_candidates};
use crate::fit::selection::{FitSelection, SelectOptions, select_best};
use crate::fit::threshold::{ThresholdMap, estimate_thresholds};
use crate::io::ingest::IngestedData;
use crate::report::ResultSet;

/// Outputs of the matching core for one set of tables.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub selection: FitSelection,
    pub thresholds: ThresholdMap,
    pub results: ResultSet,
}

/// All computed outputs of a single `ideal run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub outcome: MatchOutcome,
}

/// Load inputs from disk and run the matching core.
pub fn run_match(config: &RunConfig) -> Result<RunOutput, AppError> {
    let ingest = crate::io::ingest::load_inputs(config)?;
    let outcome = match_tables(&ingest.train, &ingest.ideal, &ingest.test, &select_options(config))?;
    Ok(RunOutput { ingest, outcome })
}

/// Run selection, threshold estimation and assignment over in-memory tables.
pub fn match_tables(
    train: &SeriesTable,
    references: &SeriesTable,
    test: &TestPoints,
    opts: &SelectOptions,
) -> Result<MatchOutcome, MatchError> {
    let selection = select_best(train.as_slice(), references.as_slice(), opts)?;
    info!(
        "selected {} references for {} training series",
        selection.chosen_reference_ids().len(),
        selection.fits.len()
    );

    let thresholds = estimate_thresholds(&selection, train, references)?;

    let candidates = resolve_candidates(&selection, references, &thresholds)?;
    let results = assign_all(test, &candidates);
    info!(
        "assigned {} of {} test points",
        results.assigned_count(),
        results.len()
    );

    Ok(MatchOutcome {
        selection,
        thresholds,
        results,
    })
}

pub fn select_options(config: &RunConfig) -> SelectOptions {
    SelectOptions {
        domain_policy: config.domain_policy,
        require_distinct: config.require_distinct,
    }
}
