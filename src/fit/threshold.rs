//! Acceptance thresholds from training residuals.
//!
//! `threshold = max |train.y(x) - reference.y(x)| * √2`, computed once per
//! chosen reference from training data only and reused for every test point.

use std::collections::BTreeMap;

use log::debug;

use crate::data::SeriesTable;
use crate::domain::{Series, Threshold};
use crate::error::MatchError;
use crate::fit::scorer::max_abs_residual;
use crate::fit::selection::FitSelection;

/// Thresholds keyed by reference id.
pub type ThresholdMap = BTreeMap<String, Threshold>;

/// Threshold of `reference` derived from one training series.
pub fn estimate_threshold(train: &Series, reference: &Series) -> Result<Threshold, MatchError> {
    let max_residual = max_abs_residual(train, reference)?;
    Ok(Threshold::from_residual(reference.id(), max_residual))
}

/// Thresholds for every chosen reference.
///
/// When several training series share a reference (only possible with
/// distinctness disabled), the widest bound wins.
pub fn estimate_thresholds(
    selection: &FitSelection,
    train: &SeriesTable,
    references: &SeriesTable,
) -> Result<ThresholdMap, MatchError> {
    let mut out = ThresholdMap::new();
    for fit in &selection.fits {
        let t = train.series(&fit.training_id)?;
        let r = references.series(&fit.reference_id)?;
        let threshold = estimate_threshold(t, r)?;
        debug!(
            "{}: max residual {:.6} from {} -> threshold {:.6}",
            fit.reference_id, threshold.max_training_residual, fit.training_id, threshold.threshold
        );

        match out.get(&fit.reference_id) {
            Some(existing) if existing.threshold >= threshold.threshold => {}
            _ => {
                out.insert(fit.reference_id.clone(), threshold);
            }
        }
    }
    Ok(out)
}
