//! Residual scores between a training series and a reference series.
//!
//! Both scores walk the training domain and look up the reference at the same
//! x. A reference that misses any training x cannot be scored: the gap is
//! reported as `MatchError::DomainPair`, never skipped or counted as zero.

use crate::domain::Series;
use crate::error::MatchError;

/// Sum of squared deviations over the training domain.
pub fn ssd_score(train: &Series, reference: &Series) -> Result<f64, MatchError> {
    residuals(train, reference).try_fold(0.0, |acc, r| {
        let r = r?;
        Ok(acc + r * r)
    })
}

/// Largest absolute deviation over the training domain (`0.0` for an empty series).
pub fn max_abs_residual(train: &Series, reference: &Series) -> Result<f64, MatchError> {
    residuals(train, reference).try_fold(0.0_f64, |acc, r| Ok(acc.max(r?.abs())))
}

fn residuals<'a>(
    train: &'a Series,
    reference: &'a Series,
) -> impl Iterator<Item = Result<f64, MatchError>> + 'a {
    train.samples().iter().map(move |s| {
        reference
            .value_at(s.x)
            .map(|y_ref| s.y - y_ref)
            .ok_or_else(|| MatchError::DomainPair {
                train: train.id().to_string(),
                reference: reference.id().to_string(),
                x: s.x,
            })
    })
}
