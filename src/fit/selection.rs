//! Best-reference selection by minimum SSD.
//!
//! For every training series we score every reference (in parallel) and keep
//! the one with the smallest SSD. Selection rules:
//!
//! 1. A reference that does not cover the training domain cannot be scored.
//!    Depending on `DomainPolicy` this aborts the run or excludes the pair.
//! 2. Minimum SSD wins; exact ties go to the naturally smallest reference id,
//!    so the result does not depend on the order of the reference library.
//! 3. Optionally (on by default) no two training series may pick the same
//!    reference.

use std::cmp::Ordering;

use log::{debug, warn};
use rayon::prelude::*;

use crate::domain::{DomainPolicy, FitResult, ScoreEntry, Series, TrainingScores, compare_ids};
use crate::error::MatchError;
use crate::fit::scorer::ssd_score;

/// Selection knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    pub domain_policy: DomainPolicy,
    pub require_distinct: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            domain_policy: DomainPolicy::Abort,
            require_distinct: true,
        }
    }
}

/// A (training, reference) pair that was dropped under `DomainPolicy::Exclude`.
#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub training_id: String,
    pub reference_id: String,
    pub reason: String,
}

/// Output of scoring + selection.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSelection {
    /// One result per training series, in training order.
    pub fits: Vec<FitResult>,
    /// Every computed score, per training series (for reports and charts).
    pub scores: Vec<TrainingScores>,
    /// Pairs that could not be scored (only under `DomainPolicy::Exclude`).
    pub excluded: Vec<Exclusion>,
}

impl FitSelection {
    pub fn fit_for(&self, training_id: &str) -> Option<&FitResult> {
        self.fits.iter().find(|f| f.training_id == training_id)
    }

    /// Chosen reference ids in training order, without repeats.
    pub fn chosen_reference_ids(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.fits.len());
        for f in &self.fits {
            if !out.contains(&f.reference_id.as_str()) {
                out.push(&f.reference_id);
            }
        }
        out
    }
}

/// Pick the minimum-SSD reference for each training series.
pub fn select_best(
    train: &[Series],
    references: &[Series],
    opts: &SelectOptions,
) -> Result<FitSelection, MatchError> {
    if references.is_empty() {
        return Err(MatchError::configuration("no reference series to select from"));
    }
    if train.is_empty() {
        return Err(MatchError::configuration("no training series to fit"));
    }

    let mut fits = Vec::with_capacity(train.len());
    let mut scores = Vec::with_capacity(train.len());
    let mut excluded = Vec::new();

    for t in train {
        // Each (train, reference) pair is independent.
        let outcomes: Vec<Result<f64, MatchError>> =
            references.par_iter().map(|r| ssd_score(t, r)).collect();

        let mut entries = Vec::with_capacity(references.len());
        for (r, outcome) in references.iter().zip(outcomes) {
            match outcome {
                Ok(ssd) => entries.push(ScoreEntry {
                    reference_id: r.id().to_string(),
                    ssd,
                }),
                Err(err) => match opts.domain_policy {
                    DomainPolicy::Abort => return Err(err),
                    DomainPolicy::Exclude => {
                        warn!("excluding {} vs {}: {err}", t.id(), r.id());
                        excluded.push(Exclusion {
                            training_id: t.id().to_string(),
                            reference_id: r.id().to_string(),
                            reason: err.to_string(),
                        });
                    }
                },
            }
        }

        let best = entries
            .iter()
            .min_by(|a, b| rank_scores(a, b))
            .ok_or_else(|| {
                MatchError::configuration(format!(
                    "no reference covers the domain of `{}`",
                    t.id()
                ))
            })?;

        debug!("{} -> {} (ssd={:.6})", t.id(), best.reference_id, best.ssd);
        fits.push(FitResult {
            training_id: t.id().to_string(),
            reference_id: best.reference_id.clone(),
            ssd: best.ssd,
        });

        scores.push(TrainingScores {
            training_id: t.id().to_string(),
            scores: entries,
        });
    }

    if opts.require_distinct {
        ensure_distinct(&fits)?;
    }

    Ok(FitSelection {
        fits,
        scores,
        excluded,
    })
}

/// Total order on scores: smaller SSD first, then natural reference id.
pub fn rank_scores(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    a.ssd
        .total_cmp(&b.ssd)
        .then_with(|| compare_ids(&a.reference_id, &b.reference_id))
}

fn ensure_distinct(fits: &[FitResult]) -> Result<(), MatchError> {
    for (i, a) in fits.iter().enumerate() {
        if let Some(b) = fits[i + 1..].iter().find(|b| b.reference_id == a.reference_id) {
            return Err(MatchError::configuration(format!(
                "`{}` and `{}` both selected `{}`; chosen references must be distinct",
                a.training_id, b.training_id, a.reference_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(id: &str, pairs: &[(f64, f64)]) -> Series {
        Series::from_pairs(id, pairs).unwrap()
    }

    fn worked_example() -> (Vec<Series>, Vec<Series>) {
        let train = vec![series("train.y1", &[(0.0, 0.0), (1.0, 1.0), (2.0, 4.0)])];
        let refs = vec![
            series("ideal.a", &[(0.0, 0.0), (1.0, 1.0), (2.0, 4.0)]),
            series("ideal.b", &[(0.0, 0.0), (1.0, 2.0), (2.0, 5.0)]),
        ];
        (train, refs)
    }

    #[test]
    fn selects_minimum_ssd() {
        let (train, refs) = worked_example();
        let sel = select_best(&train, &refs, &SelectOptions::default()).unwrap();

        assert_eq!(
            sel.fits,
            vec![FitResult {
                training_id: "train.y1".to_string(),
                reference_id: "ideal.a".to_string(),
                ssd: 0.0,
            }]
        );
        assert_eq!(sel.scores[0].scores.len(), 2);
        assert_eq!(sel.scores[0].scores[1].ssd, 2.0);
        assert!(sel.excluded.is_empty());
    }

    #[test]
    fn empty_reference_library_is_configuration_error() {
        let (train, _) = worked_example();
        let err = select_best(&train, &[], &SelectOptions::default()).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn exact_tie_resolves_to_natural_smallest_id() {
        let train = vec![series("train.y1", &[(0.0, 1.0), (1.0, 1.0)])];
        let flat = [(0.0, 0.0), (1.0, 0.0)];
        let refs = vec![
            series("ideal.y10", &flat),
            series("ideal.y2", &flat),
            series("ideal.y30", &flat),
        ];
        let sel = select_best(&train, &refs, &SelectOptions::default()).unwrap();
        assert_eq!(sel.fits[0].reference_id, "ideal.y2");
    }

    #[test]
    fn uncovered_pair_aborts_by_default() {
        let train = vec![series("train.y1", &[(0.0, 0.0), (1.0, 1.0)])];
        let refs = vec![
            series("ideal.y1", &[(0.0, 0.0), (1.0, 1.0)]),
            series("ideal.y2", &[(0.0, 0.0)]),
        ];
        let err = select_best(&train, &refs, &SelectOptions::default()).unwrap_err();
        assert_eq!(
            err,
            MatchError::DomainPair {
                train: "train.y1".to_string(),
                reference: "ideal.y2".to_string(),
                x: 1.0,
            }
        );
    }

    #[test]
    fn uncovered_pair_is_excluded_under_exclude_policy() {
        let train = vec![series("train.y1", &[(0.0, 0.0), (1.0, 1.0)])];
        let refs = vec![
            series("ideal.y1", &[(0.0, 0.0)]),
            series("ideal.y2", &[(0.0, 5.0), (1.0, 5.0)]),
        ];
        let opts = SelectOptions {
            domain_policy: DomainPolicy::Exclude,
            ..SelectOptions::default()
        };
        let sel = select_best(&train, &refs, &opts).unwrap();
        assert_eq!(sel.fits[0].reference_id, "ideal.y2");
        assert_eq!(sel.excluded.len(), 1);
        assert_eq!(sel.excluded[0].reference_id, "ideal.y1");
        assert_eq!(sel.scores[0].scores.len(), 1);
    }

    #[test]
    fn all_pairs_excluded_is_configuration_error() {
        let train = vec![series("train.y1", &[(0.0, 0.0), (1.0, 1.0)])];
        let refs = vec![series("ideal.y1", &[(0.0, 0.0)])];
        let opts = SelectOptions {
            domain_policy: DomainPolicy::Exclude,
            ..SelectOptions::default()
        };
        let err = select_best(&train, &refs, &opts).unwrap_err();
        assert!(matches!(err, MatchError::Configuration(_)));
    }

    #[test]
    fn shared_reference_violates_distinctness_unless_allowed() {
        let pts = [(0.0, 0.0), (1.0, 1.0)];
        let train = vec![series("train.y1", &pts), series("train.y2", &pts)];
        let refs = vec![series("ideal.y1", &pts), series("ideal.y2", &[(0.0, 9.0), (1.0, 9.0)])];

        let err = select_best(&train, &refs, &SelectOptions::default()).unwrap_err();
        let MatchError::Configuration(msg) = err else {
            panic!("expected configuration error");
        };
        assert!(msg.contains("train.y1") && msg.contains("train.y2") && msg.contains("ideal.y1"));

        let opts = SelectOptions {
            require_distinct: false,
            ..SelectOptions::default()
        };
        let sel = select_best(&train, &refs, &opts).unwrap();
        assert_eq!(sel.chosen_reference_ids(), vec!["ideal.y1"]);
        assert_eq!(sel.fit_for("train.y2").unwrap().reference_id, "ideal.y1");
    }
}
