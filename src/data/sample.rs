//! Synthetic dataset generation.
//!
//! Builds an `ideal` table of analytic functions on a regular grid, picks a
//! few of them as the hidden truth, and derives noisy `train` columns and
//! scattered `test` rows from those. Useful for demos and for exercising the
//! full pipeline without real data.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::{SeriesTable, TestPoints};
use crate::domain::Sample;
use crate::error::MatchError;

/// Number of analytic function shapes cycled through by the ideal table.
const FAMILIES: usize = 8;

/// Grid values are rounded to this many decimals so the x columns survive a
/// CSV round trip bit-for-bit.
const GRID_DECIMALS: i32 = 9;

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub seed: u64,
    pub ideal_count: usize,
    pub train_count: usize,
    pub test_count: usize,
    /// Standard deviation of the Gaussian noise on train and test values.
    pub noise: f64,
    /// Share of test rows pushed well away from every curve.
    pub outlier_fraction: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub step: f64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ideal_count: 50,
            train_count: 4,
            test_count: 100,
            noise: 0.3,
            outlier_fraction: 0.1,
            x_min: -20.0,
            x_max: 20.0,
            step: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub train: SeriesTable,
    pub ideal: SeriesTable,
    pub test: TestPoints,
    /// Ideal series ids the training columns were derived from, in training order.
    pub chosen: Vec<String>,
}

pub fn generate_dataset(config: &GenerateConfig) -> Result<SyntheticData, MatchError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise)
        .map_err(|e| MatchError::configuration(format!("noise distribution error: {e}")))?;

    let xs = grid(config.x_min, config.x_max, config.step);

    let ideal_columns: Vec<(String, Vec<f64>)> = (0..config.ideal_count)
        .map(|k| (format!("y{}", k + 1), xs.iter().map(|&x| ideal_value(k, x)).collect()))
        .collect();
    let ideal = SeriesTable::from_columns("ideal", &xs, ideal_columns)?;

    let picks = rand::seq::index::sample(&mut rng, config.ideal_count, config.train_count).into_vec();

    let train_columns: Vec<(String, Vec<f64>)> = picks
        .iter()
        .enumerate()
        .map(|(i, &k)| {
            let ys = xs
                .iter()
                .map(|&x| ideal_value(k, x) + normal.sample(&mut rng))
                .collect();
            (format!("y{}", i + 1), ys)
        })
        .collect();
    let train = SeriesTable::from_columns("train", &xs, train_columns)?;

    let mut samples = Vec::with_capacity(config.test_count);
    for _ in 0..config.test_count {
        let x = xs[rng.gen_range(0..xs.len())];
        let k = picks[rng.gen_range(0..picks.len())];
        let base = ideal_value(k, x);

        let y = if rng.gen_bool(config.outlier_fraction) {
            let offset = rng.gen_range(5.0..15.0);
            if rng.gen_bool(0.5) { base + offset } else { base - offset }
        } else {
            base + normal.sample(&mut rng)
        };
        samples.push(Sample::new(x, y));
    }

    let chosen = picks.iter().map(|k| format!("ideal.y{}", k + 1)).collect();

    Ok(SyntheticData {
        train,
        ideal,
        test: TestPoints::new(samples),
        chosen,
    })
}

fn validate(config: &GenerateConfig) -> Result<(), MatchError> {
    if config.train_count == 0 {
        return Err(MatchError::configuration("train count must be > 0"));
    }
    if config.ideal_count < config.train_count {
        return Err(MatchError::configuration(format!(
            "ideal count ({}) must be at least the train count ({})",
            config.ideal_count, config.train_count
        )));
    }
    if !(config.x_min.is_finite() && config.x_max.is_finite() && config.x_max > config.x_min) {
        return Err(MatchError::configuration("invalid x range"));
    }
    if !(config.step.is_finite() && config.step > 0.0) {
        return Err(MatchError::configuration("grid step must be > 0"));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(MatchError::configuration("noise must be >= 0"));
    }
    if !(0.0..=1.0).contains(&config.outlier_fraction) {
        return Err(MatchError::configuration("outlier fraction must be within [0, 1]"));
    }
    Ok(())
}

/// Regular grid from `min` to `max` inclusive.
fn grid(min: f64, max: f64, step: f64) -> Vec<f64> {
    let n = ((max - min) / step).round() as usize + 1;
    let scale = 10f64.powi(GRID_DECIMALS);
    (0..n)
        .map(|i| ((min + i as f64 * step) * scale).round() / scale)
        .collect()
}

/// Value of the `k`-th ideal function at `x`.
///
/// Shapes repeat every `FAMILIES` columns with a growing amplitude, so no two
/// columns coincide.
fn ideal_value(k: usize, x: f64) -> f64 {
    let amplitude = 1.0 + (k / FAMILIES) as f64 * 0.5;
    let shape = match k % FAMILIES {
        0 => x,
        1 => 0.05 * x * x,
        2 => x.sin(),
        3 => x.cos(),
        4 => (x / 4.0).tanh(),
        5 => x.abs().sqrt(),
        6 => 0.002 * x * x * x,
        _ => 5.0 * (-x * x / 50.0).exp(),
    };
    amplitude * shape
}
