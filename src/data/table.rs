//! Read-only tables of series.
//!
//! A `SeriesTable` wraps one x column and one or more y columns as a set of
//! named series (`"<table>.<column>"`, e.g. `train.y1`). Test data is not a
//! keyed series (the same x may appear on several rows), so it lives in
//! `TestPoints` instead.

use std::collections::HashMap;

use crate::domain::types::canonical_x;
use crate::domain::{Sample, Series};
use crate::error::MatchError;

#[derive(Debug, Clone)]
pub struct SeriesTable {
    name: String,
    series: Vec<Series>,
    index: HashMap<String, usize>,
}

impl SeriesTable {
    /// Build a table from a shared x column and named y columns.
    pub fn from_columns(
        name: &str,
        x: &[f64],
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, MatchError> {
        if x.is_empty() {
            return Err(MatchError::configuration(format!("table `{name}` has no rows")));
        }
        if columns.is_empty() {
            return Err(MatchError::configuration(format!("table `{name}` has no y columns")));
        }

        let mut series = Vec::with_capacity(columns.len());
        for (column, values) in columns {
            if values.len() != x.len() {
                return Err(MatchError::configuration(format!(
                    "table `{name}`: column `{column}` has {} values, x has {}",
                    values.len(),
                    x.len()
                )));
            }
            let samples = x.iter().zip(&values).map(|(&x, &y)| Sample::new(x, y)).collect();
            series.push(Series::new(format!("{name}.{column}"), samples)?);
        }

        Self::from_series(name, series)
    }

    /// Build a table from already-constructed series (ids are kept as given).
    pub fn from_series(name: &str, series: Vec<Series>) -> Result<Self, MatchError> {
        let mut index = HashMap::with_capacity(series.len());
        for (idx, s) in series.iter().enumerate() {
            if index.insert(s.id().to_string(), idx).is_some() {
                return Err(MatchError::configuration(format!(
                    "table `{name}` has duplicate series `{}`",
                    s.id()
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            series,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Series by id.
    pub fn series(&self, id: &str) -> Result<&Series, MatchError> {
        self.index
            .get(id)
            .map(|&idx| &self.series[idx])
            .ok_or_else(|| MatchError::NotFound { name: id.to_string() })
    }

    /// Value of series `id` at `x`.
    pub fn lookup(&self, id: &str, x: f64) -> Result<f64, MatchError> {
        self.series(id)?.lookup(x)
    }

    /// All series in column order.
    pub fn as_slice(&self) -> &[Series] {
        &self.series
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(Series::id)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Column name of a series id (the part after `"<table>."`).
    pub fn column_name<'a>(&self, id: &'a str) -> &'a str {
        id.strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(id)
    }
}

/// Test observations, one independent sample per row, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestPoints {
    samples: Vec<Sample>,
}

impl TestPoints {
    pub fn new(samples: Vec<Sample>) -> Self {
        let samples = samples
            .into_iter()
            .map(|s| Sample::new(canonical_x(s.x), s.y))
            .collect();
        Self { samples }
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
}
