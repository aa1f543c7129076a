//! Ordered assignment results.

use serde::{Deserialize, Serialize};

use crate::domain::AssignmentRecord;
use crate::domain::types::canonical_x;

/// One row as handed to storage / visualization: the mapping table layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub x: f64,
    pub y: f64,
    pub ideal_function: Option<String>,
    pub deviation: Option<f64>,
}

/// Assignment records, stably sorted by test x ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: Vec<AssignmentRecord>,
}

impl ResultSet {
    pub fn from_records(mut records: Vec<AssignmentRecord>) -> Self {
        records.sort_by(|a, b| canonical_x(a.x).total_cmp(&canonical_x(b.x)));
        Self { records }
    }

    pub fn records(&self) -> &[AssignmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn assigned(&self) -> impl Iterator<Item = &AssignmentRecord> {
        self.records.iter().filter(|r| r.is_assigned())
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned().count()
    }

    pub fn unassigned_count(&self) -> usize {
        self.len() - self.assigned_count()
    }

    /// Records assigned to `reference_id`, in x order.
    pub fn assigned_to<'a>(&'a self, reference_id: &'a str) -> impl Iterator<Item = &'a AssignmentRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.reference_id.as_deref() == Some(reference_id))
    }

    /// Export view: one row per record, or only assigned rows when `accepted_only`.
    pub fn export_rows(&self, accepted_only: bool) -> Vec<ResultRow> {
        self.records
            .iter()
            .filter(|r| !accepted_only || r.is_assigned())
            .map(|r| ResultRow {
                x: r.x,
                y: r.y,
                ideal_function: r.reference_id.clone(),
                deviation: r.is_assigned().then_some(r.deviation),
            })
            .collect()
    }
}
