//! Filtered, capped, column-limited previews of a dataset.
//!
//! A [`Preview`] is recomputed from the live dataset on every call and is
//! never written back.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::dataset::{Dataset, RowRef};
use crate::models::Cell;

/// Filter value that imposes no constraint.
pub const ALL: &str = "All";

// =============================================================================
// Filter
// =============================================================================

/// Accepted value per column. A row passes when every constrained column
/// holds exactly the accepted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec(BTreeMap<String, String>);

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`FilterSpec::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn clear(&mut self, column: &str) {
        self.0.remove(column);
    }

    /// Constraints that actually restrict rows: empty values and [`ALL`]
    /// are skipped.
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_empty() && v.as_str() != ALL)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_unconstrained(&self) -> bool {
        self.constraints().next().is_none()
    }

    /// Whether a row passes. A constraint on a column the row does not have
    /// never matches.
    pub fn matches(&self, row: &RowRef<'_>) -> bool {
        self.constraints()
            .all(|(col, val)| row.get(col).is_some_and(|cell| cell.as_str() == val))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FilterSpec(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Preview
// =============================================================================

/// A visible row, tagged with its index in the committed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub index: usize,
    pub cells: Vec<Cell>,
}

/// Result of [`project`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    /// Visible columns, in dataset order
    pub columns: Vec<String>,
    /// At most `cap` matching rows
    pub rows: Vec<PreviewRow>,
    /// Number of rows passing the filter
    pub matching: usize,
    /// Number of rows in the dataset
    pub total: usize,
}

impl Preview {
    pub fn is_truncated(&self) -> bool {
        self.rows.len() < self.matching
    }

    /// "Showing first 50 rows out of 120."
    pub fn summary(&self) -> String {
        if self.is_truncated() {
            format!(
                "Showing first {} rows out of {}.",
                self.rows.len(),
                self.matching
            )
        } else {
            format!("Showing {} of {} rows.", self.matching, self.total)
        }
    }

    /// The preview as CSV text.
    pub fn to_csv(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(self.columns.join(","));
        for row in &self.rows {
            let fields: Vec<&str> = row.cells.iter().map(Cell::as_str).collect();
            lines.push(fields.join(","));
        }
        lines.join("\n")
    }
}

/// Filter, project and truncate a dataset.
///
/// `visible` selects columns; they are returned in dataset order and unknown
/// names are ignored. `None` shows every column.
pub fn project(
    dataset: &Dataset,
    filter: &FilterSpec,
    visible: Option<&[String]>,
    cap: usize,
) -> Preview {
    let picked: Vec<usize> = dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| visible.map_or(true, |v| v.contains(c)))
        .map(|(i, _)| i)
        .collect();

    let mut rows = Vec::new();
    let mut matching = 0;

    for (index, row) in dataset.iter_rows().enumerate() {
        if !filter.matches(&row) {
            continue;
        }
        matching += 1;
        if rows.len() < cap {
            let cells = picked.iter().map(|&i| row.cells()[i].clone()).collect();
            rows.push(PreviewRow { index, cells });
        }
    }

    Preview {
        columns: picked.iter().map(|&i| dataset.columns()[i].clone()).collect(),
        rows,
        matching,
        total: dataset.row_count(),
    }
}

/// Distinct values of a column, in first-seen order.
///
/// Returns an empty list for an unknown column.
pub fn filter_options(dataset: &Dataset, column: &str) -> Vec<String> {
    let Some(idx) = dataset.column_index(column) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    dataset
        .rows()
        .iter()
        .filter_map(|r| r.get(idx))
        .filter(|cell| seen.insert(cell.as_str()))
        .map(|cell| cell.as_str().to_string())
        .collect()
}
