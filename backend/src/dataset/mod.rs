//! Ordered columns plus ordered rows.
//!
//! Every row holds exactly one cell per column, positionally aligned with
//! [`Dataset::columns`]. The mutation primitives never touch `self`: each one
//! builds the next dataset value, so a caller swaps it in only once the whole
//! operation succeeded and the previous value stays intact for comparison.

use std::collections::BTreeSet;

use crate::error::{EditError, EditResult};
use crate::formula::Bindings;
use crate::models::{Cell, Row};

/// An in-memory table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Create an empty dataset with the given columns.
    pub fn new(columns: Vec<String>) -> EditResult<Self> {
        Self::from_parts(columns, Vec::new())
    }

    /// Build a dataset, checking column uniqueness and row widths.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Row>) -> EditResult<Self> {
        let mut seen = BTreeSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(EditError::DuplicateColumn(name.clone()));
            }
        }

        if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
            return Err(EditError::ColumnMismatch {
                expected: columns.clone(),
                found: columns.iter().take(bad.len()).cloned().collect(),
            });
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Row `index` with name-based cell access.
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|row| RowRef {
            columns: &self.columns,
            row,
        })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        self.rows.iter().map(move |row| RowRef {
            columns: &self.columns,
            row,
        })
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    // =========================================================================
    // Mutation primitives
    // =========================================================================

    /// Append a column whose cells are given row by row.
    pub fn with_column(&self, name: &str, cells: Vec<Cell>) -> EditResult<Dataset> {
        if self.has_column(name) {
            return Err(EditError::DuplicateColumn(name.to_string()));
        }
        if cells.len() != self.rows.len() {
            return Err(EditError::ColumnMismatch {
                expected: self.columns.clone(),
                found: vec![name.to_string()],
            });
        }

        let mut next = self.clone();
        next.columns.push(name.to_string());
        for (row, cell) in next.rows.iter_mut().zip(cells) {
            row.cells_mut().push(cell);
        }
        Ok(next)
    }

    /// Remove the named columns. Names that are not present are ignored.
    ///
    /// Returns the new dataset and the names actually removed, in column order.
    pub fn without_columns(&self, names: &[String]) -> (Dataset, Vec<String>) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(c))
            .collect();

        let removed: Vec<String> = self
            .columns
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(c, _)| c.clone())
            .collect();

        let columns: Vec<String> = self
            .columns
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(c, _)| c.clone())
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.cells()
                    .iter()
                    .zip(&keep)
                    .filter(|(_, k)| **k)
                    .map(|(cell, _)| cell.clone())
                    .collect::<Row>()
            })
            .collect();

        (Dataset { columns, rows }, removed)
    }

    /// Append a row that was built for `columns`.
    pub fn with_row(&self, columns: &[String], row: Row) -> EditResult<Dataset> {
        if columns != self.columns.as_slice() || row.len() != self.columns.len() {
            return Err(EditError::ColumnMismatch {
                expected: self.columns.clone(),
                found: columns.to_vec(),
            });
        }

        let mut next = self.clone();
        next.rows.push(row);
        Ok(next)
    }

    /// Remove rows by committed index. Out-of-range indices are ignored.
    ///
    /// Returns the new dataset and the indices actually removed, ascending.
    pub fn without_rows(&self, indices: &[usize]) -> (Dataset, Vec<usize>) {
        let doomed: BTreeSet<usize> = indices
            .iter()
            .copied()
            .filter(|i| *i < self.rows.len())
            .collect();

        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !doomed.contains(i))
            .map(|(_, r)| r.clone())
            .collect();

        let next = Dataset {
            columns: self.columns.clone(),
            rows,
        };
        (next, doomed.into_iter().collect())
    }

    /// Replace a single cell.
    pub fn with_cell(&self, row: usize, column: &str, value: Cell) -> EditResult<Dataset> {
        if row >= self.rows.len() {
            return Err(EditError::IndexOutOfRange {
                index: row,
                len: self.rows.len(),
            });
        }
        let col = self
            .column_index(column)
            .ok_or_else(|| EditError::UnknownColumn(column.to_string()))?;

        let mut next = self.clone();
        next.rows[row].cells_mut()[col] = value;
        Ok(next)
    }
}

// =============================================================================
// Row view
// =============================================================================

/// A borrowed row with access by column name.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl<'a> RowRef<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.row.get(i))
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.row.cells()
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }
}

impl Bindings for RowRef<'_> {
    fn lookup(&self, name: &str) -> Option<&Cell> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Dataset {
        Dataset::from_parts(
            cols(&["a", "b"]),
            vec![
                ["1", "x"].into_iter().collect(),
                ["2", "y"].into_iter().collect(),
                ["3", "z"].into_iter().collect(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Dataset::new(cols(&["a", "a"])).unwrap_err();
        assert_eq!(err, EditError::DuplicateColumn("a".into()));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Dataset::from_parts(cols(&["a", "b"]), vec![["1"].into_iter().collect()]);
        assert!(matches!(result, Err(EditError::ColumnMismatch { .. })));
    }

    #[test]
    fn test_with_column_appends_one_cell_per_row() {
        let ds = sample();
        let next = ds
            .with_column("c", vec![Cell::from("p"), Cell::from("q"), Cell::from("r")])
            .unwrap();

        assert_eq!(next.columns(), cols(&["a", "b", "c"]).as_slice());
        assert_eq!(next.row_count(), 3);
        assert_eq!(next.cell(2, "c").unwrap().as_str(), "r");
        assert_eq!(next.cell(0, "a").unwrap().as_str(), "1");
        // The source value is untouched.
        assert_eq!(ds.column_count(), 2);
    }

    #[test]
    fn test_with_column_duplicate() {
        let err = sample().with_column("a", vec![Cell::empty(); 3]).unwrap_err();
        assert_eq!(err, EditError::DuplicateColumn("a".into()));
    }

    #[test]
    fn test_without_columns_ignores_absent_names() {
        let (next, removed) = sample().without_columns(&cols(&["a", "missing"]));
        assert_eq!(removed, cols(&["a"]));
        assert_eq!(next.columns(), cols(&["b"]).as_slice());
        assert!(next.rows().iter().all(|r| r.len() == 1));
        assert_eq!(next.cell(1, "b").unwrap().as_str(), "y");
    }

    #[test]
    fn test_without_rows_keeps_relative_order() {
        let (next, removed) = sample().without_rows(&[0, 9]);
        assert_eq!(removed, vec![0]);
        assert_eq!(next.row_count(), 2);
        assert_eq!(next.cell(0, "a").unwrap().as_str(), "2");
        assert_eq!(next.cell(1, "a").unwrap().as_str(), "3");
    }

    #[test]
    fn test_with_row_checks_columns() {
        let ds = sample();
        let ok = ds
            .with_row(&cols(&["a", "b"]), ["4", "w"].into_iter().collect())
            .unwrap();
        assert_eq!(ok.row_count(), 4);

        let err = ds
            .with_row(&cols(&["b", "a"]), ["w", "4"].into_iter().collect())
            .unwrap_err();
        assert!(matches!(err, EditError::ColumnMismatch { .. }));
    }

    #[test]
    fn test_with_cell_errors() {
        let ds = sample();
        assert_eq!(
            ds.with_cell(3, "a", Cell::empty()).unwrap_err(),
            EditError::IndexOutOfRange { index: 3, len: 3 }
        );
        assert_eq!(
            ds.with_cell(0, "nope", Cell::empty()).unwrap_err(),
            EditError::UnknownColumn("nope".into())
        );

        let next = ds.with_cell(1, "b", Cell::from("Y")).unwrap();
        assert_eq!(next.cell(1, "b").unwrap().as_str(), "Y");
    }

    #[test]
    fn test_row_ref_lookup() {
        let ds = sample();
        let row = ds.row(1).unwrap();
        assert_eq!(row.get("b").unwrap().as_str(), "y");
        assert!(row.get("c").is_none());
    }
}
