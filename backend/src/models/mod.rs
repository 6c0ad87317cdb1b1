//! Domain models for the edit engine.
//!
//! - [`Cell`] - One text value, numeric when it parses as a finite number
//! - [`Row`] - Cells stored positionally, aligned with the dataset's columns
//! - [`PendingRow`] - A staged row waiting to be committed or discarded

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EditError, EditResult};

// =============================================================================
// Cell
// =============================================================================

/// A single value at a (row, column) position.
///
/// Cells are always stored as text. There is no per-column typing: a column
/// may freely mix numeric and textual cells, as free-form CSV does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cell(String);

impl Cell {
    pub fn new(value: impl Into<String>) -> Self {
        Cell(value.into())
    }

    pub fn empty() -> Self {
        Cell(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric interpretation of the cell.
    ///
    /// Surrounding whitespace is ignored. Only finite values count, so the
    /// spellings `inf` and `NaN` stay textual.
    pub fn as_number(&self) -> Option<f64> {
        parse_number(&self.0)
    }

    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }
}

/// Parse text as a finite number, the way cells and literals are coerced.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell(value)
    }
}

// =============================================================================
// Row
// =============================================================================

/// A committed row. Cell `i` belongs to the dataset's column `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn cells_mut(&mut self) -> &mut Vec<Cell> {
        &mut self.cells
    }
}

impl<T: Into<Cell>> FromIterator<T> for Row {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Row::new(iter.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Pending Row
// =============================================================================

/// A row being composed outside the dataset.
///
/// It remembers the columns it was staged for, so committing it after the
/// dataset's columns changed is detected as a mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRow {
    columns: Vec<String>,
    cells: Vec<Cell>,
}

impl PendingRow {
    /// Stage an all-empty row for the given columns.
    pub fn new(columns: &[String]) -> Self {
        Self {
            columns: columns.to_vec(),
            cells: vec![Cell::empty(); columns.len()],
        }
    }

    /// Stage a row from explicit (column, value) pairs, in order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Cell>,
    {
        let (columns, cells) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, cells }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.cells.get(i))
    }

    /// Fill one staged cell.
    pub fn set(&mut self, column: &str, value: impl Into<Cell>) -> EditResult<()> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| EditError::UnknownColumn(column.to_string()))?;
        self.cells[idx] = value.into();
        Ok(())
    }

    pub fn into_row(self) -> Row {
        Row::new(self.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cells() {
        assert_eq!(Cell::from("10").as_number(), Some(10.0));
        assert_eq!(Cell::from(" 2.5 ").as_number(), Some(2.5));
        assert_eq!(Cell::from("-3e2").as_number(), Some(-300.0));
        assert_eq!(Cell::from("abc").as_number(), None);
        assert_eq!(Cell::from("").as_number(), None);
    }

    #[test]
    fn test_special_float_spellings_are_text() {
        assert!(!Cell::from("inf").is_numeric());
        assert!(!Cell::from("NaN").is_numeric());
        assert!(!Cell::from("-infinity").is_numeric());
    }

    #[test]
    fn test_pending_row_starts_empty() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let pending = PendingRow::new(&columns);
        assert_eq!(pending.columns(), columns.as_slice());
        assert!(pending.cells().iter().all(Cell::is_empty));
    }

    #[test]
    fn test_pending_row_set() {
        let columns = vec!["a".to_string(), "b".to_string()];
        let mut pending = PendingRow::new(&columns);
        pending.set("b", "42").unwrap();
        assert_eq!(pending.get("b").unwrap().as_str(), "42");
        assert_eq!(pending.get("a").unwrap().as_str(), "");

        let err = pending.set("c", "x").unwrap_err();
        assert_eq!(err, EditError::UnknownColumn("c".into()));
    }

    #[test]
    fn test_row_from_iter() {
        let row: Row = ["1", "2"].into_iter().collect();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(1).unwrap().as_str(), "2");
    }
}
