//! Error types for the csvedit engine.
//!
//! One enum per layer:
//!
//! - [`CsvError`] - CSV decoding and parsing errors
//! - [`EvalError`] - Formula parse and evaluation errors
//! - [`EditError`] - Structural errors from dataset mutations
//! - [`ServerError`] - HTTP surface errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while turning raw bytes or text into a dataset.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read the source file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes could not be decoded with the detected encoding.
    #[error("Failed to decode content as {encoding}: {message}")]
    Encoding { encoding: String, message: String },

    /// The text does not describe a table.
    #[error("Malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },
}

impl CsvError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        CsvError::MalformedInput {
            line,
            message: message.into(),
        }
    }
}

// =============================================================================
// Formula Errors
// =============================================================================

/// Errors raised while parsing or evaluating a formula.
///
/// Inside a formula column these never escape the operation: the offending
/// row receives the error sentinel instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The expression text does not follow the grammar.
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// An identifier does not name a column of the row.
    #[error("Unknown column in formula: {0}")]
    UnknownColumn(String),

    /// Division by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// Operator applied to operands it does not accept.
    #[error("Type mismatch: cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    /// Arithmetic overflowed to infinity or produced NaN.
    #[error("Result is not a finite number")]
    NonFinite,
}

// =============================================================================
// Edit Errors
// =============================================================================

/// Structural errors that abort a whole edit operation.
///
/// A failed operation commits nothing and appends nothing to the audit log.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// A column with this name already exists.
    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    /// The referenced column does not exist.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Column name is blank or would break the CSV layout.
    #[error("Invalid column name: {0:?}")]
    InvalidColumnName(String),

    /// A staged row was built for a different set of columns.
    #[error("Row columns {found:?} do not match dataset columns {expected:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Row index past the end of the dataset.
    #[error("Row index {index} out of range ({len} rows)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A pending-row operation was issued with nothing staged.
    #[error("No pending row to edit or save")]
    NoPendingRow,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Edit operation rejected.
    #[error("Edit error: {0}")]
    Edit(#[from] EditError),

    /// Uploaded content could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// No session with this identifier.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for formula evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Result type for edit operations.
pub type EditResult<T> = Result<T, EditError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let edit_err = EditError::UnknownColumn("age".into());
        let server_err: ServerError = edit_err.into();
        assert!(server_err.to_string().contains("age"));

        let csv_err = CsvError::malformed(1, "empty input");
        let server_err: ServerError = csv_err.into();
        assert!(server_err.to_string().contains("empty input"));
    }

    #[test]
    fn test_type_mismatch_format() {
        let err = EvalError::TypeMismatch {
            op: ">".into(),
            left: "text \"abc\"".into(),
            right: "number 18".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'>'"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_index_out_of_range_format() {
        let err = EditError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(err.to_string(), "Row index 7 out of range (3 rows)");
    }
}
