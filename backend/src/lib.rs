//! # csvedit - In-memory tabular editing with an audit trail
//!
//! csvedit loads a comma-separated file into memory, applies column and row
//! edits (including formula and conditional columns), previews the result
//! through filters, and exports both the edited table and a timestamped log
//! of every change.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│   Session   │────▶│  CSV + Log  │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (edits+log) │     │  (export)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │   Preview   │
//!                                         │  (filters)  │
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use csvedit::{FilterSpec, Session};
//!
//! let mut session = Session::from_text("people.csv", "age,score\n10,5\n30,2").unwrap();
//! session.add_formula_column("total", Some("age + score")).unwrap();
//!
//! let preview = session.preview(&FilterSpec::new(), None);
//! assert_eq!(preview.rows[0].cells[2].as_str(), "15");
//! assert_eq!(session.audit_log().len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, rows and pending rows
//! - [`dataset`] - The in-memory table and its mutation primitives
//! - [`parser`] - CSV parsing and serialization with encoding detection
//! - [`formula`] - Formula language for computed columns
//! - [`edit`] - Sessions, commands and the audit log
//! - [`view`] - Filtered previews
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod dataset;

// Parsing
pub mod parser;

// Formulas
pub mod formula;

// Editing
pub mod edit;

// Previews
pub mod view;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, CsvResult, EditError, EditResult, EvalError, EvalResult, ServerError, ServerResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use dataset::{Dataset, RowRef};
pub use models::{Cell, PendingRow, Row};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_encoding, parse, parse_bytes, parse_file, serialize, serialize_all,
    ParseResult,
};

// =============================================================================
// Re-exports - Formulas
// =============================================================================

pub use formula::{Bindings, Formula, Value, ERROR_SENTINEL};

// =============================================================================
// Re-exports - Editing
// =============================================================================

pub use edit::{
    commands_description, AuditEntry, AuditLog, Command, CompareOp, ConditionalColumn, Session,
    SessionOptions,
};

// =============================================================================
// Re-exports - Views
// =============================================================================

pub use view::{filter_options, project, FilterSpec, Preview, PreviewRow};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, CommandResponse, PreviewRequest, SessionView};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
