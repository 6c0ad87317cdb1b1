//! Edit engine: sessions, commands and the audit trail.
//!
//! This module provides:
//! - `session`: The [`Session`] owning a dataset and applying mutations
//! - `command`: Serializable [`Command`]s driving a session
//! - `condition`: Conditional column definitions
//! - `audit`: The append-only [`AuditLog`]

pub mod audit;
pub mod command;
pub mod condition;
pub mod session;

pub use audit::{AuditEntry, AuditLog, TIMESTAMP_FORMAT};
pub use command::{commands_description, Command};
pub use condition::{CompareOp, ConditionalColumn};
pub use session::{Session, SessionOptions, PREVIEW_ROWS_ENV};
