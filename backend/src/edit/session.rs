//! The edit engine.
//!
//! A [`Session`] exclusively owns one dataset, its audit log and an optional
//! pending row. Every mutation validates first, builds the next dataset
//! value, then swaps it in and records exactly one audit entry. A rejected
//! mutation changes nothing and records nothing.

use crate::api::logs::{LogEntry, LOG_BROADCASTER};
use crate::dataset::Dataset;
use crate::error::{CsvResult, EditError, EditResult};
use crate::formula::{Formula, ERROR_SENTINEL};
use crate::models::{Cell, PendingRow};
use crate::parser::{parse, parse_bytes, serialize};
use crate::view::{filter_options, project, FilterSpec, Preview};

use super::audit::{single_line, AuditEntry, AuditLog};
use super::command::Command;
use super::condition::ConditionalColumn;

/// Environment variable overriding [`SessionOptions::preview_rows`].
pub const PREVIEW_ROWS_ENV: &str = "CSVEDIT_PREVIEW_ROWS";

/// Session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Maximum number of rows in a preview
    pub preview_rows: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { preview_rows: 50 }
    }
}

impl SessionOptions {
    /// Defaults, overridden by `CSVEDIT_PREVIEW_ROWS` when it holds a number.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(n) = std::env::var(PREVIEW_ROWS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            options.preview_rows = n;
        }
        options
    }
}

/// One load/edit/export session over a single dataset.
#[derive(Debug, Clone)]
pub struct Session {
    source_name: String,
    dataset: Dataset,
    audit: AuditLog,
    pending: Option<PendingRow>,
    options: SessionOptions,
    tag: Option<String>,
}

impl Session {
    pub fn new(source_name: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            source_name: source_name.into(),
            dataset,
            audit: AuditLog::new(),
            pending: None,
            options: SessionOptions::default(),
            tag: None,
        }
    }

    /// Parse CSV text and open a session on it.
    pub fn from_text(source_name: impl Into<String>, text: &str) -> CsvResult<Self> {
        let session = Self::new(source_name, parse(text)?);
        session.announce_load(None);
        Ok(session)
    }

    /// Decode and parse raw CSV bytes and open a session on them.
    pub fn open(source_name: impl Into<String>, bytes: &[u8]) -> CsvResult<Self> {
        let result = parse_bytes(bytes)?;
        let session = Self::new(source_name, result.dataset);
        session.announce_load(Some(&result.encoding));
        Ok(session)
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Label attached to this session's log lines.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn pending_row(&self) -> Option<&PendingRow> {
        self.pending.as_ref()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    // =========================================================================
    // Column operations
    // =========================================================================

    /// Append a column computed by `formula`, or empty when there is none.
    ///
    /// Rows whose evaluation fails get `ERR`; an unparseable formula gives
    /// `ERR` on every row. Neither aborts the operation.
    pub fn add_formula_column(
        &mut self,
        name: &str,
        formula: Option<&str>,
    ) -> EditResult<&AuditEntry> {
        let action = format!("add column '{}'", name);
        self.check_new_column(name)
            .map_err(|e| self.rejected(&action, e))?;

        let source = formula.map(str::trim).filter(|f| !f.is_empty());
        let (cells, description) = match source {
            None => (
                vec![Cell::empty(); self.dataset.row_count()],
                format!("Added column: {}", name),
            ),
            Some(src) => (
                self.evaluate_column(name, src),
                format!("Added column: {} = {}", name, src),
            ),
        };

        let next = self.dataset.with_column(name, cells)?;
        Ok(self.commit(next, description))
    }

    /// Append a column whose cells are chosen by a comparison.
    pub fn add_conditional_column(
        &mut self,
        rule: &ConditionalColumn,
    ) -> EditResult<&AuditEntry> {
        let action = format!("add conditional column '{}'", rule.name);
        self.check_new_column(&rule.name)
            .map_err(|e| self.rejected(&action, e))?;

        let idx = self
            .dataset
            .column_index(&rule.column)
            .ok_or_else(|| self.rejected(&action, EditError::UnknownColumn(rule.column.clone())))?;

        let cells = self
            .dataset
            .rows()
            .iter()
            .map(|row| row.get(idx).map(|c| rule.resolve(c)).unwrap_or_default())
            .collect();

        let next = self.dataset.with_column(&rule.name, cells)?;
        let description = format!(
            "Added conditional column: {} ({})",
            rule.name,
            rule.describe()
        );
        Ok(self.commit(next, description))
    }

    /// Remove columns. Names that are not present are ignored.
    pub fn drop_columns(&mut self, names: &[String]) -> &AuditEntry {
        let (next, removed) = self.dataset.without_columns(names);
        let description = format!("Dropped columns: {}", list_or_none(&removed));

        // Staged cells for dropped columns go away with them.
        if let Some(pending) = self.pending.take() {
            let kept = pending
                .columns()
                .iter()
                .zip(pending.cells())
                .filter(|(c, _)| !removed.contains(c))
                .map(|(c, v)| (c.clone(), v.clone()));
            self.pending = Some(PendingRow::from_pairs(kept));
        }

        self.commit(next, description)
    }

    // =========================================================================
    // Row operations
    // =========================================================================

    /// Append a staged row. Its columns must match the dataset's exactly.
    pub fn add_row(&mut self, row: PendingRow) -> EditResult<&AuditEntry> {
        let next = match self.dataset.with_row(row.columns(), row.clone().into_row()) {
            Ok(next) => next,
            Err(e) => return Err(self.rejected("add row", e)),
        };
        Ok(self.commit(next, "Added a new row".to_string()))
    }

    /// Remove rows by committed index; out-of-range indices are ignored.
    pub fn delete_rows(&mut self, indices: &[usize]) -> &AuditEntry {
        let (next, removed) = self.dataset.without_rows(indices);
        let shown: Vec<String> = removed.iter().map(|i| (i + 1).to_string()).collect();
        let description = format!("Deleted rows: {}", list_or_none(&shown));
        self.commit(next, description)
    }

    /// Replace one cell.
    pub fn edit_cell(
        &mut self,
        row: usize,
        column: &str,
        value: impl Into<Cell>,
    ) -> EditResult<&AuditEntry> {
        let next = match self.dataset.with_cell(row, column, value.into()) {
            Ok(next) => next,
            Err(e) => return Err(self.rejected("edit cell", e)),
        };
        let description = format!("Edited row {}, column \"{}\"", row + 1, column);
        Ok(self.commit(next, description))
    }

    // =========================================================================
    // Pending row
    // =========================================================================

    /// Stage an empty row for the current columns, replacing any staged row.
    pub fn start_row(&mut self) -> &PendingRow {
        self.pending.insert(PendingRow::new(self.dataset.columns()))
    }

    pub fn set_pending_cell(&mut self, column: &str, value: impl Into<Cell>) -> EditResult<()> {
        match self.pending.as_mut() {
            Some(pending) => pending.set(column, value),
            None => Err(EditError::NoPendingRow),
        }
    }

    /// Commit the staged row. On failure it stays staged.
    pub fn save_pending_row(&mut self) -> EditResult<&AuditEntry> {
        let pending = self.pending.take().ok_or(EditError::NoPendingRow)?;
        match self.dataset.with_row(pending.columns(), pending.clone().into_row()) {
            Ok(next) => Ok(self.commit(next, "Added a new row".to_string())),
            Err(e) => {
                self.pending = Some(pending);
                Err(self.rejected("save pending row", e))
            }
        }
    }

    pub fn discard_pending_row(&mut self) -> Option<PendingRow> {
        self.pending.take()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Run one command. Returns the audit entry it recorded, if any
    /// (pending-row staging records nothing).
    pub fn apply(&mut self, command: Command) -> EditResult<Option<AuditEntry>> {
        let entry = match command {
            Command::AddColumn { name, formula } => {
                self.add_formula_column(&name, formula.as_deref())?.clone()
            }
            Command::AddConditionalColumn(rule) => self.add_conditional_column(&rule)?.clone(),
            Command::DropColumns { columns } => self.drop_columns(&columns).clone(),
            Command::AddRow { values } => {
                let mut row = PendingRow::new(self.dataset.columns());
                for (column, value) in values {
                    row.set(&column, value)
                        .map_err(|e| self.rejected("add row", e))?;
                }
                self.add_row(row)?.clone()
            }
            Command::DeleteRows { rows } => self.delete_rows(&rows).clone(),
            Command::EditCell { row, column, value } => {
                self.edit_cell(row, &column, value)?.clone()
            }
            Command::StartRow => {
                self.start_row();
                return Ok(None);
            }
            Command::SetPendingCell { column, value } => {
                self.set_pending_cell(&column, value)?;
                return Ok(None);
            }
            Command::SavePendingRow => self.save_pending_row()?.clone(),
            Command::DiscardPendingRow => {
                self.discard_pending_row();
                return Ok(None);
            }
        };
        Ok(Some(entry))
    }

    // =========================================================================
    // Views and export
    // =========================================================================

    /// Filtered preview capped at [`SessionOptions::preview_rows`].
    pub fn preview(&self, filter: &FilterSpec, visible: Option<&[String]>) -> Preview {
        project(&self.dataset, filter, visible, self.options.preview_rows)
    }

    /// Distinct values of a column, for filter pickers.
    pub fn filter_options(&self, column: &str) -> Vec<String> {
        filter_options(&self.dataset, column)
    }

    /// CSV text of the current dataset. `columns` picks and orders the
    /// output; `None` exports every column in dataset order.
    pub fn export_csv(&self, columns: Option<&[String]>) -> String {
        serialize(&self.dataset, columns.unwrap_or(self.dataset.columns()))
    }

    /// Audit log as plain text, one entry per line.
    pub fn export_log(&self) -> String {
        self.audit.render()
    }

    /// `edited_<source name>`
    pub fn export_csv_name(&self) -> String {
        format!("edited_{}", self.source_name)
    }

    /// `logs_<source stem>.txt`
    pub fn export_log_name(&self) -> String {
        let stem = self
            .source_name
            .strip_suffix(".csv")
            .unwrap_or(&self.source_name);
        format!("logs_{}.txt", stem)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_new_column(&self, name: &str) -> EditResult<()> {
        if name.trim().is_empty() || name.contains([',', '\n', '\r']) {
            return Err(EditError::InvalidColumnName(name.to_string()));
        }
        if self.dataset.has_column(name) {
            return Err(EditError::DuplicateColumn(name.to_string()));
        }
        Ok(())
    }

    fn evaluate_column(&self, name: &str, source: &str) -> Vec<Cell> {
        let rows = self.dataset.row_count();
        let formula = match Formula::parse(source) {
            Ok(f) => f,
            Err(e) => {
                self.emit(LogEntry::warning(format!(
                    "Formula for '{}' could not be parsed ({}), all {} rows set to {}",
                    name, e, rows, ERROR_SENTINEL
                )));
                return vec![Cell::from(ERROR_SENTINEL); rows];
            }
        };

        let mut failed = 0;
        let cells: Vec<Cell> = self
            .dataset
            .iter_rows()
            .map(|row| {
                formula.evaluate(&row).unwrap_or_else(|_| {
                    failed += 1;
                    Cell::from(ERROR_SENTINEL)
                })
            })
            .collect();

        if failed > 0 {
            self.emit(LogEntry::warning(format!(
                "{} of {} rows evaluated to {} in column '{}'",
                failed, rows, ERROR_SENTINEL, name
            )));
        }
        cells
    }

    fn commit(&mut self, next: Dataset, description: String) -> &AuditEntry {
        let description = single_line(&description);
        self.dataset = next;
        self.emit(LogEntry::success(description.clone()));
        self.audit.record(description)
    }

    fn rejected(&self, action: &str, err: EditError) -> EditError {
        self.emit(LogEntry::error(format!("Rejected {}: {}", action, err)));
        err
    }

    fn announce_load(&self, encoding: Option<&str>) {
        let mut message = format!(
            "Loaded file: {} ({} rows, {} columns",
            self.source_name,
            self.dataset.row_count(),
            self.dataset.column_count()
        );
        if let Some(enc) = encoding {
            message.push_str(&format!(", {}", enc));
        }
        message.push(')');
        self.emit(LogEntry::info(message));
    }

    fn emit(&self, entry: LogEntry) {
        let entry = match &self.tag {
            Some(tag) => entry.with_session(tag.clone()),
            None => entry,
        };
        LOG_BROADCASTER.log(entry);
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
