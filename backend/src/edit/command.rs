//! Edit commands as data.
//!
//! Every session operation has a command variant, so a script file or an
//! HTTP body can drive a [`Session`](super::Session).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::condition::ConditionalColumn;

/// All available edit commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Append a column, computed from a formula or left empty
    AddColumn {
        name: String,
        #[serde(default)]
        formula: Option<String>,
    },

    /// Append a column holding one of two values depending on a comparison
    AddConditionalColumn(ConditionalColumn),

    /// Remove columns; unknown names are ignored
    DropColumns { columns: Vec<String> },

    /// Append a row in one step; unlisted columns stay empty
    AddRow {
        #[serde(default)]
        values: BTreeMap<String, String>,
    },

    /// Remove rows by 0-based index; out-of-range indices are ignored
    DeleteRows { rows: Vec<usize> },

    /// Replace one cell
    EditCell {
        row: usize,
        column: String,
        value: String,
    },

    /// Stage an empty pending row
    StartRow,

    /// Fill one cell of the pending row
    SetPendingCell { column: String, value: String },

    /// Commit the pending row
    SavePendingRow,

    /// Throw the pending row away
    DiscardPendingRow,
}

impl Command {
    /// Parse one command or a JSON array of commands.
    pub fn list_from_json(json: &str) -> Result<Vec<Command>, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(|c| vec![c])
        }
    }

    /// Command name as it appears in JSON
    pub fn kind(&self) -> &'static str {
        match self {
            Command::AddColumn { .. } => "add_column",
            Command::AddConditionalColumn(_) => "add_conditional_column",
            Command::DropColumns { .. } => "drop_columns",
            Command::AddRow { .. } => "add_row",
            Command::DeleteRows { .. } => "delete_rows",
            Command::EditCell { .. } => "edit_cell",
            Command::StartRow => "start_row",
            Command::SetPendingCell { .. } => "set_pending_cell",
            Command::SavePendingRow => "save_pending_row",
            Command::DiscardPendingRow => "discard_pending_row",
        }
    }
}

/// Get a description of all available commands
pub fn commands_description() -> String {
    r#"Available edit commands:

| Command | Description | Parameters |
|---------|-------------|------------|
| add_column | Append a column (formula or empty) | name, formula (optional) |
| add_conditional_column | Append a column chosen by a comparison | name, column, op (= != > < >= <=), value, if_true, if_false |
| drop_columns | Remove columns | columns: list of names |
| add_row | Append a row | values: {column: value} |
| delete_rows | Remove rows | rows: list of 0-based indices |
| edit_cell | Replace one cell | row (0-based), column, value |
| start_row | Stage an empty pending row | - |
| set_pending_cell | Fill a pending cell | column, value |
| save_pending_row | Commit the pending row | - |
| discard_pending_row | Drop the pending row | - |

Formulas support numbers, "strings", column names (bare or [with spaces]),
+ - * / and = != > < >= <=, with parentheses. A row whose formula fails
gets the value ERR.

Example script:
[
  {"type": "add_column", "name": "total", "formula": "age + score"},
  {"type": "add_conditional_column", "name": "flag", "column": "age", "op": ">", "value": "18", "if_true": "adult", "if_false": "minor"},
  {"type": "drop_columns", "columns": ["notes"]},
  {"type": "edit_cell", "row": 0, "column": "age", "value": "21"},
  {"type": "delete_rows", "rows": [3, 4]}
]"#
    .to_string()
}
