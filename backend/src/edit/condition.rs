//! Conditional columns: pick one of two values by comparing a column.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::audit::single_line;
use crate::models::{parse_number, Cell};

/// Comparison applied between a cell and the compare value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    GtEq,
    #[serde(rename = "<=")]
    LtEq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::GtEq => ">=",
            CompareOp::LtEq => "<=",
        }
    }

    /// Whether `cell op value` holds.
    ///
    /// When both sides are numeric the comparison is numeric. Otherwise only
    /// `=` and `!=` apply, as exact text comparison; the ordered operators
    /// are never met on non-numeric operands.
    pub fn is_met(&self, cell: &Cell, value: &str) -> bool {
        match (cell.as_number(), parse_number(value)) {
            (Some(a), Some(b)) => match self {
                CompareOp::Eq => a == b,
                CompareOp::NotEq => a != b,
                CompareOp::Gt => a > b,
                CompareOp::Lt => a < b,
                CompareOp::GtEq => a >= b,
                CompareOp::LtEq => a <= b,
            },
            _ => match self {
                CompareOp::Eq => cell.as_str() == value,
                CompareOp::NotEq => cell.as_str() != value,
                _ => false,
            },
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(CompareOp::Eq),
            "!=" | "<>" => Ok(CompareOp::NotEq),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            ">=" => Ok(CompareOp::GtEq),
            "<=" => Ok(CompareOp::LtEq),
            other => Err(format!("unknown comparison operator '{}'", other)),
        }
    }
}

/// Definition of a conditional column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConditionalColumn {
    /// Name of the column to create
    pub name: String,
    /// Column whose cells are tested
    pub column: String,
    pub op: CompareOp,
    /// Value each cell is compared against
    pub value: String,
    #[serde(default)]
    pub if_true: String,
    #[serde(default)]
    pub if_false: String,
}

impl ConditionalColumn {
    /// Output cell for one input cell.
    pub fn resolve(&self, cell: &Cell) -> Cell {
        if self.op.is_met(cell, &self.value) {
            Cell::new(self.if_true.clone())
        } else {
            Cell::new(self.if_false.clone())
        }
    }

    /// `age > 18 ? adult : minor`, always on one line.
    pub fn describe(&self) -> String {
        single_line(&format!(
            "{} {} {} ? {} : {}",
            self.column, self.op, self.value, self.if_true, self.if_false
        ))
    }
}
