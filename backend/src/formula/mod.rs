//! Formula language for computed columns.
//!
//! This module provides:
//! - `lexer`: Tokenizer for formula text
//! - `ast`: Expression tree and recursive-descent parser
//! - `eval`: Evaluation of a tree against one row's cells
//!
//! ## Grammar
//!
//! ```text
//! comparison := additive (("=" | "!=" | ">" | "<" | ">=" | "<=") additive)*
//! additive   := term (("+" | "-") term)*
//! term       := unary (("*" | "/") unary)*
//! unary      := ("-" | "+") unary | primary
//! primary    := NUMBER | STRING | IDENT | "[" name "]" | "(" comparison ")"
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use csvedit::formula::Formula;
//! use csvedit::models::Cell;
//!
//! let mut row = BTreeMap::new();
//! row.insert("age".to_string(), Cell::from("10"));
//! row.insert("score".to_string(), Cell::from("5"));
//!
//! let formula = Formula::parse("age + score").unwrap();
//! assert_eq!(formula.evaluate(&row).unwrap().as_str(), "15");
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;

pub use ast::{parse, BinaryOp, Expr};
pub use eval::{evaluate as evaluate_expr, Bindings, Value};

use crate::error::{EvalError, EvalResult};
use crate::models::Cell;

/// Cell value written when a formula cannot be evaluated for a row.
pub const ERROR_SENTINEL: &str = "ERR";

/// A compiled formula: parse once, evaluate per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> EvalResult<Self> {
        Ok(Self {
            source: source.to_string(),
            expr: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate<B: Bindings + ?Sized>(&self, row: &B) -> EvalResult<Cell> {
        eval::evaluate(&self.expr, row).map(Value::into_cell)
    }

    /// Evaluate, substituting [`ERROR_SENTINEL`] on failure.
    pub fn evaluate_or_sentinel<B: Bindings + ?Sized>(&self, row: &B) -> Cell {
        self.evaluate(row)
            .unwrap_or_else(|_| Cell::from(ERROR_SENTINEL))
    }
}

/// Parse and evaluate `source` for a single row.
pub fn evaluate<B: Bindings + ?Sized>(source: &str, row: &B) -> Result<Cell, EvalError> {
    Formula::parse(source)?.evaluate(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_sentinel_on_failure() {
        let mut row = HashMap::new();
        row.insert("age".to_string(), Cell::from("abc"));
        row.insert("score".to_string(), Cell::from("7"));

        let formula = Formula::parse("age + score").unwrap();
        assert_eq!(formula.evaluate_or_sentinel(&row).as_str(), ERROR_SENTINEL);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let mut row = HashMap::new();
        row.insert("x".to_string(), Cell::from("3"));

        let first = evaluate("x * x + 1", &row).unwrap();
        let second = evaluate("x * x + 1", &row).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "10");
    }

    #[test]
    fn test_parse_error_surfaces() {
        let row: HashMap<String, Cell> = HashMap::new();
        assert!(matches!(
            evaluate("1 +", &row),
            Err(EvalError::Syntax { .. })
        ));
    }
}
