//! Expression evaluation against one row.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::ast::{BinaryOp, Expr};
use crate::error::{EvalError, EvalResult};
use crate::models::Cell;

/// Where column identifiers get their values from.
pub trait Bindings {
    fn lookup(&self, name: &str) -> Option<&Cell>;
}

impl Bindings for BTreeMap<String, Cell> {
    fn lookup(&self, name: &str) -> Option<&Cell> {
        self.get(name)
    }
}

impl Bindings for HashMap<String, Cell> {
    fn lookup(&self, name: &str) -> Option<&Cell> {
        self.get(name)
    }
}

/// Intermediate value during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Value of a cell: numeric when the text parses as a number.
    pub fn from_cell(cell: &Cell) -> Self {
        match cell.as_number() {
            Some(n) => Value::Number(n),
            None => Value::Text(cell.as_str().to_string()),
        }
    }

    /// Only cells are coerced to numbers (in [`Value::from_cell`]); a quoted
    /// literal stays text.
    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) | Value::Bool(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Number(n) => format!("number {}", n),
            Value::Text(s) => format!("text {:?}", s),
            Value::Bool(b) => format!("boolean {}", b),
        }
    }

    pub fn into_cell(self) -> Cell {
        Cell::new(self.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // -0 renders as 0
            Value::Number(n) if *n == 0.0 => f.write_str("0"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Evaluate an expression tree with identifiers bound by `row`.
pub fn evaluate<B: Bindings + ?Sized>(expr: &Expr, row: &B) -> EvalResult<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Column(name) => row
            .lookup(name)
            .map(Value::from_cell)
            .ok_or_else(|| EvalError::UnknownColumn(name.clone())),
        Expr::Negate(inner) => match evaluate(inner, row)? {
            Value::Number(n) => finite(-n),
            other => Err(EvalError::TypeMismatch {
                op: "-".to_string(),
                left: "nothing".to_string(),
                right: other.describe(),
            }),
        },
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, row)?;
            let r = evaluate(right, row)?;
            apply_binary(*op, l, r)
        }
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Add => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => finite(a + b),
            _ => match (&left, &right) {
                (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{}{}", a, b))),
                _ => Err(mismatch(op, &left, &right)),
            },
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (a, b) = match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(mismatch(op, &left, &right)),
            };
            match op {
                BinaryOp::Sub => finite(a - b),
                BinaryOp::Mul => finite(a * b),
                _ if b == 0.0 => Err(EvalError::DivisionByZero),
                _ => finite(a / b),
            }
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            let equal = match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => left.to_string() == right.to_string(),
            };
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Gt | BinaryOp::Lt | BinaryOp::GtEq | BinaryOp::LtEq => {
            let (a, b) = match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(mismatch(op, &left, &right)),
            };
            let result = match op {
                BinaryOp::Gt => a > b,
                BinaryOp::Lt => a < b,
                BinaryOp::GtEq => a >= b,
                _ => a <= b,
            };
            Ok(Value::Bool(result))
        }
    }
}

fn finite(n: f64) -> EvalResult<Value> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(EvalError::NonFinite)
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.symbol().to_string(),
        left: left.describe(),
        right: right.describe(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::ast::parse;

    fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, Cell> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Cell::from(*v)))
            .collect()
    }

    fn eval(source: &str, pairs: &[(&str, &str)]) -> EvalResult<Value> {
        evaluate(&parse(source).unwrap(), &row(pairs))
    }

    #[test]
    fn test_numeric_arithmetic() {
        let r = [("age", "10"), ("score", "5")];
        assert_eq!(eval("age + score", &r).unwrap().to_string(), "15");
        assert_eq!(eval("age * score - 1", &r).unwrap().to_string(), "49");
        assert_eq!(eval("score / 2", &r).unwrap().to_string(), "2.5");
        assert_eq!(eval("(age + score) * 2", &r).unwrap().to_string(), "30");
        assert_eq!(eval("-age", &r).unwrap().to_string(), "-10");
    }

    #[test]
    fn test_string_concatenation() {
        let r = [("first", "Ada"), ("last", "Lovelace")];
        assert_eq!(
            eval("first + \" \" + last", &r).unwrap(),
            Value::Text("Ada Lovelace".into())
        );
    }

    #[test]
    fn test_quoted_literals_stay_text() {
        assert_eq!(eval("'1' + '2'", &[]).unwrap(), Value::Text("12".into()));
        assert!(matches!(
            eval("'5' * 2", &[]),
            Err(EvalError::TypeMismatch { .. })
        ));
        // A numeric cell compared with a quoted literal falls back to text.
        assert_eq!(eval("code = '10'", &[("code", "10")]).unwrap(), Value::Bool(true));
        assert_eq!(eval("code = '10.0'", &[("code", "10")]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_deeply_nested_tree_evaluates() {
        let source = vec!["a"; crate::formula::ast::MAX_OPERATORS + 1].join(" + ");
        let n = crate::formula::ast::MAX_OPERATORS + 1;
        assert_eq!(eval(&source, &[("a", "1")]).unwrap(), Value::Number(n as f64));
    }

    #[test]
    fn test_mixed_addition_is_type_mismatch() {
        let r = [("age", "abc"), ("score", "7")];
        assert!(matches!(
            eval("age + score", &r),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("a / b", &[("a", "1"), ("b", "0")]), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_unknown_column() {
        assert_eq!(eval("nope + 1", &[]), Err(EvalError::UnknownColumn("nope".into())));
    }

    #[test]
    fn test_comparisons() {
        let r = [("age", "20"), ("name", "bob")];
        assert_eq!(eval("age > 18", &r).unwrap(), Value::Bool(true));
        assert_eq!(eval("age <= 18", &r).unwrap(), Value::Bool(false));
        assert_eq!(eval("age = 20.0", &r).unwrap(), Value::Bool(true));
        assert_eq!(eval("name = 'bob'", &r).unwrap(), Value::Bool(true));
        assert_eq!(eval("name != 'alice'", &r).unwrap(), Value::Bool(true));
        assert_eq!(eval("age > 18", &r).unwrap().to_string(), "true");
    }

    #[test]
    fn test_ordered_comparison_on_text_is_type_mismatch() {
        assert!(matches!(
            eval("name > 'a'", &[("name", "bob")]),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_negative_zero_renders_as_zero() {
        assert_eq!(eval("-a", &[("a", "0")]).unwrap().to_string(), "0");
    }

    #[test]
    fn test_empty_cell_is_text() {
        assert!(eval("a + 1", &[("a", "")]).is_err());
        assert_eq!(eval("a + 'x'", &[("a", "")]).unwrap(), Value::Text("x".into()));
    }
}
