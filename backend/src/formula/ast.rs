//! Expression tree and recursive-descent parser.
//!
//! The tree only has literal, column and operator nodes; there is no way to
//! call functions or reach anything outside the row being evaluated.

use std::fmt;

use super::lexer::{tokenize, Token, TokenKind};
use crate::error::{EvalError, EvalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::GtEq => ">=",
            BinaryOp::LtEq => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Column(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Column names referenced anywhere in the tree, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Negate(inner) => inner.collect_columns(out),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Number(_) | Expr::Text(_) => {}
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Text(s) => write!(f, "{:?}", s),
            Expr::Column(c) => write!(f, "[{}]", c),
            Expr::Negate(inner) => write!(f, "-({})", inner),
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
        }
    }
}

/// Deepest allowed nesting of parentheses and unary signs.
pub const MAX_NESTING: usize = 256;

/// Most binary operators allowed in one formula.
pub const MAX_OPERATORS: usize = 1024;

/// Parse formula text into an expression tree.
///
/// Formulas nested deeper than [`MAX_NESTING`] or holding more than
/// [`MAX_OPERATORS`] operators are syntax errors, which keeps parsing,
/// evaluation and drop within a bounded stack.
pub fn parse(source: &str) -> EvalResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        TokenKind::End => Ok(expr),
        other => Err(parser.error(format!("unexpected {}", other.describe()))),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        // tokenize() always terminates the stream with End, so the last
        // index is a valid fallback.
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("formula nested too deeply".to_string()));
        }
        Ok(())
    }

    fn combine(&mut self, op: BinaryOp, left: Expr, right: Expr) -> EvalResult<Expr> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.error("formula has too many operators".to_string()));
        }
        Ok(binary(op, left, right))
    }

    fn error(&self, message: String) -> EvalError {
        let idx = self.pos.min(self.tokens.len() - 1);
        EvalError::Syntax {
            position: self.tokens[idx].position,
            message,
        }
    }

    fn comparison(&mut self) -> EvalResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::LtEq => BinaryOp::LtEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.additive()?;
            left = self.combine(op, left, right)?;
        }
    }

    fn additive(&mut self) -> EvalResult<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = self.combine(op, left, right)?;
        }
    }

    fn term(&mut self) -> EvalResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = self.combine(op, left, right)?;
        }
    }

    fn unary(&mut self) -> EvalResult<Expr> {
        match self.peek() {
            TokenKind::Minus => {
                self.advance();
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Negate(Box::new(inner)))
            }
            TokenKind::Plus => {
                self.advance();
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> EvalResult<Expr> {
        match self.advance() {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Text(s) => Ok(Expr::Text(s)),
            TokenKind::Column(c) => Ok(Expr::Column(c)),
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.comparison()?;
                self.depth -= 1;
                match self.advance() {
                    TokenKind::RParen => Ok(inner),
                    other => Err(self.error(format!("expected ')' but found {}", other.describe()))),
                }
            }
            other => Err(self.error(format!("expected a value but found {}", other.describe()))),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * 2 > 10").unwrap();
        assert_eq!(expr.to_string(), "(([a] + ([b] * 2)) > 10)");
    }

    #[test]
    fn test_left_associative() {
        let expr = parse("10 - 4 - 3").unwrap();
        assert_eq!(expr.to_string(), "((10 - 4) - 3)");
    }

    #[test]
    fn test_parentheses_and_unary() {
        let expr = parse("-(a + 1) * +2").unwrap();
        assert_eq!(expr.to_string(), "(-(([a] + 1)) * 2)");
    }

    #[test]
    fn test_columns_collected_once() {
        let expr = parse("age + score * age + [first name]").unwrap();
        assert_eq!(expr.columns(), vec!["age", "score", "first name"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("a +").is_err());
        assert!(parse("(a + 1").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("* 2").is_err());
    }

    #[test]
    fn test_deep_nesting_is_syntax_error() {
        let signs = format!("{}1", "-".repeat(10_000));
        match parse(&signs) {
            Err(EvalError::Syntax { message, .. }) => {
                assert_eq!(message, "formula nested too deeply")
            }
            other => panic!("expected syntax error, got {:?}", other),
        }

        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(parse(&parens), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_nesting_within_limit() {
        let n = MAX_NESTING;
        let parens = format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(parse(&parens).unwrap(), Expr::Number(1.0));
        assert!(parse(&format!("{}1", "-".repeat(n))).is_ok());
    }

    #[test]
    fn test_long_operator_chain_is_syntax_error() {
        let chain = vec!["1"; MAX_OPERATORS + 2].join(" + ");
        assert!(matches!(parse(&chain), Err(EvalError::Syntax { .. })));

        let ok = vec!["1"; MAX_OPERATORS + 1].join(" + ");
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_no_function_calls() {
        // An identifier followed by parentheses is two values side by side.
        assert!(parse("exec(1)").is_err());
    }
}
