//! Tokenizer for formula text.

use crate::error::{EvalError, EvalResult};

/// A lexical token with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Text(String),
    /// Bare identifier or `[bracketed name]`.
    Column(String),
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    LParen,
    RParen,
    End,
}

impl TokenKind {
    /// Short human description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Text(s) => format!("string {:?}", s),
            TokenKind::Column(c) => format!("column {}", c),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Eq => "'='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::GtEq => "'>='".to_string(),
            TokenKind::LtEq => "'<='".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::End => "end of formula".to_string(),
        }
    }
}

fn syntax(position: usize, message: impl Into<String>) -> EvalError {
    EvalError::Syntax {
        position,
        message: message.into(),
    }
}

/// Split formula text into tokens. The last token is always [`TokenKind::End`].
pub fn tokenize(source: &str) -> EvalResult<Vec<Token>> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let peek = chars.get(i + 1).map(|(_, c)| *c);
        let (kind, width) = match c {
            '+' => (TokenKind::Plus, 1),
            '-' => (TokenKind::Minus, 1),
            '*' => (TokenKind::Star, 1),
            '/' => (TokenKind::Slash, 1),
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            '=' if peek == Some('=') => (TokenKind::Eq, 2),
            '=' => (TokenKind::Eq, 1),
            '!' if peek == Some('=') => (TokenKind::NotEq, 2),
            '<' if peek == Some('>') => (TokenKind::NotEq, 2),
            '<' if peek == Some('=') => (TokenKind::LtEq, 2),
            '<' => (TokenKind::Lt, 1),
            '>' if peek == Some('=') => (TokenKind::GtEq, 2),
            '>' => (TokenKind::Gt, 1),
            '"' | '\'' => {
                let (text, next) = read_string(&chars, i, c)?;
                tokens.push(Token {
                    kind: TokenKind::Text(text),
                    position: pos,
                });
                i = next;
                continue;
            }
            '[' => {
                let (name, next) = read_bracketed(&chars, i)?;
                tokens.push(Token {
                    kind: TokenKind::Column(name),
                    position: pos,
                });
                i = next;
                continue;
            }
            c if c.is_ascii_digit() || (c == '.' && peek.is_some_and(|p| p.is_ascii_digit())) => {
                let (number, next) = read_number(source, &chars, i)?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    position: pos,
                });
                i = next;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let name: String = chars[start..i].iter().map(|(_, c)| *c).collect();
                tokens.push(Token {
                    kind: TokenKind::Column(name),
                    position: pos,
                });
                continue;
            }
            other => return Err(syntax(pos, format!("unexpected character '{}'", other))),
        };

        tokens.push(Token { kind, position: pos });
        i += width;
    }

    tokens.push(Token {
        kind: TokenKind::End,
        position: source.len(),
    });
    Ok(tokens)
}

fn read_string(chars: &[(usize, char)], start: usize, quote: char) -> EvalResult<(String, usize)> {
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i].1 {
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1].1);
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(syntax(chars[start].0, "unterminated string literal"))
}

fn read_bracketed(chars: &[(usize, char)], start: usize) -> EvalResult<(String, usize)> {
    let end = chars[start + 1..]
        .iter()
        .position(|(_, c)| *c == ']')
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| syntax(chars[start].0, "missing ']' after column name"))?;

    let name: String = chars[start + 1..end].iter().map(|(_, c)| *c).collect();
    if name.is_empty() {
        return Err(syntax(chars[start].0, "empty column reference"));
    }
    Ok((name, end + 1))
}

fn read_number(source: &str, chars: &[(usize, char)], start: usize) -> EvalResult<(f64, usize)> {
    let mut i = start;
    let mut seen_dot = false;
    while i < chars.len() {
        match chars[i].1 {
            c if c.is_ascii_digit() => i += 1,
            '.' if !seen_dot => {
                seen_dot = true;
                i += 1;
            }
            _ => break,
        }
    }

    let from = chars[start].0;
    let to = chars.get(i).map(|(p, _)| *p).unwrap_or(source.len());
    let text = &source[from..to];
    text.parse::<f64>()
        .map(|n| (n, i))
        .map_err(|_| syntax(from, format!("invalid number '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            kinds("age + 2.5*(score)"),
            vec![
                TokenKind::Column("age".into()),
                TokenKind::Plus,
                TokenKind::Number(2.5),
                TokenKind::Star,
                TokenKind::LParen,
                TokenKind::Column("score".into()),
                TokenKind::RParen,
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("a >= 1 != b <> c == d <= e"),
            vec![
                TokenKind::Column("a".into()),
                TokenKind::GtEq,
                TokenKind::Number(1.0),
                TokenKind::NotEq,
                TokenKind::Column("b".into()),
                TokenKind::NotEq,
                TokenKind::Column("c".into()),
                TokenKind::Eq,
                TokenKind::Column("d".into()),
                TokenKind::LtEq,
                TokenKind::Column("e".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_strings_and_brackets() {
        assert_eq!(
            kinds(r#"[first name] + " \"x\"" + 'y'"#),
            vec![
                TokenKind::Column("first name".into()),
                TokenKind::Plus,
                TokenKind::Text(" \"x\"".into()),
                TokenKind::Plus,
                TokenKind::Text("y".into()),
                TokenKind::End,
            ]
        );
    }

    #[test]
    fn test_leading_dot_number() {
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5), TokenKind::End]);
    }

    #[test]
    fn test_errors_carry_position() {
        match tokenize("a + \"open").unwrap_err() {
            EvalError::Syntax { position, .. } => assert_eq!(position, 4),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(tokenize("a ; b").is_err());
        assert!(tokenize("[unclosed").is_err());
        assert!(tokenize("[]").is_err());
    }
}
