//! Filter expressions.
//!
//! ```text
//! expr    := and (("||" | "or") and)*
//! and     := unary (("&&" | "and") unary)*
//! unary   := ("!" | "not") unary | "(" expr ")" | cmp
//! cmp     := field [op literal]
//! op      := "==" | "!=" | "<" | "<=" | ">" | ">=" | "=~" | "!~"
//! literal := number | "str" | 'str' | true | false | null | bareword
//! ```
//!
//! A bare field tests truthiness. Missing fields evaluate as null, and an
//! ordered comparison involving null is false.

use crate::error::{Error, Result};
use lamina_types::{Row, Value};
use regex::Regex;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Truthy(String),
    Compare {
        field: String,
        op: CompareOp,
        literal: Value,
    },
    Matches {
        field: String,
        regex: Regex,
        negated: bool,
    },
}

impl Expr {
    pub fn parse(input: &str) -> Result<Expr> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            input,
            tokens,
            pos: 0,
        };
        let expr = parser.or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(parser.error_at(tok.offset, "unexpected trailing input")),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Expr::Or(a, b) => a.matches(row) || b.matches(row),
            Expr::And(a, b) => a.matches(row) && b.matches(row),
            Expr::Not(inner) => !inner.matches(row),
            Expr::Truthy(field) => row.lookup(field).is_some_and(Value::is_truthy),
            Expr::Compare { field, op, literal } => {
                let value = row.lookup(field).unwrap_or(&Value::Null);
                compare(value, *op, literal)
            }
            Expr::Matches {
                field,
                regex,
                negated,
            } => {
                let hit = match row.lookup(field) {
                    None | Some(Value::Null) => false,
                    Some(value) => regex.is_match(&value.to_string()),
                };
                hit != *negated
            }
        }
    }
}

fn compare(value: &Value, op: CompareOp, literal: &Value) -> bool {
    match op {
        CompareOp::Eq => loose_eq(value, literal),
        CompareOp::Ne => !loose_eq(value, literal),
        _ => {
            let Some(ord) = ordered(value, literal) else {
                return false;
            };
            match op {
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
                CompareOp::Eq | CompareOp::Ne => false,
            }
        }
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x == y;
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(_), _) | (_, Value::String(_)) => a.to_string() == b.to_string(),
        _ => a == b,
    }
}

fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Numbers, and strings that read as numbers
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Ident(String),
    Str(String),
    Number(Value),
    Op(&'static str),
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    offset: usize,
}

const OPERATORS: [&str; 12] = [
    "||", "&&", "==", "!=", "<=", ">=", "=~", "!~", "<", ">", "!", "=",
];

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let err = |offset: usize, reason: &str| Error::InvalidFilter {
        expression: input.to_string(),
        position: offset,
        reason: reason.to_string(),
    };
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' || c == ')' {
            tokens.push(Token {
                kind: if c == '(' { Kind::LParen } else { Kind::RParen },
                offset,
            });
            i += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            let mut text = String::new();
            let mut j = i + 1;
            let mut closed = false;
            while j < chars.len() {
                match chars[j].1 {
                    '\\' if j + 1 < chars.len() => {
                        let next = chars[j + 1].1;
                        if next != c && next != '\\' {
                            text.push('\\');
                        }
                        text.push(next);
                        j += 2;
                    }
                    ch if ch == c => {
                        closed = true;
                        j += 1;
                        break;
                    }
                    ch => {
                        text.push(ch);
                        j += 1;
                    }
                }
            }
            if !closed {
                return Err(err(offset, "unterminated string"));
            }
            tokens.push(Token {
                kind: Kind::Str(text),
                offset,
            });
            i = j;
            continue;
        }
        let starts_number = c.is_ascii_digit()
            || (c == '-' && chars.get(i + 1).is_some_and(|(_, n)| n.is_ascii_digit()));
        if starts_number {
            let mut j = i + 1;
            while j < chars.len() {
                let ch = chars[j].1;
                let exponent_sign = matches!(ch, '+' | '-')
                    && matches!(chars[j - 1].1, 'e' | 'E')
                    && chars.get(j + 1).is_some_and(|(_, n)| n.is_ascii_digit());
                if !(ch.is_ascii_alphanumeric() || ch == '.' || exponent_sign) {
                    break;
                }
                j += 1;
            }
            let end = chars.get(j).map(|(o, _)| *o).unwrap_or(input.len());
            let text = &input[offset..end];
            let number = if let Ok(int) = text.parse::<i64>() {
                Value::Int(int)
            } else {
                match text.parse::<f64>() {
                    Ok(f) if f.is_finite() => Value::Float(f),
                    _ => return Err(err(offset, "invalid number")),
                }
            };
            tokens.push(Token {
                kind: Kind::Number(number),
                offset,
            });
            i = j;
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let mut j = i + 1;
            while j < chars.len()
                && (chars[j].1.is_alphanumeric() || matches!(chars[j].1, '_' | '.' | '-'))
            {
                j += 1;
            }
            let end = chars.get(j).map(|(o, _)| *o).unwrap_or(input.len());
            tokens.push(Token {
                kind: Kind::Ident(input[offset..end].to_string()),
                offset,
            });
            i = j;
            continue;
        }
        let rest = &input[offset..];
        match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(&"=") => return Err(err(offset, "use '==' for equality")),
            Some(op) => {
                tokens.push(Token {
                    kind: Kind::Op(*op),
                    offset,
                });
                i += op.chars().count();
            }
            None => return Err(err(offset, "unexpected character")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn end_offset(&self) -> usize {
        self.input.len()
    }

    fn error_at(&self, position: usize, reason: &str) -> Error {
        Error::InvalidFilter {
            expression: self.input.to_string(),
            position,
            reason: reason.to_string(),
        }
    }

    fn eat_keyword(&mut self, op: &str, word: &str) -> bool {
        let hit = match self.peek().map(|t| &t.kind) {
            Some(Kind::Op(o)) => *o == op,
            Some(Kind::Ident(w)) => w.eq_ignore_ascii_case(word),
            _ => false,
        };
        if hit {
            self.pos += 1;
        }
        hit
    }

    fn or(&mut self) -> Result<Expr> {
        let mut left = self.and()?;
        while self.eat_keyword("||", "or") {
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        while self.eat_keyword("&&", "and") {
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat_keyword("!", "not") {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        let Some(token) = self.next() else {
            return Err(self.error_at(self.end_offset(), "expected a field or '('"));
        };
        match token.kind {
            Kind::LParen => {
                let inner = self.or()?;
                match self.next() {
                    Some(Token {
                        kind: Kind::RParen, ..
                    }) => Ok(inner),
                    Some(t) => Err(self.error_at(t.offset, "expected ')'")),
                    None => Err(self.error_at(self.end_offset(), "expected ')'")),
                }
            }
            Kind::Ident(field) => self.comparison(field),
            _ => Err(self.error_at(token.offset, "expected a field name")),
        }
    }

    fn comparison(&mut self, field: String) -> Result<Expr> {
        let op = match self.peek().map(|t| &t.kind) {
            Some(Kind::Op(op)) if !matches!(*op, "||" | "&&" | "!") => *op,
            _ => return Ok(Expr::Truthy(field)),
        };
        let op_offset = self.peek().map(|t| t.offset).unwrap_or_default();
        self.pos += 1;

        let Some(token) = self.next() else {
            return Err(self.error_at(self.end_offset(), "expected a value after operator"));
        };
        let literal = match token.kind {
            Kind::Number(n) => n,
            Kind::Str(s) => Value::String(s),
            Kind::Ident(word) => match word.to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                _ => Value::String(word),
            },
            _ => return Err(self.error_at(token.offset, "expected a value")),
        };

        let op = match op {
            "==" => CompareOp::Eq,
            "!=" => CompareOp::Ne,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::Le,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::Ge,
            "=~" | "!~" => {
                let pattern = literal.to_string();
                let regex = Regex::new(&pattern)
                    .map_err(|e| self.error_at(token.offset, &e.to_string()))?;
                return Ok(Expr::Matches {
                    field,
                    regex,
                    negated: op == "!~",
                });
            }
            _ => return Err(self.error_at(op_offset, "unknown operator")),
        };
        Ok(Expr::Compare { field, op, literal })
    }
}
