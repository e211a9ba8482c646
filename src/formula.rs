//! Tiny arithmetic expression language for trend-line scoring.
//!
//! A formula is parsed once into an expression tree over the fixed set of
//! [`Metric`](crate::trend::Metric) identifiers; evaluation is a pure tree
//! walk against one [`HitMetrics`](crate::trend::HitMetrics) value. Unknown
//! identifiers fail at parse time, before any scoring work.

use crate::trend::{HitMetrics, Metric};
use crate::{EngineError, Result};

// ============================================================
// AST
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
enum Expr {
    Number(f64),
    Metric(Metric),
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, hits: &HitMetrics) -> f64 {
        match self {
            Expr::Number(v) => *v,
            Expr::Metric(m) => hits.get(*m),
            Expr::Neg(e) => -e.eval(hits),
            Expr::Bin(op, a, b) => {
                let (a, b) = (a.eval(hits), b.eval(hits));
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div => a / b,
                }
            }
        }
    }
}

// ============================================================
// TOKENIZER
// ============================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn err(offset: usize, reason: impl Into<String>) -> EngineError {
    EngineError::Formula {
        offset,
        reason: reason.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push((Token::Plus, i));
                i += 1;
            }
            '-' => {
                tokens.push((Token::Minus, i));
                i += 1;
            }
            '*' => {
                tokens.push((Token::Star, i));
                i += 1;
            }
            '/' => {
                tokens.push((Token::Slash, i));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, i));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, i));
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let text = &source[start..i];
                let value: f64 = text
                    .parse()
                    .map_err(|_| err(start, format!("invalid number literal '{text}'")))?;
                tokens.push((Token::Number(value), start));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i] as char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
                {
                    i += 1;
                }
                tokens.push((Token::Ident(source[start..i].to_string()), start));
            }
            other => return Err(err(i, format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

// ============================================================
// PARSER
// ============================================================

struct Parser<'a> {
    tokens: &'a [(Token, usize)],
    pos: usize,
    source_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source_len, |(_, o)| *o)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos).map(|(t, _)| t);
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut left = self.term()?;
        while let Some(op) = match self.peek() {
            Some(Token::Plus) => Some(BinOp::Add),
            Some(Token::Minus) => Some(BinOp::Sub),
            _ => None,
        } {
            self.pos += 1;
            let right = self.term()?;
            left = Expr::Bin(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        while let Some(op) = match self.peek() {
            Some(Token::Star) => Some(BinOp::Mul),
            Some(Token::Slash) => Some(BinOp::Div),
            _ => None,
        } {
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Bin(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Number(v)) => Ok(Expr::Number(*v)),
            Some(Token::Ident(name)) => Metric::from_name(name)
                .map(Expr::Metric)
                .ok_or_else(|| err(offset, format!("unknown metric identifier '{name}'"))),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(err(offset, "unclosed parenthesis")),
                }
            }
            Some(t) => Err(err(offset, format!("unexpected token {t:?}"))),
            None => Err(err(offset, "unexpected end of formula")),
        }
    }
}

// ============================================================
// FORMULA
// ============================================================

/// A parsed scoring formula over the hit-metric identifiers.
#[derive(Debug, Clone)]
pub struct Formula {
    root: Expr,
    source: String,
}

impl Formula {
    /// Parse a formula. Malformed syntax and unknown metric identifiers fail
    /// here, never during scoring.
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(err(0, "empty formula"));
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source_len: source.len(),
        };
        let root = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(err(parser.offset(), "trailing input after expression"));
        }
        Ok(Self {
            root,
            source: source.to_string(),
        })
    }

    /// Evaluate against one candidate's hit metrics. Total; division by zero
    /// produces a non-finite score, which the scorer orders after all finite
    /// scores.
    #[inline]
    pub fn eval(&self, hits: &HitMetrics) -> f64 {
        self.root.eval(hits)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

// ============================================================
// TESTS
// ============================================================
