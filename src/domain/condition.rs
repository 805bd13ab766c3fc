//! Ending condition language
//!
//! Conditions are small boolean expressions over named integer variables
//! (gauges and tags), e.g. `#trust >= 70 AND (#brave > 1 || courage < 20)`.
//!
//! Supported tokens:
//! - identifiers (`[A-Za-z_][A-Za-z0-9_]*`), optionally prefixed with `#`
//! - integer literals and `true` / `false`
//! - comparisons `>= <= > < == !=`
//! - logic `&& || !`, plus the literal words `AND` / `OR` (case-sensitive)
//! - parentheses
//!
//! A blank condition is always true. [`evaluate_condition`] is the lenient
//! entry point used by ending resolution: any lexing, parsing or evaluation
//! failure is logged and reported as `false`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Variable environment a condition is evaluated against
pub type Environment = BTreeMap<String, i32>;

/// Deepest expression tree the parser will build
///
/// Groups, negations and each `&&` / `||` in a chain add one level. The
/// bound keeps evaluation recursion shallow for any input.
pub const MAX_NESTING: usize = 64;

/// Errors raised while parsing or evaluating a condition
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },

    #[error("unexpected token '{found}' at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("integer literal '{literal}' is out of range")]
    IntegerOverflow { literal: String },

    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    #[error("expression nests deeper than {limit} levels")]
    TooDeeplyNested { limit: usize },

    #[error("operator '{op}' cannot compare {lhs} with {rhs}")]
    TypeMismatch {
        op: CompareOp,
        lhs: &'static str,
        rhs: &'static str,
    },
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::LessThan => "<",
            CompareOp::LessThanOrEqual => "<=",
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterThanOrEqual => ">=",
        };
        f.write_str(symbol)
    }
}

/// Parsed condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Var(String),
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Group(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Int(i64),
    Bool(bool),
}

impl Value {
    fn truthy(self) -> bool {
        match self {
            Value::Int(i) => i != 0,
            Value::Bool(b) => b,
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
        }
    }
}

/// A condition parsed once and evaluated many times
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    source: String,
    expr: Option<Expr>,
}

impl Condition {
    /// Parse a condition; blank input yields an always-true condition
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let expr = if source.trim().is_empty() {
            None
        } else {
            let tokens = tokenize(source)?;
            Some(Parser::new(tokens).parse()?)
        };

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_unconditional(&self) -> bool {
        self.expr.is_none()
    }

    /// Names of every variable the condition references
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let Some(expr) = &self.expr {
            collect_variables(expr, &mut names);
        }
        names
    }

    /// Evaluate against `env`; every referenced variable must be bound
    pub fn evaluate(&self, env: &Environment) -> Result<bool, ConditionError> {
        let Some(expr) = &self.expr else {
            return Ok(true);
        };

        if let Some(missing) = self.variables().into_iter().find(|v| !env.contains_key(v)) {
            return Err(ConditionError::UnknownVariable { name: missing });
        }

        eval(expr, env).map(Value::truthy)
    }
}

/// Lenient evaluation: failures are logged and count as `false`
pub fn evaluate_condition(source: &str, env: &Environment) -> bool {
    match Condition::parse(source).and_then(|condition| condition.evaluate(env)) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("Condition '{source}' could not be evaluated, treating as false: {e}");
            false
        }
    }
}

fn collect_variables(expr: &Expr, names: &mut BTreeSet<String>) {
    match expr {
        Expr::Var(name) => {
            names.insert(name.clone());
        }
        Expr::Compare { lhs, rhs, .. } | Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
            collect_variables(lhs, names);
            collect_variables(rhs, names);
        }
        Expr::Not(inner) | Expr::Group(inner) => collect_variables(inner, names),
        Expr::Int(_) | Expr::Bool(_) => {}
    }
}

fn eval(expr: &Expr, env: &Environment) -> Result<Value, ConditionError> {
    match expr {
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Var(name) => env
            .get(name)
            .map(|v| Value::Int(i64::from(*v)))
            .ok_or_else(|| ConditionError::UnknownVariable { name: name.clone() }),
        Expr::Group(inner) => eval(inner, env),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, env)?.truthy())),
        Expr::And(lhs, rhs) => {
            if !eval(lhs, env)?.truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(rhs, env)?.truthy()))
        }
        Expr::Or(lhs, rhs) => {
            if eval(lhs, env)?.truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(rhs, env)?.truthy()))
        }
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval(lhs, env)?;
            let rhs = eval(rhs, env)?;
            compare(*op, lhs, rhs).map(Value::Bool)
        }
    }
}

fn compare(op: CompareOp, lhs: Value, rhs: Value) -> Result<bool, ConditionError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(match op {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::LessThan => a < b,
            CompareOp::LessThanOrEqual => a <= b,
            CompareOp::GreaterThan => a > b,
            CompareOp::GreaterThanOrEqual => a >= b,
        }),
        (Value::Bool(a), Value::Bool(b)) if op == CompareOp::Equal => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) if op == CompareOp::NotEqual => Ok(a != b),
        _ => Err(ConditionError::TypeMismatch {
            op,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Bool(bool),
    Minus,
    And,
    Or,
    Not,
    Compare(CompareOp),
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => f.write_str(name),
            Token::Int(i) => write!(f, "{i}"),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Minus => f.write_str("-"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Not => f.write_str("!"),
            Token::Compare(op) => write!(f, "{op}"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ConditionError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|(_, c)| *c);

    while let Some(&(offset, c)) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '#' || is_ident_start(c) {
            let start = if c == '#' { i + 1 } else { i };
            if !peek(start).is_some_and(is_ident_start) {
                return Err(ConditionError::UnexpectedCharacter { ch: c, offset });
            }
            let mut end = start;
            while peek(end).is_some_and(is_ident_continue) {
                end += 1;
            }
            let word: String = chars[start..end].iter().map(|(_, c)| *c).collect();
            let token = match (c, word.as_str()) {
                ('#', _) => Token::Ident(word),
                (_, "AND") => Token::And,
                (_, "OR") => Token::Or,
                (_, "true") => Token::Bool(true),
                (_, "false") => Token::Bool(false),
                _ => Token::Ident(word),
            };
            tokens.push((token, offset));
            i = end;
            continue;
        }

        if c.is_ascii_digit() {
            let mut end = i;
            while peek(end).is_some_and(|c| c.is_ascii_digit()) {
                end += 1;
            }
            if let Some(next) = peek(end).filter(|c| is_ident_continue(*c)) {
                return Err(ConditionError::UnexpectedCharacter {
                    ch: next,
                    offset: chars[end].0,
                });
            }
            let literal: String = chars[i..end].iter().map(|(_, c)| *c).collect();
            let value = literal
                .parse::<i64>()
                .map_err(|_| ConditionError::IntegerOverflow {
                    literal: literal.clone(),
                })?;
            tokens.push((Token::Int(value), offset));
            i = end;
            continue;
        }

        let next = peek(i + 1);
        let (token, width) = match (c, next) {
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('=', Some('=')) => (Token::Compare(CompareOp::Equal), 2),
            ('!', Some('=')) => (Token::Compare(CompareOp::NotEqual), 2),
            ('>', Some('=')) => (Token::Compare(CompareOp::GreaterThanOrEqual), 2),
            ('<', Some('=')) => (Token::Compare(CompareOp::LessThanOrEqual), 2),
            ('>', _) => (Token::Compare(CompareOp::GreaterThan), 1),
            ('<', _) => (Token::Compare(CompareOp::LessThan), 1),
            ('!', _) => (Token::Not, 1),
            ('-', _) => (Token::Minus, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            _ => return Err(ConditionError::UnexpectedCharacter { ch: c, offset }),
        };
        tokens.push((token, offset));
        i += width;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn descend(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ConditionError::TooDeeplyNested { limit: MAX_NESTING });
        }
        Ok(())
    }

    fn parse(mut self) -> Result<Expr, ConditionError> {
        let expr = self.parse_or()?;
        match self.tokens.get(self.position) {
            None => Ok(expr),
            Some((token, offset)) => Err(ConditionError::UnexpectedToken {
                found: token.to_string(),
                offset: *offset,
            }),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Result<(Token, usize), ConditionError> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or(ConditionError::UnexpectedEnd)?;
        self.position += 1;
        Ok(token)
    }

    fn parse_or(&mut self) -> Result<Expr, ConditionError> {
        let entry = self.depth;
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.position += 1;
            self.descend()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        self.depth = entry;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let entry = self.depth;
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.position += 1;
            self.descend()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        self.depth = entry;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConditionError> {
        if self.peek() == Some(&Token::Not) {
            self.position += 1;
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_primary()?;
        if let Some(Token::Compare(op)) = self.peek() {
            let op = *op;
            self.position += 1;
            let rhs = self.parse_primary()?;
            return Ok(Expr::Compare {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        let (token, offset) = self.advance()?;
        match token {
            Token::Int(i) => Ok(Expr::Int(i)),
            Token::Bool(b) => Ok(Expr::Bool(b)),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::Minus => match self.advance()? {
                (Token::Int(i), _) => Ok(Expr::Int(-i)),
                (other, offset) => Err(ConditionError::UnexpectedToken {
                    found: other.to_string(),
                    offset,
                }),
            },
            Token::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.advance()? {
                    (Token::RParen, _) => Ok(Expr::Group(Box::new(inner))),
                    (other, offset) => Err(ConditionError::UnexpectedToken {
                        found: other.to_string(),
                        offset,
                    }),
                }
            }
            other => Err(ConditionError::UnexpectedToken {
                found: other.to_string(),
                offset,
            }),
        }
    }
}
