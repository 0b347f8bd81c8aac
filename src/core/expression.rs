//! # Expression Engine
//!
//! Evaluates the small expression language used by `js:` commands. The command's
//! directory and environment are handed to the evaluator explicitly through an
//! [`ExpressionScope`], so evaluation never touches process-wide state and is safe
//! to run from several worker threads at once.
//!
//! Supported syntax: string (`'..'` or `".."`), number, `true`/`false`/`null`
//! literals; `+ - * / %`; `< <= > >=`; `== != === !==`; `&& || !`; `cond ? a : b`;
//! parentheses; and the built-ins `env(name)`, `cwd()`, `upper(s)`, `lower(s)`,
//! `trim(s)` and `len(s)`.
//!
//! `==` and `!=` compare loosely: a number, a boolean and a numeric string are equal
//! when their numeric values are, and `null` only equals `null`. `===` and `!==` also
//! require the same type.
//!
//! Nesting is capped at [`MAX_NESTING_DEPTH`] levels so a pathological command fails
//! with an error instead of exhausting the worker's stack.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Parentheses, operators, conditionals and call arguments each add a level.
pub const MAX_NESTING_DEPTH: usize = 128;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("Unterminated string literal starting at position {0}")]
    UnterminatedString(usize),
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Operator '{0}' cannot be applied to {1}")]
    InvalidOperand(&'static str, String),
    #[error("Expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// The directory and environment an expression is evaluated in.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionScope<'a> {
    pub directory: &'a Path,
    /// When present, replaces the parent environment entirely.
    pub env: Option<&'a BTreeMap<String, String>>,
}

impl ExpressionScope<'_> {
    fn env_var(&self, name: &str) -> Option<String> {
        match self.env {
            Some(env) => env.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

impl ExprValue {
    fn truthy(&self) -> bool {
        match self {
            Self::Str(s) => !s.is_empty(),
            Self::Num(n) => *n != 0.0 && !n.is_nan(),
            Self::Bool(b) => *b,
            Self::Null => false,
        }
    }

    fn as_num(&self, op: &'static str) -> Result<f64, ExpressionError> {
        match self {
            Self::Num(n) => Ok(*n),
            Self::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Null => Ok(0.0),
            Self::Str(s) if s.trim().is_empty() => Ok(0.0),
            Self::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ExpressionError::InvalidOperand(op, format!("'{}'", s))),
        }
    }

    fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => match (self.as_num("=="), other.as_num("==")) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Num(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{:.0}", n)
            }
            Self::Num(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Null => f.write_str("null"),
        }
    }
}

// --- Tokenizer ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
}

const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "!",
];

fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(&c) = chars.get(pos) {
        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        match c {
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            '?' => tokens.push(Token::Question),
            ':' => tokens.push(Token::Colon),
            '\'' | '"' => {
                let start = pos;
                let mut literal = String::new();
                pos += 1;
                loop {
                    match chars.get(pos) {
                        None => return Err(ExpressionError::UnterminatedString(start)),
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(pos + 1) {
                                literal.push(match escaped {
                                    'n' => '\n',
                                    't' => '\t',
                                    other => other,
                                });
                                pos += 2;
                            } else {
                                return Err(ExpressionError::UnterminatedString(start));
                            }
                        }
                        Some(&q) if q == c => break,
                        Some(&other) => {
                            literal.push(other);
                            pos += 1;
                        }
                    }
                }
                tokens.push(Token::Str(literal));
            }
            d if d.is_ascii_digit() || (d == '.' && chars.get(pos + 1).is_some_and(char::is_ascii_digit)) => {
                let start = pos;
                while chars.get(pos).is_some_and(|ch| ch.is_ascii_digit() || *ch == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::UnexpectedToken(text.clone()))?;
                tokens.push(Token::Num(n));
                continue;
            }
            a if a.is_alphabetic() || a == '_' => {
                let start = pos;
                while chars.get(pos).is_some_and(|ch| ch.is_alphanumeric() || *ch == '_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
                continue;
            }
            _ => {
                let rest: String = chars[pos..].iter().take(3).collect();
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or(ExpressionError::UnexpectedChar(c, pos))?;
                tokens.push(Token::Op(*op));
                pos += op.len();
                continue;
            }
        }
        pos += 1;
    }
    Ok(tokens)
}

// --- Parser ---

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(ExprValue),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ExpressionError> {
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            Some(t) => Err(ExpressionError::UnexpectedToken(format!("{:?}", t))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn peek_op(&self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) => ops.iter().find(|o| *o == op).copied(),
            _ => None,
        }
    }

    fn conditional(&mut self) -> Result<Expr, ExpressionError> {
        self.enter()?;
        let expr = self.conditional_inner();
        self.depth -= 1;
        expr
    }

    fn conditional_inner(&mut self) -> Result<Expr, ExpressionError> {
        let condition = self.binary(0)?;
        if self.peek() == Some(&Token::Question) {
            self.pos += 1;
            let then = self.conditional()?;
            self.expect(&Token::Colon)?;
            let otherwise = self.conditional()?;
            return Ok(Expr::Conditional(
                Box::new(condition),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(condition)
    }

    /// Precedence climbing over the binary operator levels, loosest first.
    fn binary(&mut self, level: usize) -> Result<Expr, ExpressionError> {
        const LEVELS: &[&[&str]] = &[
            &["||"],
            &["&&"],
            &["==", "!=", "===", "!=="],
            &["<", "<=", ">", ">="],
            &["+", "-"],
            &["*", "/", "%"],
        ];
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut left = self.binary(level + 1)?;
        // Each operator in a chain deepens the left-leaning tree by one.
        let depth = self.depth;
        while let Some(op) = self.peek_op(ops) {
            self.pos += 1;
            self.enter()?;
            let right = self.binary(level + 1)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth = depth;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if let Some(op) = self.peek_op(&["!", "-"]) {
            self.pos += 1;
            self.enter()?;
            let operand = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Unary(op, Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Literal(ExprValue::Num(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(ExprValue::Str(s))),
            Some(Token::LParen) => {
                let inner = self.conditional()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Expr::Literal(ExprValue::Bool(true))),
                "false" => Ok(Expr::Literal(ExprValue::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(ExprValue::Null)),
                _ => {
                    self.expect(&Token::LParen)?;
                    let mut args = Vec::new();
                    if self.peek() != Some(&Token::RParen) {
                        loop {
                            args.push(self.conditional()?);
                            if self.peek() == Some(&Token::Comma) {
                                self.pos += 1;
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen)?;
                    Ok(Expr::Call(name, args))
                }
            },
            Some(t) => Err(ExpressionError::UnexpectedToken(format!("{:?}", t))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}

fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        depth: 0,
    };
    let expr = parser.conditional()?;
    match parser.next() {
        None => Ok(expr),
        Some(t) => Err(ExpressionError::UnexpectedToken(format!("{:?}", t))),
    }
}

// --- Evaluator ---

fn eval(expr: &Expr, scope: &ExpressionScope<'_>) -> Result<ExprValue, ExpressionError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Unary("!", inner) => Ok(ExprValue::Bool(!eval(inner, scope)?.truthy())),
        Expr::Unary(op, inner) => Ok(ExprValue::Num(-eval(inner, scope)?.as_num(*op)?)),
        Expr::Conditional(cond, then, otherwise) => {
            if eval(cond, scope)?.truthy() {
                eval(then, scope)
            } else {
                eval(otherwise, scope)
            }
        }
        Expr::Binary("&&", l, r) => {
            let left = eval(l, scope)?;
            if left.truthy() { eval(r, scope) } else { Ok(left) }
        }
        Expr::Binary("||", l, r) => {
            let left = eval(l, scope)?;
            if left.truthy() { Ok(left) } else { eval(r, scope) }
        }
        Expr::Binary(op, l, r) => binary(*op, eval(l, scope)?, eval(r, scope)?),
        Expr::Call(name, args) => call(name, args, scope),
    }
}

fn binary(op: &'static str, left: ExprValue, right: ExprValue) -> Result<ExprValue, ExpressionError> {
    use ExprValue::{Bool, Num, Str};
    let value = match op {
        "+" => match (&left, &right) {
            (Str(_), _) | (_, Str(_)) => Str(format!("{}{}", left, right)),
            _ => Num(left.as_num(op)? + right.as_num(op)?),
        },
        "-" => Num(left.as_num(op)? - right.as_num(op)?),
        "*" => Num(left.as_num(op)? * right.as_num(op)?),
        "/" | "%" => {
            let divisor = right.as_num(op)?;
            if divisor == 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            let dividend = left.as_num(op)?;
            Num(if op == "/" { dividend / divisor } else { dividend % divisor })
        }
        "==" => Bool(left.loosely_equals(&right)),
        "!=" => Bool(!left.loosely_equals(&right)),
        "===" => Bool(left == right),
        "!==" => Bool(left != right),
        "<" | "<=" | ">" | ">=" => {
            let ordering = match (&left, &right) {
                (Str(a), Str(b)) => a.partial_cmp(b),
                _ => left.as_num(op)?.partial_cmp(&right.as_num(op)?),
            };
            Bool(match (op, ordering) {
                (_, None) => false,
                ("<", Some(o)) => o.is_lt(),
                ("<=", Some(o)) => o.is_le(),
                (">", Some(o)) => o.is_gt(),
                (_, Some(o)) => o.is_ge(),
            })
        }
        _ => return Err(ExpressionError::UnexpectedToken(op.to_string())),
    };
    Ok(value)
}

fn call(name: &str, args: &[Expr], scope: &ExpressionScope<'_>) -> Result<ExprValue, ExpressionError> {
    let expected = match name {
        "cwd" => 0,
        "env" | "upper" | "lower" | "trim" | "len" => 1,
        _ => return Err(ExpressionError::UnknownFunction(name.to_string())),
    };
    if args.len() != expected {
        return Err(ExpressionError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    let values = args
        .iter()
        .map(|a| eval(a, scope))
        .collect::<Result<Vec<_>, _>>()?;
    let arg = values.first().map(ToString::to_string).unwrap_or_default();

    Ok(match name {
        "cwd" => ExprValue::Str(scope.directory.to_string_lossy().to_string()),
        "env" => scope.env_var(&arg).map_or(ExprValue::Null, ExprValue::Str),
        "upper" => ExprValue::Str(arg.to_uppercase()),
        "lower" => ExprValue::Str(arg.to_lowercase()),
        "trim" => ExprValue::Str(arg.trim().to_string()),
        _ => ExprValue::Num(arg.chars().count() as f64),
    })
}

/// Parses and evaluates `source` within `scope`.
pub fn evaluate(source: &str, scope: &ExpressionScope<'_>) -> Result<ExprValue, ExpressionError> {
    let expr = parse(source)?;
    log::trace!("Parsed expression '{}' into {:?}", source, expr);
    eval(&expr, scope)
}
