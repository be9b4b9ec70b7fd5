//! Conversion of textual dimension descriptions into the abstract model.
//!
//! The grammar is one function-call-like expression per dimension, the way
//! Orion-style space files spell them:
//!
//! ```text
//! uniform(0, 1, discrete=True)
//! loguniform(1, 2, quantization=0.01)
//! normal(0, 1)            gaussian(1, 1)
//! choices(["a", "b"])     choices({"a": 0.2, "b": 0.8})
//! fidelity(1, 300, 4)
//! ```
//!
//! Literals follow Python conventions: single- or double-quoted strings and
//! capitalized booleans are accepted alongside their lowercase forms.
//!
//! A failing entry aborts the whole conversion with [`Error::Parse`] naming
//! the entry; no partially-built space escapes.

use crate::dimension::Dimension;
use crate::error::{Error, Result};
use crate::space::Space;
use crate::value::Value;

/// Converts a mapping of dimension name to textual description into a
/// populated [`Space`] with no backend bound.
///
/// ```
/// use searchspace::convert_space;
///
/// let space = convert_space([
///     ("uni", "uniform(0, 1, discrete=True)"),
///     ("cat", "choices([\"a\", \"b\"])"),
///     ("fid", "fidelity(1, 300, 4)"),
/// ])
/// .unwrap();
/// assert_eq!(space.names(), vec!["uni", "cat", "fid"]);
/// ```
///
/// # Errors
///
/// [`Error::Parse`] naming the first offending entry; the dimension
/// constructors' own configuration errors (bad bounds, empty choices, ...)
/// pass through unchanged.
pub fn convert_space<I, K, V>(entries: I) -> Result<Space>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let space = Space::new();
    for (name, text) in entries {
        let dim = parse_dimension(name.as_ref(), text.as_ref())?;
        space.insert_dimension(dim)?;
    }
    Ok(space)
}

/// Parses a single textual dimension description.
pub(crate) fn parse_dimension(name: &str, text: &str) -> Result<Dimension> {
    let tokens = tokenize(text).map_err(|reason| parse_err(name, reason))?;
    let mut parser = Parser { tokens, pos: 0 };
    let (func, positional, keywords) = parser
        .parse_call()
        .map_err(|reason| parse_err(name, reason))?;
    build(name, &func, positional, keywords)
}

fn parse_err(entry: &str, reason: impl Into<String>) -> Error {
    Error::Parse {
        entry: entry.to_owned(),
        reason: reason.into(),
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Assign,
}

fn tokenize(text: &str) -> core::result::Result<Vec<Token>, String> {
    let bytes = text.as_bytes();
    let mut idx = 0usize;
    let mut tokens = Vec::new();
    while idx < bytes.len() {
        let b = bytes[idx];
        if b.is_ascii_whitespace() {
            idx += 1;
            continue;
        }
        match b {
            b'(' => {
                tokens.push(Token::LParen);
                idx += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                idx += 1;
            }
            b'[' => {
                tokens.push(Token::LBracket);
                idx += 1;
            }
            b']' => {
                tokens.push(Token::RBracket);
                idx += 1;
            }
            b'{' => {
                tokens.push(Token::LBrace);
                idx += 1;
            }
            b'}' => {
                tokens.push(Token::RBrace);
                idx += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                idx += 1;
            }
            b':' => {
                tokens.push(Token::Colon);
                idx += 1;
            }
            b'=' => {
                tokens.push(Token::Assign);
                idx += 1;
            }
            b'\'' | b'"' => {
                let quote = b;
                let start = idx + 1;
                idx = start;
                while idx < bytes.len() && bytes[idx] != quote {
                    idx += 1;
                }
                if idx >= bytes.len() {
                    return Err("unterminated string literal".to_owned());
                }
                tokens.push(Token::Str(text[start..idx].to_owned()));
                idx += 1;
            }
            _ if b.is_ascii_digit() || b == b'-' || b == b'.' => {
                let start = idx;
                idx += 1;
                while idx < bytes.len()
                    && (bytes[idx].is_ascii_digit()
                        || matches!(bytes[idx], b'.' | b'e' | b'E' | b'+' | b'-'))
                {
                    if matches!(bytes[idx], b'+' | b'-')
                        && !matches!(bytes[idx - 1], b'e' | b'E')
                    {
                        break;
                    }
                    idx += 1;
                }
                let raw = &text[start..idx];
                let is_float = raw.contains(['.', 'e', 'E']);
                if is_float {
                    let value = raw
                        .parse::<f64>()
                        .map_err(|e| format!("invalid numeric literal '{raw}': {e}"))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = raw
                        .parse::<i64>()
                        .map_err(|e| format!("invalid integer literal '{raw}': {e}"))?;
                    tokens.push(Token::Int(value));
                }
            }
            _ if b.is_ascii_alphabetic() || b == b'_' => {
                let start = idx;
                idx += 1;
                while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_')
                {
                    idx += 1;
                }
                tokens.push(Token::Ident(text[start..idx].to_owned()));
            }
            _ => return Err(format!("unsupported character '{}'", b as char)),
        }
    }
    if tokens.is_empty() {
        return Err("empty dimension description".to_owned());
    }
    Ok(tokens)
}

/// A parsed Python-style literal.
#[derive(Clone, Debug, PartialEq)]
enum Lit {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Lit>),
    Dict(Vec<(String, Lit)>),
}

impl Lit {
    fn as_number(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Lit::Int(v) => Some(*v as f64),
            Lit::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Lit::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Lit::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn as_scalar(&self) -> Option<Value> {
        match self {
            Lit::Int(v) => Some(Value::Int(*v)),
            Lit::Float(v) => Some(Value::Float(*v)),
            Lit::Str(v) => Some(Value::Str(v.clone())),
            Lit::Bool(v) => Some(Value::Bool(*v)),
            Lit::List(_) | Lit::Dict(_) => None,
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> core::result::Result<Token, String> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of input".to_owned())?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> core::result::Result<(), String> {
        let token = self.bump()?;
        if token == *expected {
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {token:?}"))
        }
    }

    /// Parses `ident '(' args ')'` and requires the input to end there.
    fn parse_call(
        &mut self,
    ) -> core::result::Result<(String, Vec<Lit>, Vec<(String, Lit)>), String> {
        let func = match self.bump()? {
            Token::Ident(name) => name,
            other => return Err(format!("expected a function name, found {other:?}")),
        };
        self.expect(&Token::LParen)?;

        let mut positional = Vec::new();
        let mut keywords: Vec<(String, Lit)> = Vec::new();
        loop {
            if self.peek() == Some(&Token::RParen) {
                self.pos += 1;
                break;
            }
            let is_keyword = matches!(self.peek(), Some(Token::Ident(ident))
                if !is_bool_ident(ident) && self.peek_at(1) == Some(&Token::Assign));
            if is_keyword {
                let key = match self.bump()? {
                    Token::Ident(key) => key,
                    _ => return Err("expected a keyword name".to_owned()),
                };
                self.expect(&Token::Assign)?;
                let value = self.parse_literal()?;
                keywords.push((key, value));
            } else {
                if !keywords.is_empty() {
                    return Err("positional argument after keyword argument".to_owned());
                }
                positional.push(self.parse_literal()?);
            }
            match self.bump()? {
                Token::Comma => {}
                Token::RParen => break,
                other => return Err(format!("expected ',' or ')', found {other:?}")),
            }
        }
        if self.pos != self.tokens.len() {
            return Err("trailing input after the closing parenthesis".to_owned());
        }
        Ok((func, positional, keywords))
    }

    fn parse_literal(&mut self) -> core::result::Result<Lit, String> {
        match self.bump()? {
            Token::Int(v) => Ok(Lit::Int(v)),
            Token::Float(v) => Ok(Lit::Float(v)),
            Token::Str(v) => Ok(Lit::Str(v)),
            Token::Ident(ident) => match ident.as_str() {
                "True" | "true" => Ok(Lit::Bool(true)),
                "False" | "false" => Ok(Lit::Bool(false)),
                other => Err(format!("unexpected identifier '{other}'")),
            },
            Token::LBracket => {
                let mut items = Vec::new();
                loop {
                    if self.peek() == Some(&Token::RBracket) {
                        self.pos += 1;
                        break;
                    }
                    items.push(self.parse_literal()?);
                    match self.bump()? {
                        Token::Comma => {}
                        Token::RBracket => break,
                        other => return Err(format!("expected ',' or ']', found {other:?}")),
                    }
                }
                Ok(Lit::List(items))
            }
            Token::LBrace => {
                let mut pairs = Vec::new();
                loop {
                    if self.peek() == Some(&Token::RBrace) {
                        self.pos += 1;
                        break;
                    }
                    let key = match self.bump()? {
                        Token::Str(key) => key,
                        other => return Err(format!("expected a string key, found {other:?}")),
                    };
                    self.expect(&Token::Colon)?;
                    let value = self.parse_literal()?;
                    pairs.push((key, value));
                    match self.bump()? {
                        Token::Comma => {}
                        Token::RBrace => break,
                        other => return Err(format!("expected ',' or '}}', found {other:?}")),
                    }
                }
                Ok(Lit::Dict(pairs))
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

fn is_bool_ident(ident: &str) -> bool {
    matches!(ident, "True" | "true" | "False" | "false")
}

/// Interprets a parsed call as a dimension.
///
/// Grammar-shape problems come back as [`Error::Parse`]; argument-value
/// problems surface as the dimension constructors' own configuration errors.
fn build(
    name: &str,
    func: &str,
    positional: Vec<Lit>,
    keywords: Vec<(String, Lit)>,
) -> Result<Dimension> {
    match func {
        "uniform" | "loguniform" => {
            let (low, high) = two_numbers(name, func, &positional)?;
            let mut dim = if func == "loguniform" {
                Dimension::loguniform(name, low, high)?
            } else {
                Dimension::uniform(name, low, high)?
            };
            apply_flags(name, &mut dim, keywords)?;
            Ok(dim)
        }
        "normal" | "gaussian" => {
            let (loc, scale) = two_numbers(name, func, &positional)?;
            let mut dim = Dimension::normal(name, loc, scale)?;
            apply_flags(name, &mut dim, keywords)?;
            Ok(dim)
        }
        "choices" => {
            if !keywords.is_empty() {
                return Err(parse_err(name, "choices takes no keyword arguments"));
            }
            let [arg] = positional.as_slice() else {
                return Err(parse_err(name, "choices takes exactly one argument"));
            };
            let choices = match arg {
                Lit::List(items) => items
                    .iter()
                    .map(|item| {
                        item.as_scalar()
                            .map(|v| (v, 1.0))
                            .ok_or_else(|| parse_err(name, "choice labels must be scalars"))
                    })
                    .collect::<Result<Vec<_>>>()?,
                Lit::Dict(pairs) => pairs
                    .iter()
                    .map(|(label, weight)| {
                        weight
                            .as_number()
                            .map(|w| (Value::Str(label.clone()), w))
                            .ok_or_else(|| parse_err(name, "choice weights must be numbers"))
                    })
                    .collect::<Result<Vec<_>>>()?,
                _ => {
                    return Err(parse_err(name, "choices takes a list or a mapping"));
                }
            };
            Ok(Dimension::categorical(name, choices)?)
        }
        "fidelity" => {
            if !keywords.is_empty() {
                return Err(parse_err(name, "fidelity takes no keyword arguments"));
            }
            let [low, high, base] = positional.as_slice() else {
                return Err(parse_err(name, "fidelity takes exactly (low, high, base)"));
            };
            let (Some(low), Some(high), Some(base)) =
                (low.as_int(), high.as_int(), base.as_int())
            else {
                return Err(parse_err(name, "fidelity arguments must be integers"));
            };
            Ok(Dimension::fidelity(name, low, high, base)?)
        }
        other => Err(parse_err(
            name,
            format!("unknown dimension function '{other}'"),
        )),
    }
}

fn two_numbers(name: &str, func: &str, positional: &[Lit]) -> Result<(f64, f64)> {
    let [a, b] = positional else {
        return Err(parse_err(
            name,
            format!("{func} takes exactly two positional arguments"),
        ));
    };
    let (Some(a), Some(b)) = (a.as_number(), b.as_number()) else {
        return Err(parse_err(
            name,
            format!("{func} arguments must be numbers"),
        ));
    };
    Ok((a, b))
}

fn apply_flags(name: &str, dim: &mut Dimension, keywords: Vec<(String, Lit)>) -> Result<()> {
    for (key, lit) in keywords {
        match key.as_str() {
            "discrete" => {
                let flag = lit
                    .as_bool()
                    .ok_or_else(|| parse_err(name, "discrete must be a boolean"))?;
                if flag {
                    dim.set_discrete()?;
                }
            }
            "log" => {
                let flag = lit
                    .as_bool()
                    .ok_or_else(|| parse_err(name, "log must be a boolean"))?;
                if flag {
                    dim.set_log()?;
                }
            }
            "quantization" => {
                let q = lit
                    .as_number()
                    .ok_or_else(|| parse_err(name, "quantization must be a number"))?;
                dim.set_quantization(q)?;
            }
            other => {
                return Err(parse_err(name, format!("unknown keyword '{other}'")));
            }
        }
    }
    Ok(())
}
