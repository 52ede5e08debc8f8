//! Argument list grammar.
//!
//! Parses the text between a directive's parentheses into [`Value`]s:
//!
//! ```text
//! arguments := [ value { "," value } [ "," ] ]
//! value     := string | number | bool | object | array
//! string    := "'" chars "'" | '"' chars '"'
//! number    := [ "+" | "-" ] digits [ "." digits ]
//! bool      := "true" | "false"              (any case)
//! object    := "{" [ key ":" value { "," key ":" value } [ "," ] ] "}"
//! key       := identifier | string
//! array     := "[" [ value { "," value } [ "," ] ] "]"   (one element kind)
//! ```
//!
//! Whitespace, including line breaks, is insignificant between tokens.
//! Line breaks inside strings are kept verbatim.

use std::fmt;

use crate::parser::ParseError;
use crate::value::{Object, Value, ValueKind};

/// Parse a raw argument list.
///
/// `line` is the physical line of the directive's opening parenthesis; it
/// is advanced across line breaks so errors point at the offending line.
pub(crate) fn parse_arguments(raw: &str, line: usize) -> Result<Vec<Value>, ParseError> {
    LiteralParser::new(raw, line).sequence(None)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str, line: usize) -> Self {
        Self { src, pos: 0, line }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, message)
    }

    /// Comma-separated values up to `close`, or to end of input when `close`
    /// is `None`. Consumes the closing character.
    fn sequence(&mut self, close: Option<char>) -> Result<Vec<Value>, ParseError> {
        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            match (self.peek(), close) {
                (None, None) => return Ok(values),
                (None, Some(c)) => {
                    return Err(self.error(format!("unterminated list: expected `{c}`")));
                }
                (Some(c), Some(expected)) if c == expected => {
                    self.bump();
                    return Ok(values);
                }
                _ => {}
            }

            values.push(self.value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                None if close.is_none() => return Ok(values),
                Some(c) if Some(c) == close => {}
                None => {
                    return Err(self.error(format!(
                        "unterminated list: expected `{}`",
                        close.unwrap_or(')')
                    )));
                }
                Some(c) => return Err(self.error(format!("expected `,` but found `{c}`"))),
            }
        }
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => self.string(quote).map(Value::String),
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => Err(self.error(format!("unexpected character `{c}`"))),
            None => Err(self.error("expected a value")),
        }
    }

    fn string(&mut self, quote: char) -> Result<String, ParseError> {
        let start_line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(ParseError::new(start_line, "unterminated string literal"));
                }
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => {
                        return Err(ParseError::new(start_line, "unterminated string literal"));
                    }
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        let int_digits = self.digits();
        let mut frac_digits = None;
        if self.peek() == Some('.') {
            self.bump();
            frac_digits = Some(self.digits());
        }

        let text = &self.src[start..self.pos];
        if int_digits == 0 && frac_digits.unwrap_or(0) == 0 {
            return Err(self.error(format!("invalid number `{text}`")));
        }
        if let Some(c) = self.peek()
            && !(c.is_whitespace() || matches!(c, ',' | ']' | '}'))
        {
            return Err(self.error(format!("unexpected `{c}` after number `{text}`")));
        }

        if frac_digits.is_some() {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|e| self.error(format!("invalid float `{text}`: {e}")))
        } else {
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| self.error(format!("invalid integer `{text}`: {e}")))
        }
    }

    fn digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }
        count
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn word(&mut self) -> Result<Value, ParseError> {
        let word = self.identifier();
        if word.eq_ignore_ascii_case("true") {
            Ok(Value::Bool(true))
        } else if word.eq_ignore_ascii_case("false") {
            Ok(Value::Bool(false))
        } else {
            Err(self.error(format!(
                "unexpected identifier `{word}` (strings must be quoted)"
            )))
        }
    }

    fn object(&mut self) -> Result<Value, ParseError> {
        self.bump();
        let mut object = Object::new();
        loop {
            self.skip_whitespace();
            let key = match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(object));
                }
                Some(quote @ ('\'' | '"')) => self.string(quote)?,
                Some(c) if c.is_alphanumeric() || c == '_' => self.identifier().to_owned(),
                Some(c) => return Err(self.error(format!("expected object key, found `{c}`"))),
                None => return Err(self.error("unterminated object: expected `}`")),
            };

            self.skip_whitespace();
            if self.bump() != Some(':') {
                return Err(self.error(format!("expected `:` after key `{key}`")));
            }
            self.skip_whitespace();
            let value = self.value()?;
            if object.contains_key(&key) {
                return Err(self.error(format!("duplicate key `{key}` in object")));
            }
            object.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                Some(c) => return Err(self.error(format!("expected `,` or `}}` but found `{c}`"))),
                None => return Err(self.error("unterminated object: expected `}`")),
            }
        }
    }

    fn array(&mut self) -> Result<Value, ParseError> {
        let start_line = self.line;
        self.bump();
        let items = self.sequence(Some(']'))?;

        if let Some(first) = items.first() {
            let shape = Shape::of(first);
            if let Some(other) = items.iter().map(Shape::of).find(|s| !s.matches(&shape)) {
                return Err(ParseError::new(
                    start_line,
                    format!("mixed-type array: expected {shape} elements, found {other}"),
                ));
            }
        }

        Ok(Value::Array(items))
    }
}

/// Structure of a value for array uniformity: kinds all the way down
/// through nested arrays. Objects are compared by kind only; the binder
/// checks their fields against the record schema.
#[derive(Debug)]
enum Shape {
    Scalar(ValueKind),
    /// Element shape, or `None` for an empty array.
    Array(Option<Box<Shape>>),
}

impl Shape {
    fn of(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::Array(items.first().map(|item| Box::new(Self::of(item)))),
            other => Self::Scalar(other.kind()),
        }
    }

    /// Empty arrays match any array shape.
    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Array(None), Self::Array(_)) | (Self::Array(_), Self::Array(None)) => true,
            (Self::Array(Some(a)), Self::Array(Some(b))) => a.matches(b),
            _ => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Array(Some(element)) => write!(f, "Array<{element}>"),
            Self::Array(None) => f.write_str("Array"),
        }
    }
}
