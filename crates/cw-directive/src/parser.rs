//! Directive syntax scanning.
//!
//! Splits document text into literal spans and `@Name(args)` invocations:
//!
//! - `@@` is an escaped marker and produces a single literal `@`
//! - `@` not followed by an identifier and `(` is literal text
//! - the argument list runs to the matching `)`, skipping over quoted
//!   strings and nested `(`, `[`, `{`; it may span several lines
//! - `// comment` after a complete invocation on the same line is dropped

use std::ops::Range;

use crate::literal::parse_arguments;
use crate::value::Value;

/// Malformed directive text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line where the problem was detected.
    pub line: usize,
    /// Human-readable description.
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// A parsed `@Name(args)` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Directive name as written; matched case-insensitively.
    pub name: String,
    /// Parsed arguments in order.
    pub args: Vec<Value>,
    /// Raw text between the parentheses.
    pub raw_args: String,
    /// Byte range of the whole call, `@` through `)`.
    pub span: Range<usize>,
    /// 1-based line of the `@` marker.
    pub line: usize,
}

/// A piece of parsed document text.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Text emitted unchanged (escape markers already collapsed).
    Literal(String),
    /// A directive call to be replaced by its extension's output.
    Invocation(Invocation),
}

/// Parse document text into literal and invocation segments, in source order.
///
/// Adjacent literal text is merged into one segment.
///
/// # Errors
///
/// Returns [`ParseError`] for an unterminated string or argument list, a
/// mismatched bracket, or a malformed literal.
pub fn parse(source: &str) -> Result<Vec<Segment>, ParseError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut lines = LineCounter::new(source);
    let mut pos = 0;

    while let Some(offset) = source[pos..].find('@') {
        let at = pos + offset;
        literal.push_str(&source[pos..at]);
        let rest = &source[at + 1..];

        if rest.starts_with('@') {
            literal.push('@');
            pos = at + 2;
            continue;
        }

        let name_len = identifier_len(rest);
        if name_len == 0 || !rest[name_len..].starts_with('(') {
            literal.push('@');
            pos = at + 1;
            continue;
        }

        let line = lines.line_at(at);
        let args_start = at + 1 + name_len + 1;
        let close = find_closing_paren(source, args_start, line)?;
        let raw_args = &source[args_start..close];
        let args = parse_arguments(raw_args, line)?;

        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Invocation(Invocation {
            name: rest[..name_len].to_owned(),
            args,
            raw_args: raw_args.to_owned(),
            span: at..close + 1,
            line,
        }));

        pos = skip_trailing_comment(source, close + 1);
    }

    literal.push_str(&source[pos..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

/// Length in bytes of the identifier at the start of `s` (0 if none).
///
/// Identifiers start with an ASCII letter or `_` and continue with ASCII
/// letters, digits, or `_`.
fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '_'))
        .map_or(s.len(), |(i, _)| i)
}

/// Find the `)` closing the argument list that starts at `start`.
fn find_closing_paren(source: &str, start: usize, line: usize) -> Result<usize, ParseError> {
    let mut stack: Vec<char> = Vec::new();
    let mut current_line = line;
    let mut chars = source[start..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\n' => current_line += 1,
            '\'' | '"' => {
                let string_line = current_line;
                loop {
                    match chars.next() {
                        None => {
                            return Err(ParseError::new(string_line, "unterminated string literal"));
                        }
                        Some((_, '\\')) => {
                            if let Some((_, '\n')) = chars.next() {
                                current_line += 1;
                            }
                        }
                        Some((_, '\n')) => current_line += 1,
                        Some((_, q)) if q == c => break,
                        Some(_) => {}
                    }
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => match stack.pop() {
                None if c == ')' => return Ok(start + i),
                None => {
                    return Err(ParseError::new(
                        current_line,
                        format!("unexpected `{c}` in directive arguments"),
                    ));
                }
                Some(open) if closes(open, c) => {}
                Some(open) => {
                    return Err(ParseError::new(
                        current_line,
                        format!("mismatched `{c}`: expected closing for `{open}`"),
                    ));
                }
            },
            _ => {}
        }
    }

    match stack.last() {
        Some(open) => Err(ParseError::new(
            line,
            format!("unterminated directive: `{open}` is never closed"),
        )),
        None => Err(ParseError::new(line, "unterminated directive: missing `)`")),
    }
}

fn closes(open: char, close: char) -> bool {
    matches!((open, close), ('(', ')') | ('[', ']') | ('{', '}'))
}

/// Skip a `// comment` that follows a directive on the same line.
///
/// Returns the position to resume scanning from. The line break itself is
/// kept so the surrounding text keeps its shape.
fn skip_trailing_comment(source: &str, pos: usize) -> usize {
    let rest = &source[pos..];
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if !trimmed.starts_with("//") {
        return pos;
    }

    let comment_start = pos + (rest.len() - trimmed.len());
    match trimmed.find('\n') {
        Some(nl) if trimmed[..nl].ends_with('\r') => comment_start + nl - 1,
        Some(nl) => comment_start + nl,
        None => source.len(),
    }
}

/// Incremental byte-offset to line-number conversion.
///
/// Offsets passed to [`LineCounter::line_at`] must be non-decreasing.
struct LineCounter<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        self.line += self.source[self.offset..offset].matches('\n').count();
        self.offset = offset;
        self.line
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn literal(text: &str) -> Segment {
        Segment::Literal(text.to_owned())
    }

    fn invocation(segment: &Segment) -> &Invocation {
        match segment {
            Segment::Invocation(invocation) => invocation,
            Segment::Literal(text) => panic!("expected invocation, got literal {text:?}"),
        }
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("hello world").unwrap(), vec![literal("hello world")]);
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_escaped_marker() {
        assert_eq!(
            parse("mail me @@home").unwrap(),
            vec![literal("mail me @home")]
        );
    }

    #[test]
    fn test_escaped_marker_before_call_syntax() {
        assert_eq!(parse("@@Title()").unwrap(), vec![literal("@Title()")]);
    }

    #[test]
    fn test_only_escaped_markers_round_trip() {
        let input = "@@a @@b\n@@@@c";
        let expected = input.replace("@@", "@");
        assert_eq!(parse(input).unwrap(), vec![literal(&expected)]);
    }

    #[test]
    fn test_bare_marker_is_literal() {
        assert_eq!(
            parse("user@example.com costs @ 5 @name").unwrap(),
            vec![literal("user@example.com costs @ 5 @name")]
        );
    }

    #[test]
    fn test_no_argument_call() {
        let segments = parse("Before @Title() after").unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], literal("Before "));
        let call = invocation(&segments[1]);
        assert_eq!(call.name, "Title");
        assert!(call.args.is_empty());
        assert_eq!(call.span, 7..15);
        assert_eq!(segments[2], literal(" after"));
    }

    #[test]
    fn test_call_with_arguments() {
        let segments = parse("@Image('cat.png', 120)").unwrap();
        let call = invocation(&segments[0]);
        assert_eq!(
            call.args,
            vec![Value::String("cat.png".to_owned()), Value::Integer(120)]
        );
        assert_eq!(call.raw_args, "'cat.png', 120");
    }

    #[test]
    fn test_paren_inside_string_does_not_close() {
        let segments = parse("@Note('a) b', 'c(') tail").unwrap();
        let call = invocation(&segments[0]);
        assert_eq!(
            call.args,
            vec![
                Value::String("a) b".to_owned()),
                Value::String("c(".to_owned()),
            ]
        );
        assert_eq!(segments[1], literal(" tail"));
    }

    #[test]
    fn test_three_line_call_matches_single_line() {
        let single = parse("@Image('cat.png', 120)").unwrap();
        let multi = parse("@Image(\n'cat.png', 120\n)").unwrap();
        assert_eq!(invocation(&single[0]).args, invocation(&multi[0]).args);
        assert_eq!(invocation(&single[0]).name, invocation(&multi[0]).name);
    }

    #[test]
    fn test_multiline_string_keeps_line_breaks() {
        let segments = parse("@Note(\"one\ntwo\")").unwrap();
        assert_eq!(
            invocation(&segments[0]).args,
            vec![Value::String("one\ntwo".to_owned())]
        );
    }

    #[test]
    fn test_trailing_comment_dropped() {
        let segments = parse("@Title() // shows the title\nnext line").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1], literal("\nnext line"));
    }

    #[test]
    fn test_trailing_comment_at_end_of_input() {
        let segments = parse("x @Title()   // done").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], literal("x "));
    }

    #[test]
    fn test_trailing_comment_keeps_crlf() {
        let segments = parse("@Title() // c\r\nrest").unwrap();
        assert_eq!(segments[1], literal("\r\nrest"));
    }

    #[test]
    fn test_comment_not_after_call_is_literal() {
        assert_eq!(
            parse("see http://example.com").unwrap(),
            vec![literal("see http://example.com")]
        );
    }

    #[test]
    fn test_line_numbers() {
        let segments = parse("one\ntwo @A()\nthree\n@B(\n1\n)").unwrap();
        let calls: Vec<_> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Invocation(i) => Some(i.line),
                Segment::Literal(_) => None,
            })
            .collect();
        assert_eq!(calls, vec![2, 4]);
    }

    #[test]
    fn test_unterminated_call() {
        let err = parse("text\n@Title(1, 2").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unterminated directive"));
    }

    #[test]
    fn test_unterminated_string_in_call() {
        let err = parse("@Note('open)").unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_unbalanced_bracket() {
        let err = parse("@List([1, 2)").unwrap_err();
        assert!(err.message.contains("mismatched"));
    }

    #[test]
    fn test_unclosed_bracket_at_end() {
        let err = parse("@List([1, 2").unwrap_err();
        assert!(err.message.contains("never closed"));
    }

    #[test]
    fn test_identifier_len() {
        assert_eq!(identifier_len("Title("), 5);
        assert_eq!(identifier_len("_x1 "), 3);
        assert_eq!(identifier_len("1abc"), 0);
        assert_eq!(identifier_len(""), 0);
        assert_eq!(identifier_len("abc"), 3);
    }
}
