//! Directive expansion: parse, bind, invoke, splice.

use crate::context::ExtensionContext;
use crate::error::DirectiveError;
use crate::parser::{Segment, parse};
use crate::registry::ExtensionRegistry;

/// Replace every directive call in `source` with its extension's output.
///
/// Literal text (with `@@` collapsed to `@` and trailing `//` comments after
/// calls removed) is kept as is. Expansion stops at the first failing call.
///
/// # Errors
///
/// Returns the first [`DirectiveError`] met while parsing or invoking.
pub fn expand(
    source: &str,
    registry: &ExtensionRegistry,
    ctx: &ExtensionContext<'_>,
) -> Result<String, DirectiveError> {
    let segments = parse(source)?;
    let mut output = String::with_capacity(source.len());
    let mut calls = 0usize;

    for segment in segments {
        match segment {
            Segment::Literal(text) => output.push_str(&text),
            Segment::Invocation(invocation) => {
                let text = registry.invoke(&invocation, ctx)?;
                output.push_str(&text);
                calls += 1;
            }
        }
    }

    if calls > 0 {
        tracing::debug!(calls, page = ctx.page_url, "Expanded directives");
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::binder::BoundArguments;
    use crate::error::ExtensionError;
    use crate::schema::{ParamType, Signature};

    fn ctx() -> ExtensionContext<'static> {
        ExtensionContext::new("Intro", "/intro", Path::new("."))
    }

    fn now(_: &BoundArguments, _: &ExtensionContext<'_>) -> Result<String, ExtensionError> {
        Ok("12:00".to_owned())
    }

    fn shout(args: &BoundArguments, _: &ExtensionContext<'_>) -> Result<String, ExtensionError> {
        Ok(args.string(0)?.to_uppercase())
    }

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register("Now", vec![Signature::empty()], now);
        registry.register(
            "Shout",
            vec![Signature::empty().param("text", ParamType::String)],
            shout,
        );
        registry
    }

    #[test]
    fn test_no_argument_call_replaced_in_place() {
        let output = expand("It is @Now() already.", &registry(), &ctx()).unwrap();
        assert_eq!(output, "It is 12:00 already.");
    }

    #[test]
    fn test_escaped_marker_round_trip() {
        let source = "mail me @@home, or @@Now() maybe";
        let output = expand(source, &registry(), &ctx()).unwrap();
        assert_eq!(output, "mail me @home, or @Now() maybe");
    }

    #[test]
    fn test_multiline_call_expands_like_single_line() {
        let single = expand("a @Shout('hi') b", &registry(), &ctx()).unwrap();
        let multi = expand("a @Shout(\n  'hi'\n) b", &registry(), &ctx()).unwrap();
        assert_eq!(single, multi);
        assert_eq!(single, "a HI b");
    }

    #[test]
    fn test_comment_after_call_is_dropped() {
        let output = expand("@Now() // clock\nnext", &registry(), &ctx()).unwrap();
        assert_eq!(output, "12:00\nnext");
    }

    #[test]
    fn test_first_error_stops_expansion() {
        let err = expand("@Now() @Missing() @Shout(1)", &registry(), &ctx()).unwrap_err();
        assert!(matches!(err, DirectiveError::UnknownExtension { .. }));
    }

    #[test]
    fn test_text_without_directives_unchanged() {
        let source = "plain text, email a@b.c, (parens)";
        assert_eq!(expand(source, &registry(), &ctx()).unwrap(), source);
    }
}
