//! Extensions available to every build.
//!
//! | Directive                        | Output                               |
//! |----------------------------------|--------------------------------------|
//! | `@Title()`                       | page title                           |
//! | `@Url()`                         | page URL                             |
//! | `@Link(href)`, `@Link(href, text)` | Markdown link                      |
//! | `@Image(src)`, `@Image(src, width)` | `<img>` element                   |
//! | `@Include(path)`                 | file contents, relative to the page  |
//! | `@Quiz(question, answers)`       | multiple choice block                |

use std::fmt::Write;

use serde::Deserialize;

use crate::binder::BoundArguments;
use crate::context::ExtensionContext;
use crate::error::ExtensionError;
use crate::registry::{Extension, ExtensionRegistry, Invoke};
use crate::schema::{ParamType, RecordSchema, Signature};

/// Register all built-in extensions.
pub fn register_builtins(registry: &mut ExtensionRegistry) {
    registry.register_extension(Title);
    registry.register_extension(Url);
    registry.register_extension(Link);
    registry.register_extension(Image);
    registry.register_extension(Include);
    registry.register_extension(Quiz);
}

/// Escape text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// `@Title()`
pub struct Title;

impl Invoke for Title {
    fn invoke(
        &self,
        _: &BoundArguments,
        ctx: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        Ok(ctx.page_title.to_owned())
    }
}

impl Extension for Title {
    fn name(&self) -> &str {
        "Title"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::empty()]
    }
}

/// `@Url()`
pub struct Url;

impl Invoke for Url {
    fn invoke(
        &self,
        _: &BoundArguments,
        ctx: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        Ok(ctx.page_url.to_owned())
    }
}

impl Extension for Url {
    fn name(&self) -> &str {
        "Url"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::empty()]
    }
}

/// `@Link(href)` or `@Link(href, text)`.
///
/// Without text the href is used as the link text.
pub struct Link;

impl Invoke for Link {
    fn invoke(
        &self,
        args: &BoundArguments,
        _: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        let href = args.string(0)?;
        let text = if args.len() > 1 {
            args.string(1)?
        } else {
            href
        };
        Ok(format!("[{text}]({href})"))
    }
}

impl Extension for Link {
    fn name(&self) -> &str {
        "Link"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::empty().param("href", ParamType::String),
            Signature::empty()
                .param("href", ParamType::String)
                .param("text", ParamType::String),
        ]
    }
}

/// `@Image(src)` or `@Image(src, width)` with width in pixels.
pub struct Image;

impl Invoke for Image {
    fn invoke(
        &self,
        args: &BoundArguments,
        _: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        let src = escape_html(args.string(0)?);
        if args.len() == 1 {
            return Ok(format!(r#"<img src="{src}">"#));
        }
        let width = args.float(1)?;
        if width <= 0.0 {
            return Err(ExtensionError::new(format!(
                "width must be positive, got {width}"
            )));
        }
        Ok(format!(r#"<img src="{src}" width="{width}">"#))
    }
}

impl Extension for Image {
    fn name(&self) -> &str {
        "Image"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::empty().param("src", ParamType::String),
            Signature::empty()
                .param("src", ParamType::String)
                .param("width", ParamType::Float),
        ]
    }
}

/// `@Include(path)`: contents of a file next to the page.
///
/// Paths resolving outside the page's directory are refused.
pub struct Include;

impl Invoke for Include {
    fn invoke(
        &self,
        args: &BoundArguments,
        ctx: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        let relative = args.string(0)?;
        let path = ctx.resolve_path_safe(relative).ok_or_else(|| {
            ExtensionError::new(format!(
                "cannot include `{relative}`: not found under {}",
                ctx.base_dir.display()
            ))
        })?;
        std::fs::read_to_string(&path).map_err(|e| {
            ExtensionError::new(format!("cannot include `{}`: {e}", path.display()))
        })
    }
}

impl Extension for Include {
    fn name(&self) -> &str {
        "Include"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::empty().param("path", ParamType::String)]
    }
}

/// `@Quiz(question, [{text: '...', correct: true}, ...])`
pub struct Quiz;

#[derive(Debug, Deserialize)]
struct Answer {
    text: String,
    #[serde(default)]
    correct: bool,
}

impl Quiz {
    fn answer_schema() -> ParamType {
        ParamType::record(
            RecordSchema::new("Answer")
                .field("text", ParamType::String)
                .optional("correct", ParamType::Bool),
        )
    }
}

impl Invoke for Quiz {
    fn invoke(
        &self,
        args: &BoundArguments,
        ctx: &ExtensionContext<'_>,
    ) -> Result<String, ExtensionError> {
        let question = args.string(0)?;
        let answers: Vec<Answer> = args.deserialize(1)?;
        if answers.is_empty() {
            return Err(ExtensionError::new("a quiz needs at least one answer"));
        }
        if !answers.iter().any(|a| a.correct) {
            return Err(ExtensionError::new("a quiz needs at least one correct answer"));
        }

        let mut html = String::from(r#"<div class="quiz">"#);
        let _ = write!(html, "\n<p>{}</p>\n<ul>", escape_html(question));
        for (i, answer) in answers.iter().enumerate() {
            let _ = write!(
                html,
                "\n<li><label><input type=\"radio\" name=\"quiz-{}\" value=\"{i}\" data-correct=\"{}\"> {}</label></li>",
                ctx.line,
                answer.correct,
                escape_html(&answer.text)
            );
        }
        html.push_str("\n</ul>\n</div>");
        Ok(html)
    }
}

impl Extension for Quiz {
    fn name(&self) -> &str {
        "Quiz"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::empty()
                .param("question", ParamType::String)
                .param("answers", ParamType::array_of(Self::answer_schema())),
        ]
    }
}
