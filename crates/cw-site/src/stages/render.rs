//! Rendering collaborators.

use cw_cache::CacheBucketExt;
use cw_directive::escape_html;
use pulldown_cmark::{Options, Parser, html};
use sha2::{Digest, Sha256};

use crate::context::PageContext;
use crate::error::PageError;
use crate::pipeline::{Stage, StageResult};

/// Cache bucket for rendered pages.
const PAGES_BUCKET: &str = "pages";

/// Error returned when a renderer fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("render failed: {0}")]
pub struct RenderError(String);

impl RenderError {
    /// Create an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Turns a page's final text plus its tokens into output.
pub trait Renderer: Send + Sync {
    /// Render `text` for the page in `ctx`.
    fn render(&self, text: &str, ctx: &PageContext<'_>) -> Result<String, RenderError>;
}

/// Writes text unchanged.
#[derive(Debug, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(&self, text: &str, _ctx: &PageContext<'_>) -> Result<String, RenderError> {
        Ok(text.to_owned())
    }
}

/// Markdown to a standalone HTML document.
///
/// Results are cached in the `pages` bucket keyed by output path, with a
/// SHA-256 of title and text as etag, so unchanged pages skip rendering in
/// later builds of the same session.
#[derive(Debug)]
pub struct HtmlRenderer {
    gfm: bool,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self { gfm: true }
    }
}

impl HtmlRenderer {
    /// Create a renderer with GitHub Flavored Markdown enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable GitHub Flavored Markdown extensions.
    ///
    /// When enabled, supports tables, strikethrough and task lists.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    fn render_document(&self, text: &str, title: &str) -> String {
        let mut body = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut body, Parser::new_ext(text, self.parser_options()));
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
            escape_html(title)
        )
    }
}

fn content_hash(title: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

impl Renderer for HtmlRenderer {
    fn render(&self, text: &str, ctx: &PageContext<'_>) -> Result<String, RenderError> {
        let title = ctx.tokens.get_str("title").unwrap_or_default();
        let key = ctx.output_path.to_string_lossy();
        let etag = content_hash(title, text);
        let bucket = ctx.cache.bucket(PAGES_BUCKET);

        if let Some(html) = bucket.get_string(&key, &etag) {
            tracing::debug!(key = %key, "Page cache hit");
            return Ok(html);
        }

        let html = self.render_document(text, title);
        bucket.set_string(&key, &etag, &html);
        Ok(html)
    }
}

/// Runs a [`Renderer`] on the page text.
pub struct Render {
    renderer: Box<dyn Renderer>,
}

impl Render {
    /// Create the stage.
    #[must_use]
    pub fn new(renderer: Box<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

impl Stage for Render {
    fn name(&self) -> &'static str {
        "render"
    }

    fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError> {
        let output = self.renderer.render(&text, ctx)?;
        Ok(StageResult::Continue(output))
    }
}
