use std::path::Path;

use cw_content::MetaValue;

use crate::context::PageContext;
use crate::error::PageError;
use crate::pipeline::{Stage, StageResult};

/// Front matter key that turns on aggregation for a page's children.
const AGGREGATE_KEY: &str = "aggregate";

/// Combines the children of an `aggregate: true` page into one output file.
///
/// Each child stores its text in the build's sibling barrier at its
/// position. Every child but the last one with a document stops there. The
/// last child waits for its earlier siblings, joins all fragments in
/// manifest order and continues with the combined text, retargeted to
/// `<parent dir>/<file_name>`.
///
/// Outside an orchestrated build there is no barrier and pages pass through
/// unchanged.
pub struct Aggregate {
    file_name: String,
    separator: String,
}

impl Aggregate {
    /// Create the stage.
    #[must_use]
    pub fn new(file_name: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            separator: separator.into(),
        }
    }
}

impl Stage for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError> {
        let Some(parent) = ctx.tree.parent(ctx.node.id) else {
            return Ok(StageResult::Continue(text));
        };
        if !parent.meta(AGGREGATE_KEY).is_some_and(MetaValue::is_true) {
            return Ok(StageResult::Continue(text));
        }
        let Some(siblings) = ctx.siblings() else {
            return Ok(StageResult::Continue(text));
        };

        let position = ctx.node.position;
        siblings.insert_fragment(position, text);
        let last = parent
            .children
            .iter()
            .rposition(|&child| !ctx.tree.node(child).is_virtual());
        if last != Some(position) {
            return Ok(StageResult::Stop(String::new()));
        }

        ctx.wait_for_preceding_siblings()?;
        let (combined, fragments) = siblings.join_fragments(&self.separator);
        let parent_dir = parent
            .relative_output_path
            .parent()
            .unwrap_or(Path::new(""));
        ctx.output_path = parent_dir.join(&self.file_name);
        ctx.tokens.insert("title", parent.title.as_str());
        ctx.tokens.insert("url", parent.url.as_str());
        tracing::debug!(
            parent = %parent.url,
            fragments,
            "Aggregated sibling pages"
        );
        Ok(StageResult::Continue(combined))
    }
}
