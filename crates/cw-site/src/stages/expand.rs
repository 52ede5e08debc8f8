use cw_directive::{ExtensionContext, expand};

use crate::context::PageContext;
use crate::error::PageError;
use crate::pipeline::{Stage, StageResult};

/// Expands directive calls with the build's extension registry.
///
/// Relative paths in extensions resolve against the page's directory.
pub struct ExpandDirectives;

impl Stage for ExpandDirectives {
    fn name(&self) -> &'static str {
        "expand-directives"
    }

    fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError> {
        let node = ctx.node;
        let base_dir = node.source_dir().unwrap_or_else(|| ctx.tree.source_root());
        let mut ext_ctx = ExtensionContext::new(&node.title, &node.url, base_dir);
        if let Some(source) = &node.source_path {
            ext_ctx = ext_ctx.with_source(source);
        }
        let expanded = expand(&text, ctx.registry, &ext_ctx)?;
        Ok(StageResult::Continue(expanded))
    }
}
