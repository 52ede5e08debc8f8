use std::fs;

use crate::context::PageContext;
use crate::error::PageError;
use crate::pipeline::{Stage, StageResult};

/// Writes the page text to its output file and keeps it in the node's tag.
pub struct Write;

impl Stage for Write {
    fn name(&self) -> &'static str {
        "write"
    }

    fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError> {
        let path = ctx.output_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &text).map_err(|source| PageError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "Wrote page");

        ctx.node.tag().rendered = Some(text.clone());
        Ok(StageResult::Continue(text))
    }
}
