use crate::context::PageContext;
use crate::error::PageError;
use crate::pipeline::{Stage, StageResult};

/// Stops the chain for virtual directory nodes.
pub struct SkipVirtual;

impl Stage for SkipVirtual {
    fn name(&self) -> &'static str {
        "skip-virtual"
    }

    fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError> {
        if ctx.node.is_virtual() {
            return Ok(StageResult::Stop(String::new()));
        }
        Ok(StageResult::Continue(text))
    }
}
