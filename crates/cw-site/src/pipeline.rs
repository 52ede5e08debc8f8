//! Per-page stage chain.

use crate::context::PageContext;
use crate::error::PageError;
use crate::stages::{Aggregate, ExpandDirectives, Render, Renderer, SkipVirtual, Write};

/// What a stage hands to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// Pass the text on to the next stage.
    Continue(String),
    /// End the chain here with this final text. Not an error.
    Stop(String),
}

/// One transformation step.
pub trait Stage: Send + Sync {
    /// Short name used in logs and [`PipelineOutcome::stopped_by`].
    fn name(&self) -> &'static str;

    /// Transform the page text.
    fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError>;
}

/// Result of running a pipeline on one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    /// Text after the last stage that ran.
    pub text: String,
    /// Stage that ended the chain early, if any.
    pub stopped_by: Option<&'static str>,
}

/// Ordered chain of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default chain: skip virtual nodes, expand directives, aggregate,
    /// render, write.
    #[must_use]
    pub fn standard(
        renderer: Box<dyn Renderer>,
        aggregate_file_name: &str,
        aggregate_separator: &str,
    ) -> Self {
        Self::new()
            .with_stage(SkipVirtual)
            .with_stage(ExpandDirectives)
            .with_stage(Aggregate::new(aggregate_file_name, aggregate_separator))
            .with_stage(Render::new(renderer))
            .with_stage(Write)
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage<S: Stage + 'static>(mut self, stage: S) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether there are no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Fold `text` through every stage until one stops or fails.
    ///
    /// # Errors
    ///
    /// Returns the first stage error; later stages do not run.
    pub fn run(
        &self,
        text: String,
        ctx: &mut PageContext<'_>,
    ) -> Result<PipelineOutcome, PageError> {
        let mut text = text;
        for stage in &self.stages {
            match stage.apply(text, ctx)? {
                StageResult::Continue(next) => text = next,
                StageResult::Stop(last) => {
                    tracing::debug!(url = %ctx.node.url, stage = stage.name(), "Pipeline stopped");
                    return Ok(PipelineOutcome {
                        text: last,
                        stopped_by: Some(stage.name()),
                    });
                }
            }
        }
        Ok(PipelineOutcome {
            text,
            stopped_by: None,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}
