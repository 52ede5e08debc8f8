//! Page pipeline and build orchestration for CW.
//!
//! This crate provides:
//! - [`Pipeline`]: an ordered chain of [`Stage`]s run once per content node
//! - [`stages`]: directive expansion, aggregation, rendering and writing
//! - [`Orchestrator`]: runs the pipeline over a tree on a bounded worker pool
//! - [`BuildSession`]: configuration, tree, registry and cache in one place
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn run() -> Result<(), cw_site::BuildError> {
//! use cw_site::{BuildSession, CancellationToken};
//!
//! let session = BuildSession::initialize(None)?
//!     .with_progress(|done, total| eprintln!("{done}/{total}"));
//! let outcome = session.build_site("site", CancellationToken::new()).await?;
//! println!("{} pages", outcome.stats().processed);
//! # Ok(())
//! # }
//! ```

mod barrier;
mod context;
mod error;
mod orchestrator;
mod pipeline;
mod session;
pub mod stages;

pub use barrier::{ArrivalGuard, FanIn, SiblingFailed};
pub use context::{PageContext, TokenValue, Tokens};
pub use error::{BuildError, ErrorKind, PageError};
pub use orchestrator::{
    BuildOptions, BuildOutcome, BuildStats, CancellationToken, Orchestrator, ProgressFn,
};
pub use pipeline::{Pipeline, PipelineOutcome, Stage, StageResult};
pub use session::BuildSession;
