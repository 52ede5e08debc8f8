//! Built-in pipeline stages.
//!
//! [`Pipeline::standard`](crate::Pipeline::standard) chains them as:
//!
//! 1. [`SkipVirtual`]: stop for directory nodes without a document
//! 2. [`ExpandDirectives`]: replace `@Name(args)` calls
//! 3. [`Aggregate`]: combine children of `aggregate: true` pages
//! 4. [`Render`]: hand the text to a [`Renderer`]
//! 5. [`Write`]: write the output file

mod aggregate;
mod expand;
mod render;
mod skip;
mod write;

pub use aggregate::Aggregate;
pub use expand::ExpandDirectives;
pub use render::{HtmlRenderer, PlainRenderer, Render, RenderError, Renderer};
pub use skip::SkipVirtual;
pub use write::Write;
