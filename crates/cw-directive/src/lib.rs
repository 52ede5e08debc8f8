//! Inline directive language for courseware pages.
//!
//! A page body may call named extensions inline:
//!
//! ```text
//! Welcome to @Title()!
//! @Quiz('Pick one', [
//!     {text: 'this', correct: true},
//!     {text: 'that'},
//! ])   // shown after the intro
//! Write @@handle for a literal at-sign.
//! ```
//!
//! Processing happens in four steps:
//!
//! 1. [`parse`] splits text into literal spans and [`Invocation`]s
//! 2. [`ExtensionRegistry::resolve`] finds the extension by name (any case)
//! 3. [`bind`] matches the parsed [`Value`]s against the extension's
//!    declared [`Signature`]s
//! 4. the extension runs and its output replaces the call
//!
//! [`expand`] performs all four for a whole text.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use cw_directive::{ExtensionContext, ExtensionRegistry, expand, register_builtins};
//!
//! let mut registry = ExtensionRegistry::new();
//! register_builtins(&mut registry);
//!
//! let ctx = ExtensionContext::new("Intro", "/intro", Path::new("."));
//! let html = expand("# @Title()\n@@Title() is escaped", &registry, &ctx).unwrap();
//! assert_eq!(html, "# Intro\n@Title() is escaped");
//! ```

mod binder;
mod builtin;
mod context;
mod error;
mod expand;
mod literal;
mod parser;
mod registry;
mod schema;
mod value;

pub use binder::{BindingError, BoundArguments, bind};
pub use builtin::{escape_html, register_builtins};
pub use context::ExtensionContext;
pub use error::{DirectiveError, ExtensionError};
pub use expand::expand;
pub use parser::{Invocation, ParseError, Segment, parse};
pub use registry::{Extension, ExtensionRegistry, Invoke, Registration};
pub use schema::{Field, Param, ParamType, RecordSchema, Signature};
pub use value::{Object, Value, ValueKind};
