//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod extensions;

pub(crate) use build::BuildArgs;
