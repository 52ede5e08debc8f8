//! CLI error types.

use cw_config::ConfigError;
use cw_site::BuildError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Build(#[from] BuildError),

    #[error("build cancelled after {processed} of {total} pages")]
    Cancelled { processed: usize, total: usize },
}
