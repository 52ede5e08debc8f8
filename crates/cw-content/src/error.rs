//! Content loading errors.

use std::io;
use std::path::PathBuf;

/// Failure while building the content tree.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A path could not be read (including a manifest entry that does not
    /// exist).
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A content directory has no manifest.
    #[error("missing manifest {}", path.display())]
    MissingManifest { path: PathBuf },

    /// The root manifest lists no entries.
    #[error("no content entries in {}", path.display())]
    EmptyContent { path: PathBuf },

    /// Malformed manifest or front matter, or an ambiguous entry.
    #[error("invalid content at {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::io(path, io::Error::from(io::ErrorKind::NotFound))
    }
}
