//! Build error types.

use std::io;
use std::path::PathBuf;

use cw_config::ConfigError;
use cw_content::LoadError;
use cw_directive::DirectiveError;

use crate::stages::RenderError;

/// Category of a build failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed directive syntax.
    Parse,
    /// A directive names no registered extension.
    UnknownExtension,
    /// Directive arguments match no declared signature.
    ArgumentBinding,
    /// An extension reported a failure.
    Extension,
    /// Invalid configuration, manifest or front matter.
    Config,
    /// Filesystem failure.
    Io,
    /// The renderer failed.
    Render,
    /// A worker thread panicked.
    Internal,
}

/// Failure while running one node's pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// Directive expansion failed.
    #[error(transparent)]
    Directive(#[from] DirectiveError),

    /// Reading the source document failed.
    #[error(transparent)]
    Source(#[from] LoadError),

    /// Writing output failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The renderer failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A sibling this page aggregates failed first.
    #[error("a preceding sibling failed")]
    SiblingFailed,
}

impl PageError {
    /// Failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Directive(DirectiveError::Parse(_)) => ErrorKind::Parse,
            Self::Directive(DirectiveError::UnknownExtension { .. }) => ErrorKind::UnknownExtension,
            Self::Directive(DirectiveError::Binding(_)) => ErrorKind::ArgumentBinding,
            Self::Directive(DirectiveError::Extension { .. }) => ErrorKind::Extension,
            Self::Source(e) => load_kind(e),
            Self::Io { .. } => ErrorKind::Io,
            Self::Render(_) => ErrorKind::Render,
            Self::SiblingFailed => ErrorKind::Internal,
        }
    }
}

/// Failure of a whole build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The content tree could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A page failed; the build stopped dispatching further pages.
    #[error("failed to build {url}: {source}")]
    Page {
        url: String,
        #[source]
        source: PageError,
    },

    /// A worker thread panicked.
    #[error("build worker panicked")]
    Worker,
}

impl BuildError {
    /// Failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Load(e) => load_kind(e),
            Self::Page { source, .. } => source.kind(),
            Self::Worker => ErrorKind::Internal,
        }
    }
}

fn load_kind(error: &LoadError) -> ErrorKind {
    match error {
        LoadError::Io { .. } => ErrorKind::Io,
        LoadError::MissingManifest { .. }
        | LoadError::EmptyContent { .. }
        | LoadError::Config { .. } => ErrorKind::Config,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(BuildError: Send, Sync);
    static_assertions::assert_impl_all!(PageError: Send, Sync);

    #[test]
    fn test_page_error_kind() {
        let err = BuildError::Page {
            url: "/intro".to_owned(),
            source: PageError::Directive(DirectiveError::UnknownExtension {
                name: "Nope".to_owned(),
                line: 4,
            }),
        };
        assert_eq!(err.kind(), ErrorKind::UnknownExtension);
        assert_eq!(
            err.to_string(),
            "failed to build /intro: line 4: unknown directive @Nope"
        );
    }

    #[test]
    fn test_load_error_kind() {
        let err = BuildError::Load(LoadError::EmptyContent {
            path: PathBuf::from("content/manifest.yaml"),
        });
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
