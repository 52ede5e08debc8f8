//! Error types for directive expansion.

use crate::binder::BindingError;
use crate::parser::ParseError;

/// Failure while expanding the directives of one text.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    /// Malformed directive syntax.
    #[error("directive syntax error at {0}")]
    Parse(#[from] ParseError),

    /// No extension is registered under the directive's name.
    #[error("line {line}: unknown directive @{name}")]
    UnknownExtension { name: String, line: usize },

    /// Arguments matched none of the extension's signatures.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The extension itself reported a failure.
    #[error("line {line}: @{name} failed: {message}")]
    Extension {
        name: String,
        line: usize,
        message: String,
    },
}

impl DirectiveError {
    /// 1-based source line the error refers to.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Parse(e) => e.line,
            Self::Binding(e) => e.line,
            Self::UnknownExtension { line, .. } | Self::Extension { line, .. } => *line,
        }
    }
}

/// Error returned by an extension's invoke function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ExtensionError(String);

impl ExtensionError {
    /// Create an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<std::io::Error> for ExtensionError {
    fn from(e: std::io::Error) -> Self {
        Self(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(DirectiveError: Send, Sync);
    static_assertions::assert_impl_all!(ExtensionError: Send, Sync, Clone);

    #[test]
    fn test_line_of_each_variant() {
        let parse = DirectiveError::from(ParseError::new(3, "unterminated string"));
        assert_eq!(parse.line(), 3);
        assert_eq!(
            parse.to_string(),
            "directive syntax error at line 3: unterminated string"
        );

        let unknown = DirectiveError::UnknownExtension {
            name: "Nope".to_owned(),
            line: 7,
        };
        assert_eq!(unknown.line(), 7);
        assert_eq!(unknown.to_string(), "line 7: unknown directive @Nope");
    }
}
