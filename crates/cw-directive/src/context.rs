//! Read-only page information available to extensions.

use std::path::{Path, PathBuf};

/// What an extension may know about the page it is expanding into.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    /// Title of the page being built.
    pub page_title: &'a str,
    /// Site-relative URL of the page.
    pub page_url: &'a str,
    /// Source file of the page, if it has one.
    pub source_path: Option<&'a Path>,
    /// Directory relative paths (e.g. `@Include`) resolve against.
    pub base_dir: &'a Path,
    /// Line of the invocation currently being expanded.
    pub line: usize,
}

impl<'a> ExtensionContext<'a> {
    /// Context for a page with no source file.
    #[must_use]
    pub fn new(page_title: &'a str, page_url: &'a str, base_dir: &'a Path) -> Self {
        Self {
            page_title,
            page_url,
            source_path: None,
            base_dir,
            line: 0,
        }
    }

    /// Set the page's source file.
    #[must_use]
    pub fn with_source(mut self, source_path: &'a Path) -> Self {
        self.source_path = Some(source_path);
        self
    }

    /// Copy of this context pointing at `line`.
    #[must_use]
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Resolve `relative` against the base directory, refusing paths that
    /// leave it.
    ///
    /// Returns `None` if the target does not exist or escapes `base_dir`
    /// (e.g. `../../etc/passwd`).
    #[must_use]
    pub fn resolve_path_safe(&self, relative: &str) -> Option<PathBuf> {
        let canonical = self.base_dir.join(relative).canonicalize().ok()?;
        let canonical_base = self.base_dir.canonicalize().ok()?;
        canonical.starts_with(&canonical_base).then_some(canonical)
    }
}
