//! Content nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::LoadError;
use crate::front_matter;

/// Index of a node in its [`ContentTree`](crate::ContentTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position in the tree's node arena (pre-order).
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scalar front matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl MetaValue {
    /// Whether this is `Bool(true)`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Bool(true))
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Scratch space written by pipeline stages.
///
/// Holds the output written for the node by the latest build.
#[derive(Debug, Default)]
pub struct Tag {
    /// Output written for this node, if any.
    pub rendered: Option<String>,
}

impl Tag {
    /// Forget the output of a previous build.
    pub fn clear(&mut self) {
        self.rendered = None;
    }
}

/// One page (or virtual directory) of the content tree.
#[derive(Debug)]
pub struct ContentNode {
    /// Arena index of this node.
    pub id: NodeId,
    /// Manifest entry name; unique among siblings. The root's is `default`.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Document file, or `None` for a directory without a `default` entry.
    pub source_path: Option<PathBuf>,
    /// Output file path relative to the output root.
    pub relative_output_path: PathBuf,
    /// Site URL, `/` for the root.
    pub url: String,
    /// Children in manifest order.
    pub children: Vec<NodeId>,
    /// Parent node, `None` only for the root.
    pub parent: Option<NodeId>,
    /// Index among the parent's children.
    pub position: usize,
    /// Scalar front matter values.
    pub metadata: BTreeMap<String, MetaValue>,
    /// Whether this node is a directory's `default` entry.
    pub is_default_entry: bool,
    tag: Mutex<Tag>,
}

impl ContentNode {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: NodeId,
        name: String,
        title: String,
        source_path: Option<PathBuf>,
        relative_output_path: PathBuf,
        url: String,
        parent: Option<NodeId>,
        position: usize,
        metadata: BTreeMap<String, MetaValue>,
        is_default_entry: bool,
    ) -> Self {
        Self {
            id,
            name,
            title,
            source_path,
            relative_output_path,
            url,
            children: Vec::new(),
            parent,
            position,
            metadata,
            is_default_entry,
            tag: Mutex::new(Tag::default()),
        }
    }

    /// Whether the node has no document behind it.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.source_path.is_none()
    }

    /// Look up a front matter value.
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// Directory containing the source document.
    #[must_use]
    pub fn source_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }

    /// Read the document body with front matter removed.
    ///
    /// Virtual nodes have an empty body.
    pub fn read_body(&self) -> Result<String, LoadError> {
        let Some(path) = &self.source_path else {
            return Ok(String::new());
        };
        let text = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        Ok(front_matter::strip(&text).to_owned())
    }

    /// Lock the node's tag.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn tag(&self) -> MutexGuard<'_, Tag> {
        self.tag.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_clear() {
        let mut tag = Tag {
            rendered: Some("x".to_owned()),
        };
        tag.clear();
        assert!(tag.rendered.is_none());
    }

    #[test]
    fn test_meta_value_display() {
        assert_eq!(MetaValue::Number(3.0).to_string(), "3");
        assert_eq!(MetaValue::Number(2.5).to_string(), "2.5");
        assert!(MetaValue::Bool(true).is_true());
        assert!(!MetaValue::String("true".to_owned()).is_true());
    }
}
