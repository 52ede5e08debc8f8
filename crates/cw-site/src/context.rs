//! Per-page state passed through the pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cw_cache::Cache;
use cw_content::{ContentNode, ContentTree, MetaValue};
use cw_directive::ExtensionRegistry;

use crate::barrier::FanIn;
use crate::error::PageError;

/// Value of a page token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&MetaValue> for TokenValue {
    fn from(value: &MetaValue) -> Self {
        match value {
            MetaValue::String(s) => Self::String(s.clone()),
            MetaValue::Number(n) => Self::Number(*n),
            MetaValue::Bool(b) => Self::Bool(*b),
        }
    }
}

impl From<&str> for TokenValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Named values available to the renderer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokens(BTreeMap<String, TokenValue>);

impl Tokens {
    /// Tokens for `node`: every front matter key, then `title`, `url`, `id`
    /// and `depth`.
    #[must_use]
    pub fn for_node(tree: &ContentTree, node: &ContentNode) -> Self {
        let mut tokens = Self::default();
        for (key, value) in &node.metadata {
            tokens.insert(key.clone(), TokenValue::from(value));
        }
        tokens.insert("title", node.title.as_str());
        tokens.insert("url", node.url.as_str());
        tokens.insert("id", node.name.as_str());
        #[allow(clippy::cast_precision_loss)]
        tokens.insert("depth", TokenValue::Number(tree.depth(node.id) as f64));
        tokens
    }

    /// Set a token.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TokenValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a token.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TokenValue> {
        self.0.get(key)
    }

    /// Look up a string token.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(TokenValue::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Iterate tokens in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// State for one node during one build.
pub struct PageContext<'a> {
    /// Tree the node belongs to.
    pub tree: &'a ContentTree,
    /// Node being built.
    pub node: &'a ContentNode,
    /// Renderer tokens.
    pub tokens: Tokens,
    /// Cache shared by every page of the build.
    pub cache: Arc<dyn Cache>,
    /// Extensions for directive expansion; read-only during builds.
    pub registry: &'a ExtensionRegistry,
    /// Root of the output tree.
    pub output_root: &'a Path,
    /// Output file relative to `output_root`; stages may retarget it.
    pub output_path: PathBuf,
    siblings: Option<&'a FanIn>,
}

impl<'a> PageContext<'a> {
    /// Create the context for `node`.
    #[must_use]
    pub fn new(
        tree: &'a ContentTree,
        node: &'a ContentNode,
        cache: Arc<dyn Cache>,
        registry: &'a ExtensionRegistry,
        output_root: &'a Path,
    ) -> Self {
        Self {
            tree,
            node,
            tokens: Tokens::for_node(tree, node),
            cache,
            registry,
            output_root,
            output_path: node.relative_output_path.clone(),
            siblings: None,
        }
    }

    /// Attach the barrier of the node's parent.
    #[must_use]
    pub fn with_siblings(mut self, siblings: &'a FanIn) -> Self {
        self.siblings = Some(siblings);
        self
    }

    /// Absolute output file path.
    #[must_use]
    pub fn output_file(&self) -> PathBuf {
        self.output_root.join(&self.output_path)
    }

    /// Barrier shared with this node's siblings in the current build.
    #[must_use]
    pub fn siblings(&self) -> Option<&'a FanIn> {
        self.siblings
    }

    /// Block until every earlier sibling of this node has finished.
    ///
    /// Returns immediately when the page runs outside an orchestrated build.
    pub fn wait_for_preceding_siblings(&self) -> Result<(), PageError> {
        match self.siblings {
            Some(fan_in) => fan_in
                .wait_preceding(self.node.position)
                .map_err(|_| PageError::SiblingFailed),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for PageContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("url", &self.node.url)
            .field("tokens", &self.tokens)
            .field("output_path", &self.output_path)
            .finish_non_exhaustive()
    }
}
