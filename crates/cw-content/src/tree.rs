//! Content tree arena.
//!
//! Nodes live in a flat `Vec<ContentNode>` with parent/children links stored
//! as [`NodeId`] indices, so parent references never own anything. The arena
//! is filled in pre-order, which is also manifest order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::node::{ContentNode, NodeId};

/// Ordered tree of content nodes with exactly one root.
#[derive(Debug)]
pub struct ContentTree {
    nodes: Vec<ContentNode>,
    url_index: HashMap<String, NodeId>,
    source_root: PathBuf,
}

impl ContentTree {
    pub(crate) fn new(nodes: Vec<ContentNode>, source_root: PathBuf) -> Self {
        let url_index = nodes.iter().map(|n| (n.url.clone(), n.id)).collect();
        Self {
            nodes,
            url_index,
            source_root,
        }
    }

    /// The root node (URL `/`).
    #[must_use]
    pub fn root(&self) -> &ContentNode {
        &self.nodes[0]
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` comes from a different tree with more nodes.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ContentNode {
        &self.nodes[id.0]
    }

    /// Node by id, if it exists.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes.get(id.0)
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<&ContentNode> {
        self.get(id)?.parent.map(|p| self.node(p))
    }

    /// Children of a node in manifest order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &ContentNode> {
        self.get(id)
            .into_iter()
            .flat_map(|n| n.children.iter().map(|&c| self.node(c)))
    }

    /// Node with the given URL.
    #[must_use]
    pub fn find_by_url(&self, url: &str) -> Option<&ContentNode> {
        self.url_index.get(url).map(|&id| self.node(id))
    }

    /// Number of ancestors (0 for the root).
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent).parent;
        }
        depth
    }

    /// Node ids in pre-order: each node before its children, siblings in
    /// manifest order.
    #[must_use]
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root().id];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev());
        }
        order
    }

    /// All nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.iter()
    }

    /// Number of nodes, virtual ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a loaded tree has a root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Directory the tree was loaded from.
    #[must_use]
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }
}
