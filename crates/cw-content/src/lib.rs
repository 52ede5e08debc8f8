//! Ordered content tree for CW.
//!
//! A course is a directory hierarchy. Each directory lists its entries, in
//! reading order, in a manifest; [`TreeLoader`] turns that into a
//! [`ContentTree`] whose nodes carry titles, URLs, output paths and front
//! matter metadata.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use cw_content::{LoaderConfig, TreeLoader};
//!
//! let tree = TreeLoader::new(LoaderConfig::default()).load(Path::new("content"))?;
//! for id in tree.preorder() {
//!     let node = tree.node(id);
//!     println!("{} -> {}", node.url, node.relative_output_path.display());
//! }
//! # Ok::<(), cw_content::LoadError>(())
//! ```

mod error;
mod front_matter;
mod loader;
mod node;
mod tree;

pub use error::LoadError;
pub use loader::{DEFAULT_ENTRY, LoaderConfig, TreeLoader};
pub use node::{ContentNode, MetaValue, NodeId, Tag};
pub use tree::ContentTree;

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(ContentTree: Send, Sync);
    static_assertions::assert_impl_all!(LoadError: Send, Sync);
}
