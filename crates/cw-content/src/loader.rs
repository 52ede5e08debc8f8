//! Content tree loading from manifests.
//!
//! Every content directory carries a manifest (`manifest.yaml` by default)
//! listing its entries in order:
//!
//! ```yaml
//! - default      # the directory's own page: default.md
//! - setup        # setup.md, a file named `setup`, or a directory setup/
//! - borrowing.md
//! ```
//!
//! Output layout:
//!
//! | Entry                         | URL            | Output                     |
//! |-------------------------------|----------------|----------------------------|
//! | root `default`                | `/`            | `index.html`               |
//! | `setup` (file)                | `/setup`       | `setup/index.html`         |
//! | `guide` (directory)           | `/guide`       | `guide/index.html`         |
//! | `guide` → `intro.md`          | `/guide/intro` | `guide/intro/index.html`   |

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::LoadError;
use crate::front_matter;
use crate::node::{ContentNode, MetaValue, NodeId};
use crate::tree::ContentTree;

/// Entry name of a directory's own page.
pub const DEFAULT_ENTRY: &str = "default";

/// Loader settings.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Manifest filename looked up in every content directory.
    pub manifest_name: String,
    /// Document extension without the dot.
    pub extension: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            manifest_name: "manifest.yaml".to_owned(),
            extension: "md".to_owned(),
        }
    }
}

/// Builds a [`ContentTree`] from a directory hierarchy.
pub struct TreeLoader {
    config: LoaderConfig,
    /// Regex for extracting first H1 heading.
    h1_regex: Regex,
}

/// What a manifest entry resolved to.
enum Target {
    File(PathBuf),
    Dir(PathBuf),
}

/// Identity of a node about to be created.
struct Placement<'a> {
    name: &'a str,
    slug: &'a str,
    url: String,
    rel_dir: PathBuf,
    parent: Option<NodeId>,
    position: usize,
}

impl TreeLoader {
    /// Create a loader.
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            h1_regex: Regex::new(r"(?m)^#\s+(.+)$").unwrap(),
        }
    }

    /// Load the tree rooted at `root`.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Io`] if `root` or a listed entry does not exist
    /// - [`LoadError::MissingManifest`] if a content directory has no manifest
    /// - [`LoadError::EmptyContent`] if the root manifest lists nothing
    /// - [`LoadError::Config`] for malformed manifests or front matter,
    ///   duplicate or hidden entries, and entries naming both a file and a
    ///   directory
    pub fn load(&self, root: &Path) -> Result<ContentTree, LoadError> {
        let start = std::time::Instant::now();
        let meta = std::fs::metadata(root).map_err(|e| LoadError::io(root, e))?;
        if !meta.is_dir() {
            return Err(LoadError::config(root, "content root is not a directory"));
        }

        let entries = self.read_manifest(root)?;
        if entries.is_empty() {
            return Err(LoadError::EmptyContent {
                path: root.join(&self.config.manifest_name),
            });
        }

        let slug = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("home")
            .to_owned();
        let mut nodes = Vec::new();
        self.load_dir(
            &mut nodes,
            root,
            &entries,
            Placement {
                name: DEFAULT_ENTRY,
                slug: &slug,
                url: "/".to_owned(),
                rel_dir: PathBuf::new(),
                parent: None,
                position: 0,
            },
        )?;

        let tree = ContentTree::new(nodes, root.to_path_buf());
        tracing::info!(
            node_count = tree.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            root = %root.display(),
            "Content tree loaded"
        );
        Ok(tree)
    }

    /// Create the node for a directory, then its children.
    fn load_dir(
        &self,
        nodes: &mut Vec<ContentNode>,
        dir: &Path,
        entries: &[String],
        placement: Placement<'_>,
    ) -> Result<NodeId, LoadError> {
        let id = NodeId(nodes.len());
        let has_default = entries.iter().any(|e| e == DEFAULT_ENTRY);

        let node = if has_default {
            let source = dir.join(format!("{DEFAULT_ENTRY}.{}", self.config.extension));
            if !source.is_file() {
                return Err(LoadError::not_found(source));
            }
            self.page_node(
                id,
                source,
                &placement,
                placement.rel_dir.join("index.html"),
                true,
            )?
        } else {
            tracing::debug!(dir = %dir.display(), "Directory without default entry");
            ContentNode::new(
                id,
                placement.name.to_owned(),
                titlecase_from_slug(placement.slug),
                None,
                placement.rel_dir.join("index.html"),
                placement.url.clone(),
                placement.parent,
                placement.position,
                BTreeMap::new(),
                false,
            )
        };
        nodes.push(node);

        let mut seen_slugs = HashSet::new();
        let mut position = 0;
        for entry in entries.iter().filter(|e| *e != DEFAULT_ENTRY) {
            let slug = entry
                .strip_suffix(&format!(".{}", self.config.extension))
                .unwrap_or(entry);
            if !seen_slugs.insert(slug) {
                return Err(LoadError::config(
                    dir.join(&self.config.manifest_name),
                    format!("entry `{entry}` maps to the same URL as an earlier entry"),
                ));
            }

            let child = Placement {
                name: entry,
                slug,
                url: join_url(&placement.url, slug),
                rel_dir: placement.rel_dir.join(slug),
                parent: Some(id),
                position,
            };
            let child_id = match self.resolve_entry(dir, entry)? {
                Target::File(source) => {
                    let child_id = NodeId(nodes.len());
                    let output = child.rel_dir.join("index.html");
                    let node = self.page_node(child_id, source, &child, output, false)?;
                    nodes.push(node);
                    child_id
                }
                Target::Dir(sub) => {
                    let sub_entries = self.read_manifest(&sub)?;
                    self.load_dir(nodes, &sub, &sub_entries, child)?
                }
            };
            nodes[id.0].children.push(child_id);
            position += 1;
        }

        Ok(id)
    }

    /// Create a node backed by a document.
    fn page_node(
        &self,
        id: NodeId,
        source: PathBuf,
        placement: &Placement<'_>,
        relative_output_path: PathBuf,
        is_default_entry: bool,
    ) -> Result<ContentNode, LoadError> {
        let text = std::fs::read_to_string(&source).map_err(|e| LoadError::io(&source, e))?;
        let (yaml, body) =
            front_matter::split(&text).map_err(|message| LoadError::config(&source, message))?;
        let metadata = match yaml {
            Some(yaml) => {
                front_matter::parse(yaml).map_err(|message| LoadError::config(&source, message))?
            }
            None => BTreeMap::new(),
        };

        let title = match metadata.get("title") {
            Some(MetaValue::String(title)) => title.clone(),
            _ => self
                .extract_h1(body)
                .unwrap_or_else(|| titlecase_from_slug(placement.slug)),
        };

        Ok(ContentNode::new(
            id,
            placement.name.to_owned(),
            title,
            Some(source),
            relative_output_path,
            placement.url.clone(),
            placement.parent,
            placement.position,
            metadata,
            is_default_entry,
        ))
    }

    /// Map an entry to a file or directory.
    fn resolve_entry(&self, dir: &Path, entry: &str) -> Result<Target, LoadError> {
        let exact = dir.join(entry);
        let with_ext = dir.join(format!("{entry}.{}", self.config.extension));
        let file = [&exact, &with_ext]
            .into_iter()
            .find(|p| p.is_file())
            .cloned();

        match (file, exact.is_dir()) {
            (Some(_), true) => Err(LoadError::config(
                &exact,
                format!("entry `{entry}` matches both a file and a directory"),
            )),
            (Some(file), false) => Ok(Target::File(file)),
            (None, true) => Ok(Target::Dir(exact)),
            (None, false) => Err(LoadError::not_found(exact)),
        }
    }

    /// Read and validate a directory's manifest.
    fn read_manifest(&self, dir: &Path) -> Result<Vec<String>, LoadError> {
        let path = dir.join(&self.config.manifest_name);
        if !path.is_file() {
            return Err(LoadError::MissingManifest { path });
        }
        let content = std::fs::read_to_string(&path).map_err(|e| LoadError::io(&path, e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<String> = serde_yaml::from_str(&content).map_err(|e| {
            LoadError::config(
                &path,
                format!("manifest must be a list of entry names: {e}"),
            )
        })?;

        let mut seen = HashSet::new();
        for entry in &entries {
            validate_entry(entry).map_err(|message| LoadError::config(&path, message))?;
            if !seen.insert(entry.as_str()) {
                return Err(LoadError::config(
                    &path,
                    format!("entry `{entry}` is listed more than once"),
                ));
            }
        }
        Ok(entries)
    }

    /// Extract title from first H1 heading in markdown content.
    fn extract_h1(&self, content: &str) -> Option<String> {
        self.h1_regex
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_owned())
            .filter(|title| !title.is_empty())
    }
}

fn validate_entry(entry: &str) -> Result<(), String> {
    if entry.trim().is_empty() {
        return Err("empty entry name".to_owned());
    }
    if entry.contains(['/', '\\']) {
        return Err(format!("entry `{entry}` must be a plain name, not a path"));
    }
    if entry.starts_with('.') || entry.starts_with('_') {
        return Err(format!("entry `{entry}` is hidden"));
    }
    Ok(())
}

fn join_url(parent: &str, slug: &str) -> String {
    if parent == "/" {
        format!("/{slug}")
    } else {
        format!("{parent}/{slug}")
    }
}

/// Convert a slug to title case (e.g., "setup-guide" → "Setup Guide").
fn titlecase_from_slug(slug: &str) -> String {
    let mut result = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !result.is_empty() {
            result.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.push_str(chars.as_str());
        }
    }
    result
}
