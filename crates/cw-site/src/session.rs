//! Build session: the entry point used by the CLI.
//!
//! A session owns everything a build needs for one content source: the
//! resolved configuration, the loaded tree, the extension registry and the
//! render cache. Builds run on a blocking thread so the caller's async
//! runtime stays responsive (for example to Ctrl-C).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cw_cache::{Cache, MemoryCache, NullCache};
use cw_config::{CliSettings, Config, RendererKind};
use cw_content::{ContentTree, LoaderConfig, TreeLoader};
use cw_directive::{ExtensionRegistry, register_builtins};

use crate::error::BuildError;
use crate::orchestrator::{BuildOptions, BuildOutcome, CancellationToken, Orchestrator, ProgressFn};
use crate::pipeline::Pipeline;
use crate::stages::{HtmlRenderer, PlainRenderer, Renderer};

/// Loaded content plus everything needed to build it.
pub struct BuildSession {
    config: Config,
    tree: Arc<ContentTree>,
    registry: Arc<ExtensionRegistry>,
    cache: Arc<dyn Cache>,
    progress: Option<Arc<ProgressFn<'static>>>,
}

impl BuildSession {
    /// Load configuration from `config_path` (or discover `cw.toml`) and the
    /// content tree it points at.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] for configuration problems and
    /// [`BuildError::Load`] if the content tree cannot be loaded.
    pub fn initialize(config_path: Option<&Path>) -> Result<Self, BuildError> {
        Self::from_config(Config::load(config_path, None)?)
    }

    /// Like [`BuildSession::initialize`] with command-line overrides.
    ///
    /// # Errors
    ///
    /// Same as [`BuildSession::initialize`].
    pub fn initialize_with(
        config_path: Option<&Path>,
        settings: &CliSettings,
    ) -> Result<Self, BuildError> {
        Self::from_config(Config::load(config_path, Some(settings))?)
    }

    /// Create a session from an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Load`] if the content tree cannot be loaded.
    pub fn from_config(config: Config) -> Result<Self, BuildError> {
        let loader = TreeLoader::new(LoaderConfig {
            manifest_name: config.content.manifest.clone(),
            extension: config.content.extension.clone(),
        });
        let tree = loader.load(&config.docs_resolved.source_dir)?;

        let mut registry = ExtensionRegistry::new();
        register_builtins(&mut registry);

        let cache: Arc<dyn Cache> = if config.docs_resolved.cache_enabled {
            Arc::new(MemoryCache::new())
        } else {
            Arc::new(NullCache)
        };

        tracing::info!(
            source = %config.docs_resolved.source_dir.display(),
            nodes = tree.len(),
            extensions = registry.len(),
            cache = config.docs_resolved.cache_enabled,
            "Build session initialized"
        );

        Ok(Self {
            config,
            tree: Arc::new(tree),
            registry: Arc::new(registry),
            cache,
            progress: None,
        })
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loaded content tree.
    #[must_use]
    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    /// Registered extensions.
    #[must_use]
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Mutable registry for registrations before a build.
    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        Arc::make_mut(&mut self.registry)
    }

    /// Remove every registered extension, built-ins included.
    pub fn reset_registry(&mut self) {
        self.registry_mut().reset();
    }

    /// Report `(completed, total)` after every node of later builds.
    #[must_use]
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Build the whole site into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns the first page failure, or [`BuildError::Worker`] if the build
    /// thread panicked.
    pub async fn build_site(
        &self,
        output_dir: impl Into<PathBuf>,
        cancel: CancellationToken,
    ) -> Result<BuildOutcome, BuildError> {
        let output_dir = output_dir.into();
        let tree = Arc::clone(&self.tree);
        let registry = Arc::clone(&self.registry);
        let cache = Arc::clone(&self.cache);
        let progress = self.progress.clone();
        let pipeline = self.pipeline();
        let max_concurrency = self.config.build_resolved.max_concurrency;

        tracing::info!(output = %output_dir.display(), max_concurrency, "Building site");

        tokio::task::spawn_blocking(move || {
            let options = BuildOptions {
                max_concurrency,
                cancel,
                progress: progress.as_deref(),
            };
            Orchestrator::new(&tree, &pipeline, &registry, cache, &output_dir).build(&options)
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Build task failed");
            BuildError::Worker
        })?
    }

    /// Build into the configured output directory.
    ///
    /// # Errors
    ///
    /// Same as [`BuildSession::build_site`].
    pub async fn build(&self, cancel: CancellationToken) -> Result<BuildOutcome, BuildError> {
        let output_dir = self.config.build_resolved.output_dir.clone();
        self.build_site(output_dir, cancel).await
    }

    fn pipeline(&self) -> Pipeline {
        let renderer: Box<dyn Renderer> = match self.config.build_resolved.renderer {
            RendererKind::Html => Box::new(HtmlRenderer::new()),
            RendererKind::Plain => Box::new(PlainRenderer),
        };
        let aggregate = &self.config.aggregate;
        Pipeline::standard(renderer, &aggregate.file_name, &aggregate.separator)
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("source_dir", &self.config.docs_resolved.source_dir)
            .field("nodes", &self.tree.len())
            .field("extensions", &self.registry.names())
            .finish_non_exhaustive()
    }
}
