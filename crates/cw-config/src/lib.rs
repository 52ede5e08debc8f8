//! Configuration management for CW.
//!
//! Parses `cw.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `docs.source_dir`
//! - `build.output_dir`
//! - `aggregate.file_name`

mod expand;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override content source directory.
    pub source_dir: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override worker count.
    pub max_concurrency: Option<usize>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "cw.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content source configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// Content tree layout.
    pub content: ContentConfig,
    /// Build configuration (paths are relative strings from TOML).
    build: BuildConfigRaw,
    /// Sibling aggregation output.
    pub aggregate: AggregateConfig,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw docs configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    cache_enabled: Option<bool>,
}

/// Resolved content source configuration.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Root of the content tree.
    pub source_dir: PathBuf,
    /// Whether rendered pages are cached across builds.
    pub cache_enabled: bool,
}

/// Content tree layout.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Per-directory manifest filename.
    pub manifest: String,
    /// Document file extension, without the dot.
    pub extension: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            manifest: "manifest.yaml".to_owned(),
            extension: "md".to_owned(),
        }
    }
}

/// Raw build configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    output_dir: Option<String>,
    max_concurrency: Option<usize>,
    renderer: Option<String>,
}

/// Which renderer turns page text into output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RendererKind {
    /// Markdown to an HTML document.
    #[default]
    Html,
    /// Text written as is.
    Plain,
}

impl RendererKind {
    fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "plain" => Ok(Self::Plain),
            other => Err(ConfigError::Validation(format!(
                "build.renderer must be \"html\" or \"plain\", got \"{other}\""
            ))),
        }
    }
}

/// Resolved build configuration.
#[derive(Debug)]
pub struct BuildConfig {
    /// Where output pages are written.
    pub output_dir: PathBuf,
    /// Number of worker threads.
    pub max_concurrency: usize,
    /// Renderer for page text.
    pub renderer: RendererKind,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("site"),
            max_concurrency: default_concurrency(),
            renderer: RendererKind::Html,
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Sibling aggregation output.
///
/// Applies to the children of any page whose front matter sets
/// `aggregate: true`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Output file written into the parent's directory.
    pub file_name: String,
    /// Text placed between sibling fragments.
    pub separator: String,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            file_name: "all.html".to_owned(),
            separator: "\n\n".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`docs.source_dir`").
        field: String,
        /// Error message (e.g., "${`COURSE_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `cw.toml` in current directory and parents,
    /// falling back to defaults relative to the current directory.
    ///
    /// CLI settings are applied after path resolution and take precedence.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.build_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(max_concurrency) = settings.max_concurrency {
            self.build_resolved.max_concurrency = max_concurrency;
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.docs_resolved.cache_enabled = cache_enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            docs: DocsConfigRaw::default(),
            content: ContentConfig::default(),
            build: BuildConfigRaw::default(),
            aggregate: AggregateConfig::default(),
            docs_resolved: DocsConfig {
                source_dir: base.join("content"),
                cache_enabled: true,
            },
            build_resolved: BuildConfig {
                output_dir: base.join("site"),
                ..BuildConfig::default()
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called by [`Config::load`] after CLI settings are applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.content.manifest, "content.manifest")?;
        require_non_empty(&self.content.extension, "content.extension")?;
        if self.content.extension.starts_with('.') {
            return Err(ConfigError::Validation(
                "content.extension must not start with a dot".to_owned(),
            ));
        }
        require_non_empty(&self.aggregate.file_name, "aggregate.file_name")?;
        if self.build_resolved.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "build.max_concurrency must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref source_dir) = self.docs.source_dir {
            self.docs.source_dir = Some(expand::expand_env(source_dir, "docs.source_dir")?);
        }
        if let Some(ref output_dir) = self.build.output_dir {
            self.build.output_dir = Some(expand::expand_env(output_dir, "build.output_dir")?);
        }
        self.aggregate.file_name =
            expand::expand_env(&self.aggregate.file_name, "aggregate.file_name")?;
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "content"),
            cache_enabled: self.docs.cache_enabled.unwrap_or(true),
        };

        let renderer = match self.build.renderer.as_deref() {
            Some(name) => RendererKind::parse(name)?,
            None => RendererKind::default(),
        };
        self.build_resolved = BuildConfig {
            output_dir: resolve(self.build.output_dir.as_deref(), "site"),
            max_concurrency: self.build.max_concurrency.unwrap_or_else(default_concurrency),
            renderer,
        };

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/course"));
        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/course/content")
        );
        assert_eq!(
            config.build_resolved.output_dir,
            PathBuf::from("/course/site")
        );
        assert!(config.docs_resolved.cache_enabled);
        assert!(config.build_resolved.max_concurrency >= 1);
        assert_eq!(config.build_resolved.renderer, RendererKind::Html);
        assert_eq!(config.content.manifest, "manifest.yaml");
        assert_eq!(config.content.extension, "md");
        assert_eq!(config.aggregate.file_name, "all.html");
        assert_eq!(config.aggregate.separator, "\n\n");
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.content.manifest, "manifest.yaml");
        assert_eq!(config.aggregate.file_name, "all.html");
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[docs]
source_dir = "lessons"
cache_enabled = false

[build]
output_dir = "public"
max_concurrency = 3
renderer = "Plain"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project")).unwrap();

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/project/lessons")
        );
        assert!(!config.docs_resolved.cache_enabled);
        assert_eq!(
            config.build_resolved.output_dir,
            PathBuf::from("/project/public")
        );
        assert_eq!(config.build_resolved.max_concurrency, 3);
        assert_eq!(config.build_resolved.renderer, RendererKind::Plain);
    }

    #[test]
    fn test_unknown_renderer_rejected() {
        let mut config: Config = toml::from_str("[build]\nrenderer = \"pdf\"").unwrap();
        let err = config.resolve_paths(Path::new("/project")).unwrap_err();
        assert!(err.to_string().contains("build.renderer"));
    }

    #[test]
    fn test_parse_content_and_aggregate() {
        let toml = r#"
[content]
manifest = "index.yaml"
extension = "txt"

[aggregate]
file_name = "combined.html"
separator = "<hr>"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.content.manifest, "index.yaml");
        assert_eq!(config.content.extension, "txt");
        assert_eq!(config.aggregate.file_name, "combined.html");
        assert_eq!(config.aggregate.separator, "<hr>");
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/course"));
        config.apply_cli_settings(&CliSettings {
            source_dir: Some(PathBuf::from("/other/content")),
            output_dir: Some(PathBuf::from("/tmp/out")),
            max_concurrency: Some(2),
            cache_enabled: Some(false),
        });

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/other/content")
        );
        assert_eq!(config.build_resolved.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.build_resolved.max_concurrency, 2);
        assert!(!config.docs_resolved.cache_enabled);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/course"));
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/course/content")
        );
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/course"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default_with_base(Path::new("/course"));
        config.build_resolved.max_concurrency = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("build.max_concurrency"));
    }

    #[test]
    fn test_validate_empty_manifest_name() {
        let mut config = Config::default_with_base(Path::new("/course"));
        config.content.manifest = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_dotted_extension() {
        let mut config = Config::default_with_base(Path::new("/course"));
        config.content.extension = ".md".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cw.toml");
        std::fs::write(
            &path,
            "[docs]\nsource_dir = \"src\"\n[build]\nmax_concurrency = 2\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.docs_resolved.source_dir, dir.path().join("src"));
        assert_eq!(config.build_resolved.output_dir, dir.path().join("site"));
        assert_eq!(config.build_resolved.max_concurrency, 2);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_cli_zero_concurrency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cw.toml");
        std::fs::write(&path, "").unwrap();
        let settings = CliSettings {
            max_concurrency: Some(0),
            ..CliSettings::default()
        };

        assert!(Config::load(Some(&path), Some(&settings)).is_err());
    }

    #[test]
    fn test_expand_env_vars_in_paths() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("CW_TEST_CONFIG_OUT", "dist");
        }
        let mut config: Config =
            toml::from_str("[build]\noutput_dir = \"${CW_TEST_CONFIG_OUT}/site\"").unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project")).unwrap();
        assert_eq!(
            config.build_resolved.output_dir,
            PathBuf::from("/project/dist/site")
        );
        unsafe {
            std::env::remove_var("CW_TEST_CONFIG_OUT");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        let mut config: Config =
            toml::from_str("[docs]\nsource_dir = \"${CW_TEST_CONFIG_MISSING}\"").unwrap();
        let err = config.expand_env_vars().unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { ref field, .. } if field == "docs.source_dir"));
    }
}
