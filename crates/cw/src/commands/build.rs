//! `cw build` command implementation.

use std::path::PathBuf;

use clap::Args;
use cw_config::{CliSettings, Config};
use cw_site::{BuildOutcome, BuildSession, CancellationToken};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover cw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of pages built concurrently (overrides config).
    #[arg(short, long, env = "CW_JOBS")]
    jobs: Option<usize>,

    /// Disable the render cache.
    #[arg(long)]
    no_cache: bool,

    /// Enable verbose output (per-stage timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or content loading fails, a page
    /// fails to build, or the build is cancelled.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            output_dir: self.output_dir,
            max_concurrency: self.jobs,
            cache_enabled: self.no_cache.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Source directory: {}",
            config.docs_resolved.source_dir.display()
        ));
        output.info(&format!(
            "Output directory: {}",
            config.build_resolved.output_dir.display()
        ));
        if !config.docs_resolved.cache_enabled {
            output.info("Cache: disabled");
        }

        let session = BuildSession::from_config(config)?.with_progress(|done, total| {
            Output::new().progress(done, total);
        });

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing pages in progress");
                on_signal.cancel();
            }
        });

        match session.build(cancel).await? {
            BuildOutcome::Completed(stats) => {
                output.success(&format!(
                    "Built {} pages in {:.2}s",
                    stats.processed,
                    stats.elapsed.as_secs_f64()
                ));
                Ok(())
            }
            BuildOutcome::Cancelled(stats) => {
                output.warning("Build interrupted");
                Err(CliError::Cancelled {
                    processed: stats.processed,
                    total: stats.total,
                })
            }
        }
    }
}
