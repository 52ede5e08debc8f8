//! Build orchestration.
//!
//! Runs the pipeline for every node of a [`ContentTree`] on a bounded pool
//! of scoped worker threads:
//!
//! - nodes are dispatched strictly in pre-order (manifest order), one shared
//!   cursor, so a node never starts before an earlier node was picked up
//! - a node runs start to finish on one worker
//! - after every node, success or failure, the node arrives at its parent's
//!   [`FanIn`] so siblings waiting on it are released
//! - the first failure (or worker panic) stops further dispatch; nodes
//!   already running finish
//! - cancellation is checked before each dispatch
//!
//! All aggregation state lives in the build's barriers, so several builds
//! may share one tree.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cw_cache::Cache;
use cw_content::{ContentNode, ContentTree};
use cw_directive::ExtensionRegistry;

use crate::barrier::FanIn;
use crate::context::PageContext;
use crate::error::{BuildError, PageError};
use crate::pipeline::{Pipeline, PipelineOutcome};

/// Progress callback: `(completed, total)` after each node.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Send + Sync + 'a;

/// Cooperative cancellation flag shared with a running build.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Nodes already running still finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Options for one build.
pub struct BuildOptions<'a> {
    /// Number of worker threads (at least one is used).
    pub max_concurrency: usize,
    /// Checked before each dispatch.
    pub cancel: CancellationToken,
    /// Called after each completed node.
    pub progress: Option<&'a ProgressFn<'a>>,
}

impl Default for BuildOptions<'_> {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

/// Counters for a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Nodes in the tree.
    pub total: usize,
    /// Nodes whose pipeline ran.
    pub processed: usize,
    /// Processed nodes whose pipeline stopped early.
    pub stopped: usize,
    /// Wall time of the build.
    pub elapsed: Duration,
}

/// How a build ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Every node was processed.
    Completed(BuildStats),
    /// Cancellation stopped dispatch before every node was processed.
    Cancelled(BuildStats),
}

impl BuildOutcome {
    /// Counters regardless of outcome.
    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        match self {
            Self::Completed(stats) | Self::Cancelled(stats) => stats,
        }
    }

    /// Whether the build was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Runs a [`Pipeline`] over a [`ContentTree`].
pub struct Orchestrator<'a> {
    tree: &'a ContentTree,
    pipeline: &'a Pipeline,
    registry: &'a ExtensionRegistry,
    cache: Arc<dyn Cache>,
    output_root: &'a Path,
}

/// Shared state of one build's workers.
struct Run<'r> {
    order: Vec<cw_content::NodeId>,
    barriers: Vec<FanIn>,
    cursor: AtomicUsize,
    completed: AtomicUsize,
    stopped: AtomicUsize,
    failed: AtomicBool,
    first_error: Mutex<Option<BuildError>>,
    options: &'r BuildOptions<'r>,
}

/// Stops dispatch when a worker unwinds.
struct StopOnPanic<'r>(&'r AtomicBool);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Release);
        }
    }
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator writing below `output_root`.
    #[must_use]
    pub fn new(
        tree: &'a ContentTree,
        pipeline: &'a Pipeline,
        registry: &'a ExtensionRegistry,
        cache: Arc<dyn Cache>,
        output_root: &'a Path,
    ) -> Self {
        Self {
            tree,
            pipeline,
            registry,
            cache,
            output_root,
        }
    }

    /// Build every node.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Page`] for the first failing node and
    /// [`BuildError::Worker`] if a worker thread panicked.
    ///
    /// # Panics
    ///
    /// Panics if an internal lock is poisoned.
    pub fn build(&self, options: &BuildOptions<'_>) -> Result<BuildOutcome, BuildError> {
        let start = Instant::now();

        let run = Run {
            order: self.tree.preorder(),
            barriers: self
                .tree
                .iter()
                .map(|node| FanIn::new(node.children.len()))
                .collect(),
            cursor: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            first_error: Mutex::new(None),
            options,
        };
        let total = run.order.len();
        let workers = options.max_concurrency.clamp(1, total.max(1));
        tracing::info!(total, workers, "Build started");

        let shared = &run;
        let panicked = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| scope.spawn(move || self.work(shared)))
                .collect();
            handles
                .into_iter()
                .map(thread::ScopedJoinHandle::join)
                .filter(Result::is_err)
                .count()
        });

        let stats = BuildStats {
            total,
            processed: run.completed.load(Ordering::Acquire),
            stopped: run.stopped.load(Ordering::Acquire),
            elapsed: start.elapsed(),
        };

        if panicked > 0 {
            tracing::error!(panicked, "Build worker panicked");
            return Err(BuildError::Worker);
        }
        if let Some(error) = run.first_error.into_inner().unwrap() {
            tracing::error!(error = %error, processed = stats.processed, "Build failed");
            return Err(error);
        }
        if stats.processed < total && options.cancel.is_cancelled() {
            tracing::info!(processed = stats.processed, total, "Build cancelled");
            return Ok(BuildOutcome::Cancelled(stats));
        }

        tracing::info!(
            total,
            stopped = stats.stopped,
            elapsed_ms = stats.elapsed.as_secs_f64() * 1000.0,
            "Build completed"
        );
        Ok(BuildOutcome::Completed(stats))
    }

    /// Worker loop: take the next node until the queue is empty, the build
    /// failed, or it was cancelled.
    fn work(&self, run: &Run<'_>) {
        let _stop_on_panic = StopOnPanic(&run.failed);
        let total = run.order.len();
        loop {
            if run.failed.load(Ordering::Acquire) || run.options.cancel.is_cancelled() {
                return;
            }
            let index = run.cursor.fetch_add(1, Ordering::AcqRel);
            if index >= total {
                return;
            }

            let node = self.tree.node(run.order[index]);
            let siblings = node.parent.map(|parent| &run.barriers[parent.index()]);
            let guard = siblings.map(|fan_in| fan_in.guard(node.position));
            node.tag().clear();

            match self.build_node(node, siblings) {
                Ok(outcome) => {
                    if outcome.stopped_by.is_some() {
                        run.stopped.fetch_add(1, Ordering::AcqRel);
                    }
                    if let Some(guard) = guard {
                        guard.succeed();
                    }
                }
                Err(source) => {
                    // Record before arriving so a sibling's follow-up failure
                    // never becomes the reported error.
                    if !run.failed.swap(true, Ordering::AcqRel) {
                        tracing::error!(url = %node.url, error = %source, "Page failed");
                        *run.first_error.lock().unwrap() = Some(BuildError::Page {
                            url: node.url.clone(),
                            source,
                        });
                    }
                    drop(guard);
                }
            }

            let done = run.completed.fetch_add(1, Ordering::AcqRel) + 1;
            if let Some(progress) = run.options.progress {
                progress(done, total);
            }
        }
    }

    fn build_node(
        &self,
        node: &ContentNode,
        siblings: Option<&FanIn>,
    ) -> Result<PipelineOutcome, PageError> {
        let start = Instant::now();
        let text = node.read_body()?;

        let mut ctx = PageContext::new(
            self.tree,
            node,
            Arc::clone(&self.cache),
            self.registry,
            self.output_root,
        );
        if let Some(fan_in) = siblings {
            ctx = ctx.with_siblings(fan_in);
        }

        let outcome = self.pipeline.run(text, &mut ctx)?;
        tracing::debug!(
            url = %node.url,
            stopped_by = outcome.stopped_by,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Page built"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use cw_cache::NullCache;
    use cw_content::{LoaderConfig, TreeLoader};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::{Stage, StageResult};
    use crate::stages::{Aggregate, ExpandDirectives, PlainRenderer, Render, SkipVirtual, Write};

    /// Sleeps before handing on the page named `entry`.
    struct Delay {
        entry: &'static str,
        millis: u64,
    }

    impl Stage for Delay {
        fn name(&self) -> &'static str {
            "delay"
        }

        fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError> {
            if ctx.node.name == self.entry {
                thread::sleep(Duration::from_millis(self.millis));
            }
            Ok(StageResult::Continue(text))
        }
    }

    /// Panics on the root page; counts and slows down every other page.
    struct PanicAtRoot {
        started: Arc<AtomicUsize>,
    }

    impl Stage for PanicAtRoot {
        fn name(&self) -> &'static str {
            "panic-at-root"
        }

        fn apply(&self, text: String, ctx: &mut PageContext<'_>) -> Result<StageResult, PageError> {
            assert!(ctx.node.parent.is_some(), "root page");
            self.started.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(StageResult::Continue(text))
        }
    }

    /// The standard chain with `first` in front of it.
    fn pipeline_after<S: Stage + 'static>(first: S) -> Pipeline {
        Pipeline::new()
            .with_stage(first)
            .with_stage(SkipVirtual)
            .with_stage(ExpandDirectives)
            .with_stage(Aggregate::new("all.html", "|"))
            .with_stage(Render::new(Box::new(PlainRenderer)))
            .with_stage(Write)
    }

    fn build_with(
        tree: &ContentTree,
        pipeline: &Pipeline,
        out: &Path,
        options: &BuildOptions<'_>,
    ) -> Result<BuildOutcome, BuildError> {
        let mut registry = ExtensionRegistry::new();
        cw_directive::register_builtins(&mut registry);
        Orchestrator::new(tree, pipeline, &registry, Arc::new(NullCache), out).build(options)
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Root with a plain page and an aggregated section of three lessons.
    fn course(dir: &Path) -> ContentTree {
        write(dir, "manifest.yaml", "[default, intro, unit]");
        write(dir, "default.md", "# Home");
        write(dir, "intro.md", "# Intro\n@Title()");
        write(dir, "unit/manifest.yaml", "[default, one, two, three]");
        write(dir, "unit/default.md", "---\naggregate: true\n---\n# Unit");
        write(dir, "unit/one.md", "one");
        write(dir, "unit/two.md", "two");
        write(dir, "unit/three.md", "three");
        TreeLoader::new(LoaderConfig::default()).load(dir).unwrap()
    }

    fn pipeline() -> Pipeline {
        Pipeline::standard(Box::new(PlainRenderer), "all.html", "|")
    }

    fn build(
        tree: &ContentTree,
        out: &Path,
        options: &BuildOptions<'_>,
    ) -> Result<BuildOutcome, BuildError> {
        build_with(tree, &pipeline(), out, options)
    }

    fn options(max_concurrency: usize) -> BuildOptions<'static> {
        BuildOptions {
            max_concurrency,
            ..BuildOptions::default()
        }
    }

    #[test]
    fn test_build_writes_pages_and_aggregate() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());

        let outcome = build(&tree, out.path(), &options(4)).unwrap();

        let stats = outcome.stats();
        assert!(!outcome.is_cancelled());
        assert_eq!(stats.total, tree.len());
        assert_eq!(stats.processed, tree.len());
        assert_eq!(
            fs::read_to_string(out.path().join("intro/index.html")).unwrap(),
            "# Intro\nIntro"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("unit/all.html")).unwrap(),
            "one|two|three"
        );
        assert!(!out.path().join("unit/one/index.html").exists());
    }

    #[test]
    fn test_sequential_and_concurrent_builds_match() {
        let src = tempfile::tempdir().unwrap();
        let tree = course(src.path());

        let sequential = tempfile::tempdir().unwrap();
        build(&tree, sequential.path(), &options(1)).unwrap();
        let concurrent = tempfile::tempdir().unwrap();
        build(&tree, concurrent.path(), &options(8)).unwrap();

        for rel in [
            "index.html",
            "intro/index.html",
            "unit/index.html",
            "unit/all.html",
        ] {
            assert_eq!(
                fs::read_to_string(sequential.path().join(rel)).unwrap(),
                fs::read_to_string(concurrent.path().join(rel)).unwrap(),
                "{rel}"
            );
        }
    }

    #[test]
    fn test_rebuild_does_not_repeat_fragments() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());

        build(&tree, out.path(), &options(2)).unwrap();
        build(&tree, out.path(), &options(2)).unwrap();

        assert_eq!(
            fs::read_to_string(out.path().join("unit/all.html")).unwrap(),
            "one|two|three"
        );
    }

    #[test]
    fn test_first_error_fails_build() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(src.path(), "manifest.yaml", "[default, bad]");
        write(src.path(), "default.md", "# Home");
        write(src.path(), "bad.md", "@Missing()");
        let tree = TreeLoader::new(LoaderConfig::default())
            .load(src.path())
            .unwrap();

        let err = build(&tree, out.path(), &options(2)).unwrap_err();

        match &err {
            BuildError::Page { url, source } => {
                assert_eq!(url, "/bad");
                assert_eq!(source.kind(), ErrorKind::UnknownExtension);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!out.path().join("bad/index.html").exists());
    }

    #[test]
    fn test_failed_lesson_fails_aggregate() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());
        write(src.path(), "unit/one.md", "@Image('a.png', 0)");

        let err = build(&tree, out.path(), &options(4)).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Extension);
        assert!(!out.path().join("unit/all.html").exists());
    }

    #[test]
    fn test_cancelled_before_start() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = build(
            &tree,
            out.path(),
            &BuildOptions {
                max_concurrency: 2,
                cancel,
                progress: None,
            },
        )
        .unwrap();

        assert!(outcome.is_cancelled());
        assert_eq!(outcome.stats().processed, 0);
        assert!(!out.path().join("index.html").exists());
    }

    #[test]
    fn test_progress_reaches_total() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());
        let calls = AtomicUsize::new(0);
        let last = AtomicUsize::new(0);
        let progress = |done: usize, total: usize| {
            calls.fetch_add(1, Ordering::Relaxed);
            last.fetch_max(done, Ordering::Relaxed);
            assert_eq!(total, 6);
        };

        build(
            &tree,
            out.path(),
            &BuildOptions {
                max_concurrency: 3,
                cancel: CancellationToken::new(),
                progress: Some(&progress),
            },
        )
        .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 6);
        assert_eq!(last.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn test_zero_concurrency_uses_one_worker() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());

        let outcome = build(&tree, out.path(), &options(0)).unwrap();

        assert_eq!(outcome.stats().processed, 6);
    }

    #[test]
    fn test_stopped_pages_are_counted() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());

        let outcome = build(&tree, out.path(), &options(2)).unwrap();

        // "one" and "two" stop at aggregation
        assert_eq!(outcome.stats().stopped, 2);
    }

    #[test]
    fn test_aggregate_waits_for_slow_earlier_sibling() {
        let src = tempfile::tempdir().unwrap();
        let tree = course(src.path());

        for entry in ["one", "two"] {
            let out = tempfile::tempdir().unwrap();
            let pipeline = pipeline_after(Delay { entry, millis: 200 });

            build_with(&tree, &pipeline, out.path(), &options(4)).unwrap();

            assert_eq!(
                fs::read_to_string(out.path().join("unit/all.html")).unwrap(),
                "one|two|three",
                "{entry} delayed"
            );
        }
    }

    #[test]
    fn test_concurrent_builds_of_one_tree_keep_their_fragments() {
        let src = tempfile::tempdir().unwrap();
        let tree = course(src.path());
        let slow_out = tempfile::tempdir().unwrap();
        let fast_out = tempfile::tempdir().unwrap();
        let slow = pipeline_after(Delay {
            entry: "three",
            millis: 400,
        });

        thread::scope(|scope| {
            let slow_build = scope.spawn(|| build_with(&tree, &slow, slow_out.path(), &options(4)));
            thread::sleep(Duration::from_millis(150));
            build(&tree, fast_out.path(), &options(4)).unwrap();
            slow_build.join().unwrap().unwrap();
        });

        for out in [&slow_out, &fast_out] {
            assert_eq!(
                fs::read_to_string(out.path().join("unit/all.html")).unwrap(),
                "one|two|three"
            );
        }
    }

    #[test]
    fn test_worker_panic_stops_dispatch() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tree = course(src.path());
        let started = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline_after(PanicAtRoot {
            started: Arc::clone(&started),
        });

        let err = build_with(&tree, &pipeline, out.path(), &options(2)).unwrap_err();

        assert!(matches!(err, BuildError::Worker));
        // Only the page the other worker had already taken may run.
        assert!(started.load(Ordering::SeqCst) <= 1);
    }
}
