use std::fs;
use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use cw_cache::{MemoryCache, NullCache};
use cw_content::{LoaderConfig, TreeLoader};
use cw_directive::{ExtensionRegistry, register_builtins};
use cw_site::stages::HtmlRenderer;
use cw_site::{BuildOptions, Orchestrator, Pipeline};

/// Ten units of ten lessons, every other unit aggregated.
fn course(root: &Path) {
    let units: Vec<String> = (0..10).map(|u| format!("unit-{u}")).collect();
    fs::write(
        root.join("manifest.yaml"),
        format!("[default, {}]", units.join(", ")),
    )
    .unwrap();
    fs::write(root.join("default.md"), "# Course\n").unwrap();
    for (u, unit) in units.iter().enumerate() {
        let dir = root.join(unit);
        fs::create_dir_all(&dir).unwrap();
        let lessons: Vec<String> = (0..10).map(|l| format!("lesson-{l}")).collect();
        fs::write(
            dir.join("manifest.yaml"),
            format!("[default, {}]", lessons.join(", ")),
        )
        .unwrap();
        let aggregate = if u % 2 == 0 { "true" } else { "false" };
        fs::write(
            dir.join("default.md"),
            format!("---\naggregate: {aggregate}\n---\n# Unit {u}\n"),
        )
        .unwrap();
        for lesson in &lessons {
            fs::write(
                dir.join(format!("{lesson}.md")),
                "# @Title()\n\nRead @Link('/ref', 'the reference').\n\n\
                 @Quiz('Ready?', [{text: 'yes', correct: true}, {text: 'no'}])\n",
            )
            .unwrap();
        }
    }
}

fn bench_build(c: &mut Criterion) {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    course(src.path());
    let tree = TreeLoader::new(LoaderConfig::default())
        .load(src.path())
        .unwrap();
    let mut registry = ExtensionRegistry::new();
    register_builtins(&mut registry);
    let pipeline = Pipeline::standard(Box::new(HtmlRenderer::new()), "all.html", "\n\n");

    for workers in [1, 4] {
        c.bench_function(&format!("build_111_pages_{workers}_workers"), |b| {
            b.iter(|| {
                let options = BuildOptions {
                    max_concurrency: workers,
                    ..BuildOptions::default()
                };
                Orchestrator::new(&tree, &pipeline, &registry, Arc::new(NullCache), out.path())
                    .build(black_box(&options))
                    .unwrap()
            });
        });
    }

    let cache = Arc::new(MemoryCache::new());
    c.bench_function("build_111_pages_warm_cache", |b| {
        b.iter(|| {
            Orchestrator::new(&tree, &pipeline, &registry, Arc::clone(&cache), out.path())
                .build(&BuildOptions::default())
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_build);
criterion_main!(benches);
