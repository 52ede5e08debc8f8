use std::hint::black_box;
use std::path::Path;

use criterion::{Criterion, criterion_group, criterion_main};
use cw_directive::{ExtensionContext, ExtensionRegistry, expand, parse, register_builtins};

fn lesson(sections: usize) -> String {
    let mut text = String::from("# @Title()\n\n");
    for i in 0..sections {
        text.push_str(&format!(
            "## Section {i}\n\nSee @Link('/ref/{i}', 'reference {i}') and mail @@team.\n\n\
             @Quiz('Question {i}?', [\n  {{text: 'yes', correct: true}},\n  {{text: 'no'}},\n]) // check\n\n"
        ));
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let text = lesson(50);
    c.bench_function("parse_50_sections", |b| b.iter(|| parse(black_box(&text))));
}

fn bench_expand(c: &mut Criterion) {
    let text = lesson(50);
    let mut registry = ExtensionRegistry::new();
    register_builtins(&mut registry);
    let ctx = ExtensionContext::new("Lesson", "/lesson", Path::new("."));

    c.bench_function("expand_50_sections", |b| {
        b.iter(|| expand(black_box(&text), &registry, &ctx));
    });
}

criterion_group!(benches, bench_parse, bench_expand);
criterion_main!(benches);
