use criterion::{black_box, criterion_group, criterion_main, Criterion};
use minibind_parser::{analyze, rewrite, AnalyzeOptions, RewriteMode, SubstitutionMap};

const SIMPLE: &str = "count + 1";

const HANDLER: &str = r#"
    let next = items.nextItem(selected);
    if (next) { selected = next } else { selected = items.first() }
    el.open = !el.open;
    total = items.filter(item => item.done).length
"#;

const TEMPLATE: &str = "`${user.name} has ${count} of ${limit} (${Math.round(count / limit * 100)}%)`";

fn bench_analyze(c: &mut Criterion) {
    let options = AnalyzeOptions::ignoring(["$", "window", "document", "console", "event"]);

    c.bench_function("analyze_simple", |b| {
        b.iter(|| analyze(black_box(SIMPLE), &options))
    });

    c.bench_function("analyze_handler", |b| {
        b.iter(|| analyze(black_box(HANDLER), &options))
    });

    c.bench_function("analyze_template", |b| {
        b.iter(|| analyze(black_box(TEMPLATE), &options))
    });
}

fn bench_rewrite(c: &mut Criterion) {
    let mut substitutions = SubstitutionMap::new();
    substitutions.insert("el.open".to_string(), "__scopes[\"E4\"].open".to_string());
    substitutions.insert("selected".to_string(), "picked".to_string());

    c.bench_function("rewrite_declared", |b| {
        b.iter(|| rewrite(black_box(HANDLER), &substitutions, &[RewriteMode::Declared]))
    });

    c.bench_function("rewrite_all", |b| {
        b.iter(|| rewrite(black_box(HANDLER), &substitutions, &[RewriteMode::All]))
    });
}

criterion_group!(benches, bench_analyze, bench_rewrite);
criterion_main!(benches);
