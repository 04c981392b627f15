//! Benchmarks for template compile and render.
//!
//! Run with: cargo bench -p weave-template --bench render_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use weave_template::{HelperRegistry, Scope, TemplateCompiler, Value, scope};

const ROW_TEMPLATE: &str =
    "<ul>{{each rows}}<li data-i=\"#{@index}\">#{title} by #{author.name} (#{upper(tag)})</li>{{/each}}</ul>";

fn make_rows(n: usize) -> Scope {
    let rows: Vec<Value> = (0..n)
        .map(|i| {
            Value::from(scope! {
                "title" => format!("Post {i}"),
                "author" => scope! { "name" => "Ada" },
                "tag" => "rust",
            })
        })
        .collect();
    scope! { "rows" => rows }
}

fn compiler() -> TemplateCompiler {
    let helpers = HelperRegistry::new();
    let _ = helpers.register("upper", |args| {
        Value::from(args.first().map(|v| v.to_text().to_uppercase()).unwrap_or_default())
    });
    TemplateCompiler::new(helpers)
}

fn bench_compile(c: &mut Criterion) {
    let compiler = compiler();
    c.bench_function("template/compile_rows", |b| {
        b.iter(|| black_box(compiler.compile(ROW_TEMPLATE)))
    });
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("template/render_rows");
    let template = match compiler().compile(ROW_TEMPLATE) {
        Ok(template) => template,
        Err(err) => panic!("bench template must compile: {err}"),
    };

    for n in [1, 100, 1000] {
        let data = make_rows(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            b.iter(|| black_box(template.render(data)))
        });
    }

    group.finish();
}

fn bench_interpolate_flat(c: &mut Criterion) {
    let compiler = compiler();
    let template = match compiler.compile("Hello #{first} #{last}, you have #{count} new messages.") {
        Ok(template) => template,
        Err(err) => panic!("bench template must compile: {err}"),
    };
    let data = scope! { "first" => "Ada", "last" => "Lovelace", "count" => 3 };
    c.bench_function("template/interpolate_flat", |b| {
        b.iter(|| black_box(template.render(&data)))
    });
}

criterion_group!(benches, bench_compile, bench_render, bench_interpolate_flat);
criterion_main!(benches);
