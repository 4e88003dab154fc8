//! Benchmarks for the extraction hot paths: entity validation and response parsing.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use devkg::extract::parse::salvage_truncated_json;
use devkg::extract::{is_valid_entity, normalize_predicate, parse_triples_response};

const LABELS: &[&str] = &[
    "neo4j",
    "apache kafka",
    "__init__.py",
    "1400px",
    "10.158.0.38",
    "js",
    "src/main.rs",
    "user_session_token",
    "graph data",
    "7f9ef80",
    "kubernetes operator pattern",
    "@types/node",
];

fn response(n: usize) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"subject": "Service {i}", "predicate": "depends_on", "object": "database {i}"}}"#
            )
        })
        .collect();
    format!("```json\n[{}]\n```", items.join(", "))
}

fn bench_validate(c: &mut Criterion) {
    c.bench_function("validate_12_labels", |bench| {
        bench.iter(|| {
            LABELS
                .iter()
                .filter(|l| is_valid_entity(black_box(l)))
                .count()
        })
    });
}

fn bench_normalize_predicate(c: &mut Criterion) {
    let raw = ["storesIn", "STORES_IN", "built-with", "sort of uses", "frobnicates"];
    c.bench_function("normalize_predicate_5", |bench| {
        bench.iter(|| {
            for p in raw {
                black_box(normalize_predicate(black_box(p)));
            }
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    let full = response(10);
    c.bench_function("parse_10_triples", |bench| {
        bench.iter(|| black_box(parse_triples_response(black_box(&full))))
    });

    let cut = &full[..full.len() * 2 / 3];
    c.bench_function("salvage_truncated", |bench| {
        bench.iter(|| black_box(salvage_truncated_json(black_box(cut))))
    });
}

criterion_group!(benches, bench_validate, bench_normalize_predicate, bench_parse);
criterion_main!(benches);
