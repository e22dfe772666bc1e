//! Throughput of the auto-chunk fallback strategy against a large
//! unstructured text, the worst case for the segmentation cascade
//! since every other strategy has already failed by the time it runs.
use std::io::Write;

use bookcast::parser::BookParser;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_auto_chunk_fallback(c: &mut Criterion) {
    let content = "字".repeat(200_000);
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();

    c.bench_function("parse_unstructured_200k_chars", |b| {
        b.iter(|| {
            let parser = BookParser::new(file.path()).unwrap();
            black_box(parser.parse().unwrap());
        });
    });
}

criterion_group!(benches, bench_auto_chunk_fallback);
criterion_main!(benches);
