use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use logflow::ingest::{IngestConfig, RawRequest, ingest};
use logflow::redact::{redact, redact_with_summary};

const LINE: &str = "User john@example.com called 555-1234 from 10.0.0.1";

fn long_text(chars: usize) -> String {
    LINE.chars().cycle().take(chars).collect()
}

fn ingest_bench(c: &mut Criterion) {
    let cfg = IngestConfig::default();
    let json = serde_json::json!({"tenant_id": "bench_tenant", "text": LINE}).to_string();

    let mut group = c.benchmark_group("ingest");
    group.bench_function("json_short", |b| {
        b.iter(|| {
            let msg = ingest(RawRequest::json(black_box(json.as_bytes())), &cfg)
                .expect("bench ingest");
            black_box(msg);
        });
    });
    group.bench_function("text_short", |b| {
        b.iter(|| {
            let msg = ingest(
                RawRequest::text([("x-tenant-id", "bench_tenant")], black_box(LINE)),
                &cfg,
            )
            .expect("bench ingest");
            black_box(msg);
        });
    });

    let max = long_text(cfg.max_text_chars);
    group.throughput(Throughput::Bytes(max.len() as u64));
    group.bench_function("text_max_length", |b| {
        b.iter(|| {
            let msg = ingest(
                RawRequest::text([("x-tenant-id", "bench_tenant")], black_box(max.as_str())),
                &cfg,
            )
            .expect("bench ingest");
            black_box(msg);
        });
    });
    group.finish();
}

fn redact_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("redact");
    for size in [64usize, 1_024, 17_000] {
        let text = long_text(size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("mixed_{size}"), |b| {
            b.iter(|| black_box(redact(black_box(&text))));
        });
    }

    let clean = "Application started successfully at 2024-01-15 10:30:00 ".repeat(100);
    group.throughput(Throughput::Bytes(clean.len() as u64));
    group.bench_function("no_matches", |b| {
        b.iter(|| black_box(redact(black_box(&clean))));
    });

    let text = long_text(17_000);
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("with_summary_17000", |b| {
        b.iter(|| black_box(redact_with_summary(black_box(&text))));
    });
    group.finish();
}

criterion_group!(benches, ingest_bench, redact_bench);
criterion_main!(benches);
