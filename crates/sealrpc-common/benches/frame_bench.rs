// Criterion benchmarks for the sealrpc frame codec
//
// Run benchmarks with:
//   cargo bench -p sealrpc-common

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sealrpc_common::crypto::Plaintext;
use sealrpc_common::frame::{self, Compression};
use sealrpc_common::CallRequest;
use serde_json::json;

fn small_envelope() -> serde_json::Value {
    serde_json::to_value(CallRequest::new("UserService", "balance", vec![json!(42)])).unwrap()
}

fn large_envelope() -> serde_json::Value {
    let rows: Vec<String> = (0..512).map(|i| format!("row_{i}_padding_padding")).collect();
    serde_json::to_value(CallRequest::new("ReportService", "rows", vec![json!(rows)])).unwrap()
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack");

    let small = small_envelope();
    group.bench_function("small_legacy", |b| {
        b.iter(|| {
            frame::pack(
                black_box(&small),
                "key",
                "aes",
                true,
                Compression::None,
                &Plaintext,
            )
        });
    });

    let large = large_envelope();
    group.bench_function("large_legacy", |b| {
        b.iter(|| {
            frame::pack(
                black_box(&large),
                "key",
                "aes",
                true,
                Compression::None,
                &Plaintext,
            )
        });
    });

    group.bench_function("large_gzip", |b| {
        b.iter(|| {
            frame::pack(
                black_box(&large),
                "key",
                "aes",
                true,
                Compression::Gzip,
                &Plaintext,
            )
        });
    });

    group.finish();
}

fn bench_unpack(c: &mut Criterion) {
    let mut group = c.benchmark_group("unpack");

    let small = frame::pack(
        &small_envelope(),
        "key",
        "aes",
        true,
        Compression::None,
        &Plaintext,
    )
    .unwrap();
    group.bench_function("small_legacy", |b| {
        b.iter(|| frame::unpack(black_box(&small), "key", "aes", true, &Plaintext));
    });

    let gzipped = frame::pack(
        &large_envelope(),
        "key",
        "aes",
        true,
        Compression::Gzip,
        &Plaintext,
    )
    .unwrap();
    group.bench_function("large_gzip", |b| {
        b.iter(|| frame::unpack(black_box(&gzipped), "key", "aes", true, &Plaintext));
    });

    group.finish();
}

criterion_group!(benches, bench_pack, bench_unpack);
criterion_main!(benches);
