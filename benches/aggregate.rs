use api_benchmark::cli::{Operation, Protocol};
use api_benchmark::metrics::{AggregateStats, GroupKey, RequestResult};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

fn synthetic_samples(count: usize) -> Vec<RequestResult> {
    (0..count)
        .map(|i| {
            RequestResult::success(
                Protocol::Rest,
                Operation::GetUser,
                1.0 + (i % 97) as f64 * 0.25,
                256,
            )
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let key = GroupKey {
        protocol: Protocol::Rest,
        operation: Operation::GetUser,
    };
    let wall_clock = Duration::from_secs(5);

    for count in [1_000usize, 10_000] {
        let samples = synthetic_samples(count);
        c.bench_function(&format!("aggregate_{}_samples", count), |b| {
            b.iter(|| {
                AggregateStats::from_samples(black_box(key), black_box(&samples), wall_clock)
            })
        });
    }
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
