// Criterion benchmarks for the tutorial service

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use otel_tutorial::core::fibonacci;
use otel_tutorial::loadtest::{LoadPlan, Sample, Stats, Thresholds};
use otel_tutorial::loadtest::stats::RunInfo;
use std::time::Duration;

fn bench_fibonacci(c: &mut Criterion) {
    let mut group = c.benchmark_group("fibonacci");

    for n in [10u32, 15, 20, 25] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| fibonacci(black_box(n)));
        });
    }

    group.finish();
}

fn bench_plan_target(c: &mut Criterion) {
    let plan = LoadPlan::default();

    c.bench_function("plan_target_at", |b| {
        b.iter(|| plan.target_at(black_box(Duration::from_millis(95_500))));
    });
}

fn bench_stats_summary(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_summary");

    for size in [1_000usize, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut stats = Stats::default();
                for i in 0..size {
                    stats.record(Sample {
                        group: if i % 2 == 0 { "health" } else { "compute" }.to_string(),
                        status: Some(200),
                        latency: Duration::from_micros((i % 5_000) as u64),
                        expected: true,
                        checks_passed: 2,
                        checks_failed: 0,
                    });
                }
                black_box(stats.summarize(RunInfo::default(), &Thresholds::default()))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fibonacci, bench_plan_target, bench_stats_summary);
criterion_main!(benches);
