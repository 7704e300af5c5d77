use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rcu_shelf::{Library, ReclaimConfig, RetireMode};
use std::hint::black_box;

// Benchmark 1: One borrow and return per iteration in each retirement mode
fn bench_transition(c: &mut Criterion) {
    let mut group = c.benchmark_group("transition");

    for mode in [RetireMode::Synchronous, RetireMode::Deferred] {
        let library = Library::new();
        library.add(0, "book", "author").unwrap();
        let reader = library.register_reader();

        group.bench_function(BenchmarkId::from_parameter(mode), |b| {
            b.iter(|| {
                library.borrow(&reader, 0, mode).unwrap();
                library.give_back(&reader, 0, mode).unwrap();
            });
        });
    }

    group.finish();
}

// Benchmark 2: Deferred retirement with different automatic collection thresholds
fn bench_auto_reclaim_threshold(c: &mut Criterion) {
    let mut group = c.benchmark_group("auto_reclaim_threshold");

    for threshold in [1usize, 16, 64, 512] {
        let library = Library::builder()
            .reclaim(ReclaimConfig::new().auto_reclaim_threshold(threshold))
            .build()
            .unwrap();
        library.add(0, "book", "author").unwrap();
        let reader = library.register_reader();

        group.bench_with_input(
            BenchmarkId::from_parameter(threshold),
            &threshold,
            |b, _| {
                b.iter(|| {
                    library.borrow(&reader, 0, RetireMode::Deferred).unwrap();
                    library.give_back(&reader, 0, RetireMode::Deferred).unwrap();
                });
            },
        );
    }

    group.finish();
}

// Benchmark 3: Cost of an explicit collection with a backlog
fn bench_collect_backlog(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect_backlog");

    for backlog in [16, 256, 4096] {
        group.bench_with_input(BenchmarkId::from_parameter(backlog), &backlog, |b, &backlog| {
            let library = Library::builder()
                .reclaim(ReclaimConfig::new().auto_reclaim_threshold(None))
                .build()
                .unwrap();
            library.add(0, "book", "author").unwrap();
            let reader = library.register_reader();

            b.iter_batched(
                || {
                    for _ in 0..backlog / 2 {
                        library.borrow(&reader, 0, RetireMode::Deferred).unwrap();
                        library.give_back(&reader, 0, RetireMode::Deferred).unwrap();
                    }
                },
                |()| black_box(library.collect()),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_transition,
    bench_auto_reclaim_threshold,
    bench_collect_backlog
);
criterion_main!(benches);
