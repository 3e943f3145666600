use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use prodload_infra::{BatchLoader, BatchSize, InMemoryProductStore, SqliteProductStore};
use prodload_products::{synthetic_products, NewProduct, SyntheticProducts};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Runtime;

const ROWS: usize = 10_000;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn products(count: usize) -> Vec<NewProduct> {
    synthetic_products(count, &mut StdRng::seed_from_u64(7))
}

/// Same rows, different transaction granularity.
fn bench_batch_size(c: &mut Criterion) {
    let rt = runtime();
    let input = products(ROWS);
    let mut group = c.benchmark_group("in_memory_batch_size");
    group.throughput(Throughput::Elements(ROWS as u64));

    for batch_size in [1usize, 10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let size = BatchSize::new(batch_size).unwrap();
                b.iter(|| {
                    let store = InMemoryProductStore::new();
                    let report = rt
                        .block_on(BatchLoader::new(&store, size).load(black_box(&input)))
                        .unwrap();
                    black_box(report);
                });
            },
        );
    }

    group.finish();
}

fn bench_sqlite_load(c: &mut Criterion) {
    let rt = runtime();
    let rows = 2_000;
    let input = products(rows);
    let mut group = c.benchmark_group("sqlite_load");
    group.sample_size(20);
    group.throughput(Throughput::Elements(rows as u64));

    for batch_size in [10usize, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let size = BatchSize::new(batch_size).unwrap();
                b.iter(|| {
                    rt.block_on(async {
                        let store = SqliteProductStore::in_memory().await.unwrap();
                        let report = BatchLoader::new(&store, size).load(&input).await.unwrap();
                        black_box(report);
                    });
                });
            },
        );
    }

    group.finish();
}

fn bench_eager_vs_streaming(c: &mut Criterion) {
    let rt = runtime();
    let size = BatchSize::default();
    let mut group = c.benchmark_group("eager_vs_streaming");
    group.throughput(Throughput::Elements(ROWS as u64));

    group.bench_function("eager", |b| {
        b.iter(|| {
            let store = InMemoryProductStore::new();
            let input = products(ROWS);
            rt.block_on(BatchLoader::new(&store, size).load(&input))
                .unwrap()
        });
    });

    group.bench_function("streaming", |b| {
        b.iter(|| {
            let store = InMemoryProductStore::new();
            let input = SyntheticProducts::new(ROWS, StdRng::seed_from_u64(7));
            rt.block_on(BatchLoader::new(&store, size).load_iter(input))
                .unwrap()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_batch_size,
    bench_sqlite_load,
    bench_eager_vs_streaming
);
criterion_main!(benches);
