//! Benchmarks for the storage backends.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use keystone_storage::backends::{MemoryEngine, RedbEngine};
use keystone_storage::{StorageEngine, StorageError, Store, Transaction};

const STORE: &str = "bench";

fn populated<E: StorageEngine>(engine: E, size: u64) -> E {
    {
        let mut tx = engine.begin_write().unwrap();
        tx.create_store(STORE).unwrap();
        let mut store = tx.store(STORE).unwrap();
        for i in 0..size {
            let key = format!("key:{i:05}");
            let value = format!("value:{i:05}");
            store.put(key.as_bytes(), value.as_bytes()).unwrap();
        }
        drop(store);
        tx.commit().unwrap();
    }
    engine
}

fn memory() -> MemoryEngine {
    MemoryEngine::new()
}

fn redb() -> RedbEngine {
    RedbEngine::in_memory().unwrap()
}

/// Benchmark batch writes in one transaction.
fn bench_put_batch(c: &mut Criterion) {
    fn run<E: StorageEngine>(c: &mut Criterion, name: &str, create: fn() -> E) {
        let mut group = c.benchmark_group(format!("{name}_put_batch"));
        for size in [10, 100, 1000] {
            group.throughput(Throughput::Elements(size));
            group.bench_function(format!("put_batch_{size}"), |b| {
                b.iter_batched(
                    || populated(create(), 0),
                    |engine| {
                        let tx = engine.begin_write().unwrap();
                        let mut store = tx.store(STORE).unwrap();
                        for i in 0..size {
                            let key = format!("key:{i:05}");
                            store.put(key.as_bytes(), b"value").unwrap();
                        }
                        drop(store);
                        tx.commit().unwrap();
                    },
                    BatchSize::SmallInput,
                );
            });
        }
        group.finish();
    }

    run(c, "memory", memory);
    run(c, "redb", redb);
}

/// Benchmark random reads from a populated store.
fn bench_get_random(c: &mut Criterion) {
    const NUM_KEYS: u64 = 10000;

    fn run<E: StorageEngine>(c: &mut Criterion, name: &str, create: fn() -> E) {
        let mut group = c.benchmark_group(format!("{name}_get_random"));
        group.throughput(Throughput::Elements(100));

        let engine = populated(create(), NUM_KEYS);
        group.bench_function("get_random_100", |b| {
            b.iter(|| {
                let tx = engine.begin_read().unwrap();
                let store = tx.store(STORE).unwrap();
                for i in (0..100).map(|x| x * 97 % NUM_KEYS) {
                    let key = format!("key:{i:05}");
                    black_box(store.get(key.as_bytes()).unwrap());
                }
            });
        });
        group.finish();
    }

    run(c, "memory", memory);
    run(c, "redb", redb);
}

/// Benchmark full ascending scans.
fn bench_scan(c: &mut Criterion) {
    fn run<E: StorageEngine>(c: &mut Criterion, name: &str, create: fn() -> E) {
        let mut group = c.benchmark_group(format!("{name}_scan"));
        for size in [100, 1000, 10000] {
            let engine = populated(create(), size);
            group.throughput(Throughput::Elements(size));
            group.bench_function(format!("ascend_{size}"), |b| {
                b.iter(|| {
                    let tx = engine.begin_read().unwrap();
                    let store = tx.store(STORE).unwrap();
                    let mut count = 0u64;
                    store
                        .ascend_greater_or_equal(None, |k, _| {
                            black_box(k);
                            count += 1;
                            Ok::<_, StorageError>(())
                        })
                        .unwrap();
                    black_box(count);
                });
            });
        }
        group.finish();
    }

    run(c, "memory", memory);
    run(c, "redb", redb);
}

/// Benchmark transaction overhead.
fn bench_transaction_overhead(c: &mut Criterion) {
    fn run<E: StorageEngine>(c: &mut Criterion, name: &str, create: fn() -> E) {
        let mut group = c.benchmark_group(format!("{name}_transaction"));
        let engine = populated(create(), 100);

        group.bench_function("begin_read", |b| {
            b.iter(|| black_box(engine.begin_read().unwrap()).rollback().unwrap());
        });
        group.bench_function("begin_write_commit_empty", |b| {
            b.iter(|| engine.begin_write().unwrap().commit().unwrap());
        });
        group.finish();
    }

    run(c, "memory", memory);
    run(c, "redb", redb);
}

criterion_group!(
    benches,
    bench_put_batch,
    bench_get_random,
    bench_scan,
    bench_transaction_overhead
);

criterion_main!(benches);
