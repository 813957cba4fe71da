//! Benchmarks for weft-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use weft_core::{observe, Array, Object, Value, Watcher};

fn flat_object(keys: usize) -> Object {
    let object = Object::new();
    for i in 0..keys {
        object.insert(&format!("key{i}"), i as f64);
    }
    object
}

fn nested_object(depth: usize) -> Object {
    let mut current = Object::new();
    current.insert("value", 0.0);
    for _ in 0..depth {
        let parent = Object::new();
        parent.insert("child", current);
        current = parent;
    }
    current
}

// =============================================================================
// OBSERVATION
// =============================================================================

fn bench_observe_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe_flat");

    for keys in [4, 32, 256] {
        group.bench_with_input(BenchmarkId::new("keys", keys), &keys, |b, &keys| {
            b.iter_batched(
                || Value::from(flat_object(keys)),
                |root| black_box(observe(&root, false)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_observe_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe_nested");

    for depth in [4, 16, 64] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            b.iter_batched(
                || Value::from(nested_object(depth)),
                |root| black_box(observe(&root, false)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

// =============================================================================
// READS AND WRITES
// =============================================================================

fn bench_property_read(c: &mut Criterion) {
    let plain = Object::new();
    plain.insert("count", 1.0);

    let observed = Object::new();
    observed.insert("count", 1.0);
    observe(&Value::from(observed.clone()), false);

    let mut group = c.benchmark_group("property_read");
    group.bench_function("plain", |b| b.iter(|| black_box(plain.get("count"))));
    group.bench_function("observed", |b| b.iter(|| black_box(observed.get("count"))));
    group.finish();
}

fn bench_write_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_fanout");

    for watchers in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("watchers", watchers),
            &watchers,
            |b, &watchers| {
                let state = Object::new();
                state.insert("count", 0.0);
                observe(&Value::from(state.clone()), false);

                let handles: Vec<_> = (0..watchers)
                    .map(|_| {
                        let reader = state.clone();
                        Watcher::new(move || {
                            black_box(reader.get("count"));
                        })
                    })
                    .collect();

                // Monotone values keep every write distinct
                let mut i = 0.0;
                b.iter(|| {
                    i += 1.0;
                    state.set("count", i);
                });

                for watcher in &handles {
                    watcher.teardown();
                }
            },
        );
    }

    group.finish();
}

// =============================================================================
// ARRAYS
// =============================================================================

fn bench_array_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_push");

    group.bench_function("plain", |b| {
        let array = Array::new();
        b.iter(|| {
            array.push(black_box(1.0));
        });
    });

    group.bench_function("observed", |b| {
        let array = Array::new();
        observe(&Value::from(array.clone()), false);
        b.iter(|| {
            array.push(black_box(1.0));
        });
    });

    group.finish();
}

// =============================================================================
// CRITERION SETUP
// =============================================================================

criterion_group!(observe_benches, bench_observe_flat, bench_observe_nested);
criterion_group!(access_benches, bench_property_read, bench_write_fanout);
criterion_group!(array_benches, bench_array_push);

criterion_main!(observe_benches, access_benches, array_benches);
