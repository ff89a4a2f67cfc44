//! Benchmark for PersistentSequence vs standard Vec.
//!
//! Compares the finger-tree sequence against Rust's standard Vec for end
//! pushes, random access, positional edits, and the bulk operations where
//! the tree's structural sharing pays off.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fingerseq::{PersistentSequence, SequenceBuilder};
use std::hint::black_box;

// =============================================================================
// push_back Benchmark
// =============================================================================

fn benchmark_push_back(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("push_back");

    for size in [100, 1000, 10000] {
        // PersistentSequence push_back
        group.bench_with_input(
            BenchmarkId::new("PersistentSequence", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut sequence = PersistentSequence::new();
                    for index in 0..size {
                        sequence = sequence.push_back(black_box(index));
                    }
                    black_box(sequence)
                });
            },
        );

        // SequenceBuilder push_back
        group.bench_with_input(
            BenchmarkId::new("SequenceBuilder", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut builder = SequenceBuilder::new();
                    for index in 0..size {
                        builder.push_back(black_box(index));
                    }
                    black_box(builder.freeze())
                });
            },
        );

        // Standard Vec push
        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = Vec::new();
                for index in 0..size {
                    vector.push(black_box(index));
                }
                black_box(vector)
            });
        });
    }

    group.finish();
}

// =============================================================================
// get Benchmark (Random Access)
// =============================================================================

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get");

    for size in [100, 1000, 10000] {
        let sequence: PersistentSequence<i32> = (0..size).collect();
        let standard_vector: Vec<i32> = (0..size).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentSequence", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut sum = 0;
                    for index in 0..size as usize {
                        if let Some(&value) = sequence.get(black_box(index)) {
                            sum += value;
                        }
                    }
                    black_box(sum)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0;
                for index in 0..size as usize {
                    if let Some(&value) = standard_vector.get(black_box(index)) {
                        sum += value;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

// =============================================================================
// insert Benchmark (Middle of the Sequence)
// =============================================================================

fn benchmark_insert_middle(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("insert_middle");

    for size in [100, 1000, 10000] {
        let sequence: PersistentSequence<i32> = (0..size).collect();
        let standard_vector: Vec<i32> = (0..size).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentSequence", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    black_box(sequence.insert(black_box(size as usize / 2), -1))
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut vector = standard_vector.clone();
                vector.insert(black_box(size as usize / 2), -1);
                black_box(vector)
            });
        });
    }

    group.finish();
}

// =============================================================================
// concat Benchmark
// =============================================================================

fn benchmark_concat(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("concat");

    for size in [100, 1000, 10000] {
        let left: PersistentSequence<i32> = (0..size).collect();
        let right: PersistentSequence<i32> = (size..2 * size).collect();
        let left_vector: Vec<i32> = (0..size).collect();
        let right_vector: Vec<i32> = (size..2 * size).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentSequence", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(left.concat(black_box(&right))));
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, _| {
            bencher.iter(|| {
                let mut joined = left_vector.clone();
                joined.extend_from_slice(black_box(&right_vector));
                black_box(joined)
            });
        });
    }

    group.finish();
}

// =============================================================================
// slice Benchmark
// =============================================================================

fn benchmark_slice(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("slice");

    for size in [1000, 10000] {
        let sequence: PersistentSequence<i32> = (0..size).collect();
        let standard_vector: Vec<i32> = (0..size).collect();
        let quarter = size as usize / 4;

        group.bench_with_input(
            BenchmarkId::new("PersistentSequence", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(sequence.slice(black_box(quarter), quarter * 2)));
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, _| {
            bencher.iter(|| black_box(standard_vector[quarter..quarter * 3].to_vec()));
        });
    }

    group.finish();
}

// =============================================================================
// iterate Benchmark (Full Traversal)
// =============================================================================

fn benchmark_iterate(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("iterate");

    for size in [1000, 10000] {
        let sequence: PersistentSequence<i64> = (0..size).collect();
        let standard_vector: Vec<i64> = (0..size).collect();

        group.bench_with_input(
            BenchmarkId::new("PersistentSequence", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(sequence.iter().sum::<i64>()));
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", size), &size, |bencher, _| {
            bencher.iter(|| black_box(standard_vector.iter().sum::<i64>()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_push_back,
    benchmark_get,
    benchmark_insert_middle,
    benchmark_concat,
    benchmark_slice,
    benchmark_iterate
);
criterion_main!(benches);
