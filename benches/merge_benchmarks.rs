//! Performance benchmarks for merging chunks
//! Compares the concatenation fast path with interleaved merges, and the
//! scheduled merge tree with the local one

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use disttable::distributed::{merge_many, merge_pair, merge_tree};
use disttable::{distribute, Aggregate, ChunkHandle, LocalTable, Partitioning, Scheduler, Value};
use std::hint::black_box;
use tokio::runtime::Runtime;

/// Keyed table with rows `(start + i * step, i)`.
fn strided_table(start: i64, step: i64, rows: usize) -> LocalTable {
    LocalTable::from_rows(
        &["id", "value"],
        (0..rows as i64)
            .map(|i| vec![Value::Int(start + i * step), Value::Int(i)])
            .collect(),
        &["id"],
    )
    .unwrap()
}

fn bench_merge_pair(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_pair");

    for rows in &[1_000usize, 10_000] {
        let low = strided_table(0, 1, *rows);
        let high = strided_table(*rows as i64, 1, *rows);
        group.bench_with_input(BenchmarkId::new("disjoint", rows), rows, |b, _| {
            b.iter(|| black_box(merge_pair(&Aggregate::default(), &low, &high).unwrap()))
        });

        let evens = strided_table(0, 2, *rows);
        let odds = strided_table(1, 2, *rows);
        group.bench_with_input(BenchmarkId::new("interleaved", rows), rows, |b, _| {
            b.iter(|| black_box(merge_pair(&Aggregate::default(), &evens, &odds).unwrap()))
        });
    }

    group.finish();
}

fn bench_merge_many(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_many");

    for chunks in &[4usize, 16, 64] {
        let tables: Vec<LocalTable> = (0..*chunks)
            .map(|i| strided_table(i as i64, *chunks as i64, 500))
            .collect();
        group.bench_with_input(BenchmarkId::new("overlapping", chunks), chunks, |b, _| {
            b.iter_batched(
                || tables.clone(),
                |tables| black_box(merge_many(&Aggregate::default(), tables).unwrap()),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_merge_tree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("merge_tree");
    let source = strided_table(0, 1, 20_000);

    for chunks in &[4usize, 32] {
        let table = distribute(&source, &Partitioning::Chunks(*chunks)).unwrap();
        let handles: Vec<ChunkHandle> = table.chunks().to_vec();
        group.bench_with_input(BenchmarkId::new("ordered", chunks), chunks, |b, _| {
            b.to_async(&rt).iter_batched(
                || (Scheduler::new(4), handles.clone()),
                |(scheduler, handles)| async move {
                    black_box(
                        merge_tree(&scheduler, &Aggregate::default(), handles)
                            .await
                            .unwrap(),
                    );
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge_pair, bench_merge_many, bench_merge_tree);

criterion_main!(benches);
