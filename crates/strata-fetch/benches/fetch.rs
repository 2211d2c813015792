//! Row fetcher benchmarks.
//!
//! Benchmarks for:
//! - Full primary index scans
//! - Scans with a narrow projection
//! - Scans of an interleaved parent/child hierarchy

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_common::types::ColumnId;
use strata_encoding::{ColumnType, Datum, Direction};
use strata_fetch::{
    ColumnDescriptor, IndexDescriptor, InterleaveAncestor, Projection, Registry, RowEncoder, RowFetcher,
    ScanEntryArgs, ScanOptions, TableDescriptor,
};
use strata_kv::{MemKvStore, Span};
use tokio::runtime::Runtime;

/// (k INT PRIMARY KEY, a INT, b STRING, c FLOAT)
fn wide_table() -> Arc<TableDescriptor> {
    Arc::new(
        TableDescriptor::new(51, "wide")
            .with_column(ColumnDescriptor::not_null(1, "k", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(2, "a", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(3, "b", ColumnType::String))
            .with_column(ColumnDescriptor::nullable(4, "c", ColumnType::Float))
            .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
            .build()
            .unwrap(),
    )
}

fn load_wide(table: &TableDescriptor, rows: usize) -> MemKvStore {
    let mut rng = StdRng::seed_from_u64(42);
    let store = MemKvStore::new();
    let encoder = RowEncoder::new(table);
    for k in 0..rows as i64 {
        let b: String = (0..16).map(|_| rng.gen_range(b'a'..=b'z') as char).collect();
        let row = [Datum::Int(k), Datum::Int(rng.gen()), Datum::from(b), Datum::Float(rng.gen())];
        store.put_all(encoder.encode_row(&row).unwrap());
    }
    store
}

async fn drain(registry: Arc<Registry>, store: &MemKvStore, spans: Vec<Span>) -> usize {
    let mut fetcher = RowFetcher::start_scan(registry, store, spans, ScanOptions::default()).unwrap();
    let mut rows = 0;
    while let Some(row) = fetcher.next_row().await.unwrap() {
        black_box(row.datums());
        rows += 1;
    }
    rows
}

/// Benchmark full scans projecting every column.
fn bench_primary_scan(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("fetch/primary_scan");
    let table = wide_table();

    for size in [1000, 10_000].iter() {
        let store = load_wide(&table, *size);
        let registry = Arc::new(
            Registry::build(vec![ScanEntryArgs::primary(table.clone(), Projection::all(&table))]).unwrap(),
        );

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.to_async(&runtime)
                .iter(|| drain(registry.clone(), &store, vec![table.primary_span()]));
        });
    }

    group.finish();
}

/// Benchmark full scans decoding a single column.
fn bench_narrow_projection(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("fetch/narrow_projection");
    let table = wide_table();
    let size = 10_000;
    let store = load_wide(&table, size);

    let projection = Projection::columns(&table, &[ColumnId::new(2)]).unwrap();
    let registry = Arc::new(Registry::build(vec![ScanEntryArgs::primary(table.clone(), projection)]).unwrap());

    group.throughput(Throughput::Elements(size as u64));
    group.bench_function("one_of_four", |b| {
        b.to_async(&runtime)
            .iter(|| drain(registry.clone(), &store, vec![table.primary_span()]));
    });

    group.finish();
}

/// Benchmark a parent/child scan where the child is or is not registered.
fn bench_interleaved_scan(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let mut group = c.benchmark_group("fetch/interleaved_scan");

    let parent = Arc::new(
        TableDescriptor::new(51, "parent")
            .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(2, "v", ColumnType::Int))
            .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
            .build()
            .unwrap(),
    );
    let child = Arc::new(
        TableDescriptor::new(52, "child")
            .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
            .with_column(ColumnDescriptor::not_null(2, "c", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(3, "v", ColumnType::Int))
            .with_primary_index(
                IndexDescriptor::primary()
                    .with_column(1, Direction::Ascending)
                    .with_column(2, Direction::Ascending)
                    .interleaved_in(vec![InterleaveAncestor::new(51, 1, 1)]),
            )
            .build()
            .unwrap(),
    );

    let mut rng = StdRng::seed_from_u64(42);
    let store = MemKvStore::new();
    let parents = 1000i64;
    for p in 0..parents {
        store.put_all(RowEncoder::new(&parent).encode_row(&[Datum::Int(p), Datum::Int(rng.gen())]).unwrap());
        for c in 0..10 {
            let row = [Datum::Int(p), Datum::Int(c), Datum::Int(rng.gen())];
            store.put_all(RowEncoder::new(&child).encode_row(&row).unwrap());
        }
    }

    let both = Arc::new(
        Registry::build(vec![
            ScanEntryArgs::primary(parent.clone(), Projection::all(&parent)),
            ScanEntryArgs::primary(child.clone(), Projection::all(&child)),
        ])
        .unwrap(),
    );
    let parent_only =
        Arc::new(Registry::build(vec![ScanEntryArgs::primary(parent.clone(), Projection::all(&parent))]).unwrap());

    group.throughput(Throughput::Elements(store.len() as u64));
    for (name, registry) in [("parent_and_child", both), ("parent_only", parent_only)] {
        group.bench_function(name, |b| {
            b.to_async(&runtime)
                .iter(|| drain(registry.clone(), &store, vec![parent.primary_span()]));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_primary_scan, bench_narrow_projection, bench_interleaved_scan,);
criterion_main!(benches);
