//! Shared helpers for the fetcher integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use strata_common::config::FetchConfig;
use strata_encoding::{ColumnType, Datum, Direction};
use strata_fetch::{
    ColumnDescriptor, FetchResult, IndexDescriptor, InterleaveAncestor, OwnedRow, Registry, RowEncoder, RowFetcher,
    ScanEntryArgs, ScanOptions, TableDescriptor,
};
use strata_kv::{KvSource, MemKvStore, Span};

/// Produces a column value from a row number.
pub type ValueFn = Box<dyn Fn(usize) -> Datum>;

/// The row number itself.
pub fn row_index() -> ValueFn {
    Box::new(|row| Datum::Int(row as i64))
}

/// The row number modulo `modulo`.
pub fn row_modulo(modulo: usize) -> ValueFn {
    Box::new(move |row| Datum::Int((row % modulo) as i64))
}

/// The row number plus `shift`, modulo `modulo`.
pub fn row_modulo_shifted(modulo: usize, shift: usize) -> ValueFn {
    Box::new(move |row| Datum::Int(((row + shift) % modulo) as i64))
}

/// Generates `rows` rows, one column per generator.
pub fn generate(rows: usize, columns: &[ValueFn]) -> Vec<Vec<Datum>> {
    (0..rows)
        .map(|row| columns.iter().map(|column| column(row)).collect())
        .collect()
}

/// Writes rows through the table's encoder.
pub fn load(store: &MemKvStore, table: &TableDescriptor, rows: &[Vec<Datum>]) {
    let encoder = RowEncoder::new(table);
    for row in rows {
        store.put_all(encoder.encode_row(row).unwrap());
    }
}

/// An INT table whose primary key is its first `pk` columns, interleaved
/// below `ancestors`.
pub fn int_table(
    id: u32,
    name: &str,
    columns: &[&str],
    pk: usize,
    ancestors: Vec<InterleaveAncestor>,
) -> TableDescriptor {
    let mut table = TableDescriptor::new(id, name);
    let mut primary = IndexDescriptor::primary();
    for (i, column) in columns.iter().enumerate() {
        let column_id = i as u32 + 1;
        if i < pk {
            table = table.with_column(ColumnDescriptor::not_null(column_id, *column, ColumnType::Int));
            primary = primary.with_column(column_id, Direction::Ascending);
        } else {
            table = table.with_column(ColumnDescriptor::nullable(column_id, *column, ColumnType::Int));
        }
    }
    table.with_primary_index(primary.interleaved_in(ancestors))
}

/// Options with tiny batches so rows straddle batch boundaries.
pub fn test_options() -> ScanOptions {
    ScanOptions::from_config(&FetchConfig::for_testing())
}

/// Builds a registry over primary indexes with every column projected.
pub fn primary_registry(tables: &[&Arc<TableDescriptor>]) -> Arc<Registry> {
    let args = tables
        .iter()
        .map(|table| ScanEntryArgs::primary(Arc::clone(table), strata_fetch::Projection::all(table)))
        .collect();
    Arc::new(Registry::build(args).unwrap())
}

/// Runs a scan to completion, copying every row out.
pub async fn scan(
    registry: Arc<Registry>,
    source: &dyn KvSource,
    spans: Vec<Span>,
    options: ScanOptions,
) -> FetchResult<Vec<OwnedRow>> {
    let mut fetcher = RowFetcher::start_scan(registry, source, spans, options)?;
    let mut rows = Vec::new();
    while let Some(row) = fetcher.next_row_owned().await? {
        rows.push(row);
    }
    assert!(fetcher.next_row().await?.is_none());
    Ok(rows)
}

/// Reads an INT datum that must not be NULL.
pub fn int(datum: &Datum) -> i64 {
    datum.as_int().unwrap()
}
