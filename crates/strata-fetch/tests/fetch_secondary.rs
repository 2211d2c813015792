//! Scans of secondary indexes.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::*;
use strata_common::types::{ColumnId, IndexId};
use strata_encoding::{Datum, Direction};
use strata_fetch::{IndexDescriptor, IndexKind, OwnedRow, Projection, Registry, ScanEntryArgs, TableDescriptor};
use strata_kv::MemKvStore;

const INDEXED_ROWS: usize = 422;
const NULL_ROWS: usize = 20;
const MODULO: i64 = 20;

struct Case {
    table: Arc<TableDescriptor>,
    unique: bool,
    storing: bool,
}

/// (p INT PRIMARY KEY, idx INT, s INT) with index 2 on idx. The non-unique
/// table also has index 3 on idx descending.
fn case(id: u32, name: &str, unique: bool, storing: bool) -> Case {
    let mut index = IndexDescriptor::new(2, "idx").with_column(2, Direction::Ascending);
    if unique {
        index = index.unique();
    }
    if storing {
        index = index.storing([ColumnId::new(3)]);
    }
    let mut table = int_table(id, name, &["p", "idx", "s"], 1, vec![]).with_index(index);
    if !unique && !storing {
        table = table.with_index(IndexDescriptor::new(3, "idx_desc").with_column(2, Direction::Descending));
    }
    Case {
        table: Arc::new(table.build().unwrap()),
        unique,
        storing,
    }
}

fn cases() -> Vec<Case> {
    vec![
        case(61, "nonunique", false, false),
        case(62, "unique", true, false),
        case(63, "nonuniquestoring", false, true),
        case(64, "uniquestoring", true, true),
    ]
}

fn expected_idx(unique: bool, p: i64) -> Datum {
    if p >= INDEXED_ROWS as i64 {
        Datum::Null
    } else if unique {
        Datum::Int(p)
    } else {
        Datum::Int(p % MODULO)
    }
}

fn load_cases(cases: &[Case]) -> MemKvStore {
    let store = MemKvStore::new();
    for case in cases {
        let rows: Vec<Vec<Datum>> = (0..(INDEXED_ROWS + NULL_ROWS) as i64)
            .map(|p| vec![Datum::Int(p), expected_idx(case.unique, p), Datum::Int(p * 2)])
            .collect();
        load(&store, &case.table, &rows);
    }
    store
}

fn index_registry(case: &Case, index: IndexId) -> Arc<Registry> {
    let projection = if case.storing {
        Projection::all(&case.table)
    } else {
        Projection::columns(&case.table, &[ColumnId::new(1), ColumnId::new(2)]).unwrap()
    };
    let args = ScanEntryArgs::secondary(case.table.clone(), index, projection).unwrap();
    Arc::new(Registry::build(vec![args]).unwrap())
}

fn check_rows(case: &Case, rows: &[OwnedRow]) {
    assert_eq!(rows.len(), INDEXED_ROWS + NULL_ROWS, "table {}", case.table.name);

    let mut keys = BTreeSet::new();
    let mut nulls = 0;
    for row in rows {
        let p = int(&row.datums[0]);
        keys.insert(p);
        assert_eq!(row.datums[1], expected_idx(case.unique, p), "p = {p}");
        if row.datums[1].is_null() {
            nulls += 1;
        }
        if case.storing {
            assert_eq!(row.datums[2], Datum::Int(p * 2));
        } else {
            assert_eq!(row.datums[2], Datum::Null);
        }
    }
    assert_eq!(nulls, NULL_ROWS);
    assert_eq!(keys, (0..(INDEXED_ROWS + NULL_ROWS) as i64).collect());
}

fn indexed_values(rows: &[OwnedRow]) -> Vec<Option<i64>> {
    rows.iter().map(|r| r.datums[1].as_int()).collect()
}

#[tokio::test]
async fn test_secondary_index_scans() {
    let cases = cases();
    let store = load_cases(&cases);

    for case in &cases {
        let registry = index_registry(case, IndexId::new(2));
        let expected_kind = if case.unique {
            IndexKind::UniqueSecondary
        } else {
            IndexKind::NonUniqueSecondary
        };
        assert_eq!(registry.entries()[0].kind(), expected_kind);

        let span = case.table.index_span(IndexId::new(2)).unwrap();
        let rows = scan(registry.clone(), &store, vec![span.clone()], test_options())
            .await
            .unwrap();
        check_rows(case, &rows);
        // NULL sorts first ascending.
        let values = indexed_values(&rows);
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "table {}", case.table.name);
        assert!(values[..NULL_ROWS].iter().all(Option::is_none));

        let rows = scan(registry, &store, vec![span], test_options().with_reverse(true))
            .await
            .unwrap();
        check_rows(case, &rows);
        let values = indexed_values(&rows);
        assert!(values.windows(2).all(|w| w[0] >= w[1]), "table {}", case.table.name);
    }
}

#[tokio::test]
async fn test_descending_index_order() {
    let cases = cases();
    let store = load_cases(&cases);
    let case = &cases[0];

    let registry = index_registry(case, IndexId::new(3));
    let span = case.table.index_span(IndexId::new(3)).unwrap();
    let rows = scan(registry, &store, vec![span], test_options()).await.unwrap();
    check_rows(case, &rows);

    // Descending keys put the NULL marker last.
    let values = indexed_values(&rows);
    assert!(values[..INDEXED_ROWS].iter().all(Option::is_some));
    let present: Vec<i64> = values.iter().flatten().copied().collect();
    assert!(present.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_primary_and_secondary_together() {
    let cases = cases();
    let store = load_cases(&cases);
    let case = &cases[3];
    let table = &case.table;

    let registry = Arc::new(
        Registry::build(vec![
            ScanEntryArgs::primary(table.clone(), Projection::all(table)),
            ScanEntryArgs::secondary(table.clone(), IndexId::new(2), Projection::all(table)).unwrap(),
        ])
        .unwrap(),
    );
    let spans = vec![table.primary_span(), table.index_span(IndexId::new(2)).unwrap()];
    let rows = scan(registry.clone(), &store, spans, test_options()).await.unwrap();

    let (primary, secondary): (Vec<OwnedRow>, Vec<OwnedRow>) =
        rows.into_iter().partition(|r| r.entry == registry.entries()[0].id());
    assert_eq!(primary.len(), INDEXED_ROWS + NULL_ROWS);
    check_rows(case, &primary);
    check_rows(case, &secondary);
}

#[tokio::test]
async fn test_table_span_covers_every_index() {
    let cases = cases();
    let store = load_cases(&cases);
    let case = &cases[0];

    // Every index of the table shares the table span, so only registered
    // roots may appear in it.
    let registry = index_registry(case, IndexId::new(2));
    let err = scan(registry, &store, vec![case.table.table_span()], test_options())
        .await
        .unwrap_err();
    assert!(err.as_decode().is_some());
}
