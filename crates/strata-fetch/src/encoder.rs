//! Row encoding.
//!
//! Produces the key-value pairs a table row is stored as, in the layout the
//! fetcher decodes. Used to load stores for tests and benchmarks, and by
//! callers that write rows through a [`KvSource`](strata_kv::KvSource)
//! implementation of their own.
//!
//! # Encoding Format
//!
//! ## Primary index
//! One pair per column family:
//! - Key: interleave prefix, table/index ids, primary key columns, family
//!   suffix
//! - Value: the family's non-key columns as a tagged tuple, ascending by
//!   column id, NULLs omitted
//!
//! Family 0 is always written, even with an empty tuple, so that every row
//! has at least one pair. Other families are omitted when all their
//! columns are NULL.
//!
//! ## Secondary indexes
//! One pair per row, family 0 only:
//! - Non-unique: key columns, then the primary key columns the index lacks
//!   (the extra columns), then the suffix. The value holds the STORING
//!   tuple.
//! - Unique: key columns, the extra columns only if some key column is
//!   NULL, then the suffix. The value holds the key-encoded extra columns
//!   followed by the STORING tuple.

use strata_common::types::{ColumnId, FamilyId, Key, Value};
use strata_encoding::key::{encode_key_datum, INTERLEAVED_SENTINEL};
use strata_encoding::value::encode_value_datum;
use strata_encoding::{Datum, Direction};
use strata_kv::KvPair;

use crate::descriptor::{IndexDescriptor, TableDescriptor};
use crate::error::EncodeError;
use crate::keys::{encode_family_suffix, encode_index_ids};

/// Encodes rows of one table.
#[derive(Debug, Clone, Copy)]
pub struct RowEncoder<'a> {
    table: &'a TableDescriptor,
}

impl<'a> RowEncoder<'a> {
    /// Creates an encoder for `table`.
    #[must_use]
    pub fn new(table: &'a TableDescriptor) -> Self {
        Self { table }
    }

    /// Encodes a row into its primary index pairs followed by one pair per
    /// secondary index.
    ///
    /// `row` holds one datum per column, in column order.
    pub fn encode_row(&self, row: &[Datum]) -> Result<Vec<KvPair>, EncodeError> {
        let mut pairs = self.encode_primary(row)?;
        for index in &self.table.indexes {
            pairs.push(self.encode_secondary(index, row)?);
        }
        Ok(pairs)
    }

    /// Encodes a row's primary index pairs, one per non-empty family.
    pub fn encode_primary(&self, row: &[Datum]) -> Result<Vec<KvPair>, EncodeError> {
        self.check_row(row)?;

        let index = &self.table.primary_index;
        let mut prefix = Vec::with_capacity(32);
        self.encode_index_prefix(&mut prefix, index, row);

        let mut pairs = Vec::with_capacity(self.table.families.len());
        for family in &self.table.families {
            let mut ids: Vec<ColumnId> = family
                .column_ids
                .iter()
                .copied()
                .filter(|id| !index.contains_column(*id))
                .collect();
            ids.sort_unstable();

            let value = self.encode_tuple(&ids, row);
            if value.is_empty() && family.id != FamilyId::PRIMARY {
                continue;
            }

            let mut key = prefix.clone();
            encode_family_suffix(&mut key, family.id);
            pairs.push(KvPair::new(Key::from_vec(key), Value::from_vec(value)));
        }
        Ok(pairs)
    }

    /// Encodes a row's pair for a secondary index.
    pub fn encode_secondary(&self, index: &IndexDescriptor, row: &[Datum]) -> Result<KvPair, EncodeError> {
        self.check_row(row)?;

        let mut key = Vec::with_capacity(32);
        self.encode_index_prefix(&mut key, index, row);

        let extras = self.table.extra_columns(index);
        let mut encoded_extras = Vec::new();
        for id in &extras {
            encode_key_datum(&mut encoded_extras, self.datum(row, *id), Direction::Ascending);
        }

        let key_has_null = index.column_ids.iter().any(|id| self.datum(row, *id).is_null());
        let mut value = Vec::new();
        if index.unique {
            if key_has_null {
                key.extend_from_slice(&encoded_extras);
            }
            value.extend_from_slice(&encoded_extras);
        } else {
            key.extend_from_slice(&encoded_extras);
        }
        encode_family_suffix(&mut key, FamilyId::PRIMARY);

        let mut storing = index.storing.clone();
        storing.sort_unstable();
        value.extend_from_slice(&self.encode_tuple(&storing, row));

        Ok(KvPair::new(Key::from_vec(key), Value::from_vec(value)))
    }

    /// Writes the interleave prefix, own identifiers and key columns.
    fn encode_index_prefix(&self, buf: &mut Vec<u8>, index: &IndexDescriptor, row: &[Datum]) {
        let mut columns = index.column_ids.iter().zip(&index.directions);
        for ancestor in &index.interleave {
            encode_index_ids(buf, ancestor.table_id, ancestor.index_id);
            for (id, direction) in columns.by_ref().take(ancestor.shared_prefix_len) {
                encode_key_datum(buf, self.datum(row, *id), *direction);
            }
            buf.push(INTERLEAVED_SENTINEL);
        }
        encode_index_ids(buf, self.table.id, index.id);
        for (id, direction) in columns {
            encode_key_datum(buf, self.datum(row, *id), *direction);
        }
    }

    /// Encodes the non-NULL columns among `ids` as a tagged tuple. `ids`
    /// must be ascending.
    fn encode_tuple(&self, ids: &[ColumnId], row: &[Datum]) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut last = 0;
        for id in ids {
            let datum = self.datum(row, *id);
            if datum.is_null() {
                continue;
            }
            encode_value_datum(&mut buf, id.as_u32() - last, datum);
            last = id.as_u32();
        }
        buf
    }

    fn datum<'r>(&self, row: &'r [Datum], id: ColumnId) -> &'r Datum {
        self.table
            .column_ordinal(id)
            .and_then(|ordinal| row.get(ordinal))
            .unwrap_or(&Datum::Null)
    }

    fn check_row(&self, row: &[Datum]) -> Result<(), EncodeError> {
        if row.len() != self.table.columns.len() {
            return Err(EncodeError::Arity {
                table: self.table.name.clone(),
                expected: self.table.columns.len(),
                actual: row.len(),
            });
        }
        for (column, datum) in self.table.columns.iter().zip(row) {
            match datum.column_type() {
                None if !column.nullable || self.table.is_primary_key_column(column.id) => {
                    return Err(EncodeError::NullViolation {
                        table: self.table.name.clone(),
                        column: column.name.clone(),
                    });
                }
                Some(datum_type) if datum_type != column.ty => {
                    return Err(EncodeError::TypeMismatch {
                        column: column.name.clone(),
                        column_type: column.ty,
                        datum_type,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_common::types::IndexId;
    use strata_encoding::ColumnType;

    use super::*;
    use crate::descriptor::{ColumnDescriptor, FamilyDescriptor, InterleaveAncestor};

    fn kv_table() -> TableDescriptor {
        TableDescriptor::new(51, "t")
            .with_column(ColumnDescriptor::not_null(1, "k", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(2, "v", ColumnType::Int))
            .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
            .build()
            .unwrap()
    }

    #[test]
    fn test_primary_layout() {
        let table = kv_table();
        let pairs = RowEncoder::new(&table)
            .encode_row(&[Datum::Int(1), Datum::Int(5)])
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key.as_bytes(), &[0xbb, 0x89, 0x89, 0x88, 0x89]);
        assert_eq!(pairs[0].value.as_bytes(), &[0x23, 0x0a]);
    }

    #[test]
    fn test_null_values_are_omitted() {
        let table = kv_table();
        let pairs = RowEncoder::new(&table)
            .encode_row(&[Datum::Int(1), Datum::Null])
            .unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].value.as_bytes().is_empty());
    }

    #[test]
    fn test_families() {
        let table = TableDescriptor::new(51, "t")
            .with_column(ColumnDescriptor::not_null(1, "k", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(2, "a", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(3, "b", ColumnType::String))
            .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
            .with_family(FamilyDescriptor::new(0, "primary", vec![ColumnId::new(1), ColumnId::new(2)]))
            .with_family(FamilyDescriptor::new(1, "b", vec![ColumnId::new(3)]))
            .build()
            .unwrap();
        let encoder = RowEncoder::new(&table);

        let pairs = encoder
            .encode_primary(&[Datum::Int(1), Datum::Null, Datum::from("x")])
            .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(&pairs[1].key.as_bytes()[3..], &[0x89, 0x89]);

        let pairs = encoder
            .encode_primary(&[Datum::Int(1), Datum::Int(2), Datum::Null])
            .unwrap();
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_secondary_layouts() {
        let table = TableDescriptor::new(51, "t")
            .with_column(ColumnDescriptor::not_null(1, "k", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(2, "a", ColumnType::Int))
            .with_column(ColumnDescriptor::nullable(3, "b", ColumnType::Int))
            .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
            .with_index(IndexDescriptor::new(2, "a_idx").with_column(2, Direction::Ascending))
            .with_index(
                IndexDescriptor::new(3, "a_uniq")
                    .with_column(2, Direction::Ascending)
                    .unique()
                    .storing([ColumnId::new(3)]),
            )
            .build()
            .unwrap();
        let encoder = RowEncoder::new(&table);
        let non_unique = table.index(IndexId::new(2)).unwrap();
        let unique = table.index(IndexId::new(3)).unwrap();

        let row = [Datum::Int(1), Datum::Int(2), Datum::Int(3)];
        let pair = encoder.encode_secondary(non_unique, &row).unwrap();
        assert_eq!(pair.key.as_bytes(), &[0xbb, 0x8a, 0x8a, 0x89, 0x88, 0x89]);
        assert!(pair.value.as_bytes().is_empty());

        let pair = encoder.encode_secondary(unique, &row).unwrap();
        assert_eq!(pair.key.as_bytes(), &[0xbb, 0x8b, 0x8a, 0x88, 0x89]);
        assert_eq!(pair.value.as_bytes(), &[0x89, 0x33, 0x06]);

        let row = [Datum::Int(1), Datum::Null, Datum::Null];
        let pair = encoder.encode_secondary(unique, &row).unwrap();
        assert_eq!(pair.key.as_bytes(), &[0xbb, 0x8b, 0x00, 0x89, 0x88, 0x89]);
        assert_eq!(pair.value.as_bytes(), &[0x89]);
    }

    #[test]
    fn test_interleaved_prefix() {
        let table = TableDescriptor::new(52, "child")
            .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
            .with_column(ColumnDescriptor::not_null(2, "c", ColumnType::Int))
            .with_primary_index(
                IndexDescriptor::primary()
                    .with_column(1, Direction::Ascending)
                    .with_column(2, Direction::Descending)
                    .interleaved_in(vec![InterleaveAncestor::new(51, 1, 1)]),
            )
            .build()
            .unwrap();
        let pairs = RowEncoder::new(&table)
            .encode_row(&[Datum::Int(3), Datum::Int(4)])
            .unwrap();
        let key = pairs[0].key.as_bytes();
        assert_eq!(&key[..4], &[0xbb, 0x89, 0x8b, INTERLEAVED_SENTINEL]);
        assert_eq!(&key[4..6], &[0xbc, 0x89]);
        assert_eq!(&key[key.len() - 2..], &[0x88, 0x89]);
    }

    #[test]
    fn test_rejects_bad_rows() {
        let table = kv_table();
        let encoder = RowEncoder::new(&table);
        assert!(matches!(
            encoder.encode_row(&[Datum::Int(1)]),
            Err(EncodeError::Arity { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            encoder.encode_row(&[Datum::Null, Datum::Int(1)]),
            Err(EncodeError::NullViolation { .. })
        ));
        assert!(matches!(
            encoder.encode_row(&[Datum::Int(1), Datum::from("x")]),
            Err(EncodeError::TypeMismatch { datum_type: ColumnType::String, .. })
        ));
    }
}
