//! Index key column decoding.

use strata_common::types::{IndexId, Key, TableId};
use strata_encoding::key::{decode_key_datum, peek_length, INTERLEAVED_SENTINEL};
use strata_encoding::{Datum, EncodingError};

use crate::error::{DecodeError, DecodeErrorKind};
use crate::keys::decode_index_ids;
use crate::registry::{KeyColumn, ScanEntry};

/// Where an index key's column data ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyLayout {
    /// A key of the entry itself.
    Row {
        /// Offset just past the last index key column.
        cols_end: usize,
        /// Whether any index key column was NULL.
        has_null: bool,
    },
    /// A key of a table interleaved below the entry.
    Descendant,
}

/// Decodes the index key columns of `key` into `row`.
///
/// Walks the interleave ancestry, checking identifiers and sentinels, then
/// the entry's own identifiers and remaining key columns. Projected columns
/// are decoded into their row positions; the rest are only measured.
pub(crate) fn decode_index_key(entry: &ScanEntry, key: &Key, row: &mut [Datum]) -> Result<KeyLayout, DecodeError> {
    let buf = key.as_bytes();
    let columns = &entry.key_columns;
    let mut next = 0;
    let mut pos = 0;
    let mut has_null = false;

    for ancestor in &entry.index().interleave {
        pos = expect_ids(entry, key, pos, ancestor.table_id, ancestor.index_id)?;
        let shared_end = (next + ancestor.shared_prefix_len).min(columns.len());
        let shared = &columns[next..shared_end];
        let (end, null) = decode_key_columns(entry, key, buf, pos, shared, Some(&mut *row), DecodeErrorKind::MalformedKey)?;
        has_null |= null;
        next = shared_end;
        pos = end;
        if buf.get(pos) != Some(&INTERLEAVED_SENTINEL) {
            return Err(entry.decode_error(key, pos, DecodeErrorKind::MissingSentinel));
        }
        pos += 1;
    }

    pos = expect_ids(entry, key, pos, entry.table().id, entry.index().id)?;
    let (cols_end, null) =
        decode_key_columns(entry, key, buf, pos, &columns[next..], Some(row), DecodeErrorKind::MalformedKey)?;
    has_null |= null;

    if buf.get(cols_end) == Some(&INTERLEAVED_SENTINEL) {
        return Ok(KeyLayout::Descendant);
    }
    Ok(KeyLayout::Row { cols_end, has_null })
}

/// Decodes a run of key-encoded columns from `buf` starting at `pos`.
///
/// `buf` is the key itself or, for extra columns of unique indexes, the
/// value; `wrap` picks the matching error kind. With `row` absent every
/// column is skipped. Returns the end offset and whether any column was
/// NULL.
pub(crate) fn decode_key_columns(
    entry: &ScanEntry,
    key: &Key,
    buf: &[u8],
    mut pos: usize,
    columns: &[KeyColumn],
    mut row: Option<&mut [Datum]>,
    wrap: fn(EncodingError) -> DecodeErrorKind,
) -> Result<(usize, bool), DecodeError> {
    let mut has_null = false;
    for column in columns {
        let rest = &buf[pos..];
        has_null |= rest.first() == Some(&column.direction.null_marker());
        let decoded = match row.as_deref_mut() {
            Some(row) if column.needed => decode_key_datum(rest, column.ty, column.direction).map(|(datum, len)| {
                row[column.ordinal] = datum;
                len
            }),
            _ => peek_length(rest),
        };
        let len = decoded.map_err(|e| {
            entry
                .decode_error(key, pos + e.offset(), wrap(e.at(pos)))
                .in_column(entry.column_name(column.ordinal))
        })?;
        pos += len;
    }
    Ok((pos, has_null))
}

fn expect_ids(entry: &ScanEntry, key: &Key, pos: usize, table: TableId, index: IndexId) -> Result<usize, DecodeError> {
    let (found_table, found_index, len) = decode_index_ids(&key.as_bytes()[pos..])
        .map_err(|e| entry.decode_error(key, pos + e.offset(), DecodeErrorKind::MalformedKey(e.at(pos))))?;
    if found_table != table.as_u64() || found_index != index.as_u64() {
        return Err(entry.decode_error(
            key,
            pos,
            DecodeErrorKind::IdentifierMismatch {
                expected_table: table,
                expected_index: index,
                found_table,
                found_index,
            },
        ));
    }
    Ok(pos + len)
}
