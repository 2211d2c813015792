//! Value decoding for primary and secondary index entries.

use strata_common::types::{ColumnId, Key};
use strata_encoding::value::{decode_value_datum, decode_value_tag, skip_value_payload};
use strata_encoding::{Datum, EncodingError};

use crate::error::{DecodeError, DecodeErrorKind};
use crate::key_decoder::decode_key_columns;
use crate::keys::parse_family_suffix;
use crate::registry::{IndexKind, ScanEntry};

/// Decodes everything after the index key columns: the remainder of the
/// key and the value.
///
/// `cols_end` is where the index key columns end in `key`; `has_null`
/// reports whether any of them was NULL.
pub(crate) fn decode_value(
    entry: &ScanEntry,
    key: &Key,
    cols_end: usize,
    has_null: bool,
    value: &[u8],
    row: &mut [Datum],
) -> Result<(), DecodeError> {
    let buf = key.as_bytes();
    match entry.kind() {
        IndexKind::Primary => {
            check_family_suffix(entry, key, cols_end)?;
            decode_tuple(entry, key, value, 0, row)
        }
        IndexKind::NonUniqueSecondary => {
            let (end, _) = decode_key_columns(
                entry,
                key,
                buf,
                cols_end,
                &entry.extra_columns,
                Some(&mut *row),
                DecodeErrorKind::MalformedKey,
            )?;
            check_family_suffix(entry, key, end)?;
            decode_tuple(entry, key, value, 0, row)
        }
        IndexKind::UniqueSecondary => {
            // A NULL indexed value repeats the extra columns in the key to
            // keep the key unique. The value always has them.
            let mut end = cols_end;
            if has_null {
                (end, _) = decode_key_columns(
                    entry,
                    key,
                    buf,
                    cols_end,
                    &entry.extra_columns,
                    None,
                    DecodeErrorKind::MalformedKey,
                )?;
            }
            check_family_suffix(entry, key, end)?;
            let (extra_end, _) = decode_key_columns(
                entry,
                key,
                value,
                0,
                &entry.extra_columns,
                Some(&mut *row),
                DecodeErrorKind::MalformedValue,
            )?;
            decode_tuple(entry, key, &value[extra_end..], extra_end, row)
        }
    }
}

fn check_family_suffix(entry: &ScanEntry, key: &Key, pos: usize) -> Result<(), DecodeError> {
    match parse_family_suffix(&key.as_bytes()[pos..]) {
        Some(_) => Ok(()),
        None => Err(entry.decode_error(key, pos, DecodeErrorKind::InvalidFamilySuffix)),
    }
}

/// Decodes a column tuple into `row`.
///
/// Unprojected columns and columns dropped from the table are skipped
/// without decoding. `base` is the tuple's offset within the full value,
/// used for error offsets.
pub(crate) fn decode_tuple(
    entry: &ScanEntry,
    key: &Key,
    tuple: &[u8],
    base: usize,
    row: &mut [Datum],
) -> Result<(), DecodeError> {
    let table = entry.table();
    let value_error = |err: EncodingError, at: usize| {
        entry.decode_error(key, base + at + err.offset(), DecodeErrorKind::MalformedValue(err.at(base + at)))
    };

    let mut pos = 0;
    let mut column_id = 0u64;
    while pos < tuple.len() {
        let tag = decode_value_tag(&tuple[pos..]).map_err(|e| value_error(e, pos))?;
        column_id = column_id.saturating_add(tag.column_delta);
        let payload = pos + tag.len;
        let rest = &tuple[payload..];

        let ordinal = u32::try_from(column_id)
            .ok()
            .and_then(|id| entry.column_ordinal(ColumnId::new(id)));
        let len = match ordinal {
            Some(ordinal) if entry.projection().is_projected(ordinal) => {
                let column = &table.columns[ordinal];
                let (datum, len) = decode_value_datum(rest, tag.value_type, column.ty)
                    .map_err(|e| value_error(e, payload).in_column(&column.name))?;
                row[ordinal] = datum;
                len
            }
            Some(ordinal) => skip_value_payload(rest, tag.value_type)
                .map_err(|e| value_error(e, payload).in_column(entry.column_name(ordinal)))?,
            None if column_id >= table.next_column_id.as_u64() => {
                return Err(entry.decode_error(
                    key,
                    base + pos,
                    DecodeErrorKind::ColumnOutOfRange {
                        column_id,
                        next_column_id: table.next_column_id,
                    },
                ));
            }
            None => skip_value_payload(rest, tag.value_type).map_err(|e| value_error(e, payload))?,
        };
        pos = payload + len;
    }
    Ok(())
}
