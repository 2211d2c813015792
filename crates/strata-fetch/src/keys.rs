//! Index key layout helpers.
//!
//! ```text
//! /<ancestor table>/<ancestor index>/<shared columns>/0xfe  (per ancestor)
//! /<table>/<index>/<remaining key columns>/<family suffix>
//! ```
//!
//! The family suffix is the family id followed by the length of its own
//! encoding, both as ascending unsigned varints.

use strata_common::types::{FamilyId, IndexId, TableId};
use strata_encoding::key::{decode_uvarint_ascending, encode_uvarint_ascending};
use strata_encoding::EncodingResult;

/// Appends a table/index identifier pair.
pub fn encode_index_ids(buf: &mut Vec<u8>, table: TableId, index: IndexId) {
    encode_uvarint_ascending(buf, table.as_u64());
    encode_uvarint_ascending(buf, index.as_u64());
}

/// Decodes a raw identifier pair, returning the table id, index id and the
/// number of bytes read. Ids are returned unnarrowed so that out-of-range
/// values can still be reported.
pub(crate) fn decode_index_ids(buf: &[u8]) -> EncodingResult<(u64, u64, usize)> {
    let (table, n) = decode_uvarint_ascending(buf)?;
    let (index, m) = decode_uvarint_ascending(&buf[n..]).map_err(|e| e.at(n))?;
    Ok((table, index, n + m))
}

/// Narrows raw identifiers to typed ids.
pub(crate) fn typed_ids(table: u64, index: u64) -> Option<(TableId, IndexId)> {
    let table = u32::try_from(table).ok()?;
    let index = u32::try_from(index).ok()?;
    Some((TableId::new(table), IndexId::new(index)))
}

/// Appends a column family suffix.
pub fn encode_family_suffix(buf: &mut Vec<u8>, family: FamilyId) {
    let start = buf.len();
    encode_uvarint_ascending(buf, family.as_u64());
    let len = (buf.len() - start) as u64;
    encode_uvarint_ascending(buf, len);
}

/// Parses `buf` as exactly one family suffix.
pub(crate) fn parse_family_suffix(buf: &[u8]) -> Option<FamilyId> {
    let (family, n) = decode_uvarint_ascending(buf).ok()?;
    let (len, m) = decode_uvarint_ascending(&buf[n..]).ok()?;
    if len != n as u64 || n + m != buf.len() {
        return None;
    }
    u32::try_from(family).ok().map(FamilyId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_ids() {
        let mut buf = Vec::new();
        encode_index_ids(&mut buf, TableId::new(51), IndexId::PRIMARY);
        assert_eq!(buf, vec![0xbb, 0x89]);

        encode_index_ids(&mut buf, TableId::new(1000), IndexId::new(2));
        let (table, index, len) = decode_index_ids(&buf[2..]).unwrap();
        assert_eq!((table, index), (1000, 2));
        assert_eq!(len, buf.len() - 2);
    }

    #[test]
    fn test_decode_ids_truncated() {
        let err = decode_index_ids(&[0xf6]).unwrap_err();
        assert_eq!(err.offset(), 1);
        assert!(decode_index_ids(&[0xbb]).is_err());
    }

    #[test]
    fn test_typed_ids_range() {
        assert_eq!(typed_ids(7, 1), Some((TableId::new(7), IndexId::PRIMARY)));
        assert!(typed_ids(u64::from(u32::MAX) + 1, 1).is_none());
    }

    #[test]
    fn test_family_suffix() {
        let mut buf = Vec::new();
        encode_family_suffix(&mut buf, FamilyId::PRIMARY);
        assert_eq!(buf, vec![0x88, 0x89]);
        assert_eq!(parse_family_suffix(&buf), Some(FamilyId::PRIMARY));

        let mut wide = Vec::new();
        encode_family_suffix(&mut wide, FamilyId::new(300));
        assert_eq!(wide.len(), 4);
        assert_eq!(parse_family_suffix(&wide), Some(FamilyId::new(300)));
    }

    #[test]
    fn test_family_suffix_rejects_garbage() {
        assert!(parse_family_suffix(&[]).is_none());
        assert!(parse_family_suffix(&[0x88]).is_none());
        // Declared length does not match.
        assert!(parse_family_suffix(&[0x88, 0x8a]).is_none());
        // Trailing bytes.
        assert!(parse_family_suffix(&[0x88, 0x89, 0x00]).is_none());
        assert!(parse_family_suffix(&[0xfe]).is_none());
    }
}
