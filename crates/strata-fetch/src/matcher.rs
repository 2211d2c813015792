//! Key to entry matching.
//!
//! Interleaving makes one entry's keys a strict extension of another's, so a
//! key is matched by walking the registry's prefix trie: after a node's
//! identifiers, skip the node's shared key columns and, if the interleave
//! sentinel follows, descend into the child named by the next identifier
//! pair. Work is bounded by the key's ancestry depth, not the registry size.

use strata_common::types::Key;
use strata_encoding::key::{peek_length, INTERLEAVED_SENTINEL};

use crate::error::{DecodeError, DecodeErrorKind};
use crate::keys::{decode_index_ids, typed_ids};
use crate::registry::{EntryId, PrefixNode, Registry};

/// Outcome of matching a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// The key belongs to a registered entry.
    Entry(EntryId),
    /// The key belongs to an unregistered table or index nested below a
    /// registered hierarchy root.
    Foreign,
}

impl Registry {
    /// Resolves the entry owning `key`.
    ///
    /// A key whose root identifiers match nothing registered lies outside
    /// the scan and is a decode error, as are undecodable identifiers.
    /// The walk stops at the deepest trie node with children, so a key
    /// interleaved below a leaf entry resolves to that entry; the key
    /// decoder then reports it as a descendant.
    pub fn match_key(&self, key: &Key) -> Result<KeyMatch, DecodeError> {
        let buf = key.as_bytes();
        let malformed = |err: strata_encoding::EncodingError, at: usize| {
            DecodeError::new(key, at + err.offset(), DecodeErrorKind::MalformedKey(err.at(at)))
        };

        let (table, index, mut pos) = decode_index_ids(buf).map_err(|e| malformed(e, 0))?;
        let mut node: &PrefixNode = typed_ids(table, index)
            .and_then(|ids| self.roots.get(&ids))
            .ok_or_else(|| {
                DecodeError::new(key, 0, DecodeErrorKind::OutOfScope {
                    table_id: table,
                    index_id: index,
                })
            })?;

        while !node.children.is_empty() {
            for _ in 0..node.shared_prefix_len.unwrap_or(0) {
                let len = peek_length(&buf[pos..]).map_err(|e| malformed(e, pos))?;
                pos += len;
            }
            if buf.get(pos) != Some(&INTERLEAVED_SENTINEL) {
                break;
            }
            pos += 1;

            let (table, index, len) = decode_index_ids(&buf[pos..]).map_err(|e| malformed(e, pos))?;
            pos += len;
            match typed_ids(table, index).and_then(|ids| node.children.get(&ids)) {
                Some(child) => node = child,
                None => return Ok(KeyMatch::Foreign),
            }
        }

        Ok(node.entry.map_or(KeyMatch::Foreign, KeyMatch::Entry))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_common::types::{FamilyId, IndexId, TableId};
    use strata_encoding::key::encode_key_datum;
    use strata_encoding::{ColumnType, Datum, Direction};

    use super::*;
    use crate::descriptor::{ColumnDescriptor, IndexDescriptor, InterleaveAncestor, TableDescriptor};
    use crate::keys::{encode_family_suffix, encode_index_ids};
    use crate::registry::{Projection, ScanEntryArgs};

    fn table(id: u32, columns: u32, ancestors: Vec<InterleaveAncestor>) -> Arc<TableDescriptor> {
        let mut t = TableDescriptor::new(id, format!("t{id}"));
        let mut pk = IndexDescriptor::primary();
        for c in 1..=columns {
            t = t.with_column(ColumnDescriptor::not_null(c, format!("c{c}"), ColumnType::Int));
            pk = pk.with_column(c, Direction::Ascending);
        }
        Arc::new(t.with_primary_index(pk.interleaved_in(ancestors)).build().unwrap())
    }

    /// parent(51) <- child(52) <- grandchild(53), all sharing the first
    /// column, the grandchild also sharing the second with the child.
    fn hierarchy() -> Vec<Arc<TableDescriptor>> {
        vec![
            table(51, 1, vec![]),
            table(52, 2, vec![InterleaveAncestor::new(51, 1, 1)]),
            table(53, 3, vec![InterleaveAncestor::new(51, 1, 1), InterleaveAncestor::new(52, 1, 1)]),
        ]
    }

    fn registry(tables: &[Arc<TableDescriptor>]) -> Registry {
        Registry::build(
            tables
                .iter()
                .map(|t| ScanEntryArgs::primary(t.clone(), Projection::all(t)))
                .collect(),
        )
        .unwrap()
    }

    fn int(buf: &mut Vec<u8>, v: i64) {
        encode_key_datum(buf, &Datum::Int(v), Direction::Ascending);
    }

    fn parent_key(a: i64) -> Key {
        let mut buf = Vec::new();
        encode_index_ids(&mut buf, TableId::new(51), IndexId::PRIMARY);
        int(&mut buf, a);
        encode_family_suffix(&mut buf, FamilyId::PRIMARY);
        Key::from_vec(buf)
    }

    fn child_key(a: i64, b: i64) -> Key {
        let mut buf = Vec::new();
        encode_index_ids(&mut buf, TableId::new(51), IndexId::PRIMARY);
        int(&mut buf, a);
        buf.push(INTERLEAVED_SENTINEL);
        encode_index_ids(&mut buf, TableId::new(52), IndexId::PRIMARY);
        int(&mut buf, b);
        encode_family_suffix(&mut buf, FamilyId::PRIMARY);
        Key::from_vec(buf)
    }

    fn grandchild_key(a: i64, b: i64, c: i64) -> Key {
        let mut buf = Vec::new();
        encode_index_ids(&mut buf, TableId::new(51), IndexId::PRIMARY);
        int(&mut buf, a);
        buf.push(INTERLEAVED_SENTINEL);
        encode_index_ids(&mut buf, TableId::new(52), IndexId::PRIMARY);
        int(&mut buf, b);
        buf.push(INTERLEAVED_SENTINEL);
        encode_index_ids(&mut buf, TableId::new(53), IndexId::PRIMARY);
        int(&mut buf, c);
        encode_family_suffix(&mut buf, FamilyId::PRIMARY);
        Key::from_vec(buf)
    }

    #[test]
    fn test_matches_deepest_entry() {
        let tables = hierarchy();
        let registry = registry(&tables);
        assert_eq!(registry.match_key(&parent_key(7)).unwrap(), KeyMatch::Entry(registry.entries()[0].id()));
        assert_eq!(registry.match_key(&child_key(7, 1000)).unwrap(), KeyMatch::Entry(registry.entries()[1].id()));
        assert_eq!(
            registry.match_key(&grandchild_key(-3, 2, 1)).unwrap(),
            KeyMatch::Entry(registry.entries()[2].id())
        );
    }

    #[test]
    fn test_unregistered_descendant() {
        let tables = hierarchy();

        // Below a leaf entry the key decoder tells descendants apart.
        let leaf = registry(&tables[..1]);
        let parent = KeyMatch::Entry(leaf.entries()[0].id());
        assert_eq!(leaf.match_key(&child_key(1, 2)).unwrap(), parent);
        assert_eq!(leaf.match_key(&grandchild_key(1, 2, 3)).unwrap(), parent);

        // Below an inner node the child identifiers are checked.
        let inner = registry(&[tables[0].clone(), tables[2].clone()]);
        assert_eq!(inner.match_key(&child_key(1, 2)).unwrap(), KeyMatch::Foreign);
        assert!(matches!(inner.match_key(&grandchild_key(1, 2, 3)).unwrap(), KeyMatch::Entry(_)));
    }

    #[test]
    fn test_unregistered_ancestor_is_foreign() {
        let tables = hierarchy();
        let registry = registry(&tables[2..]);
        assert_eq!(registry.match_key(&parent_key(1)).unwrap(), KeyMatch::Foreign);
        assert_eq!(registry.match_key(&child_key(1, 2)).unwrap(), KeyMatch::Foreign);
        assert!(matches!(registry.match_key(&grandchild_key(1, 2, 3)).unwrap(), KeyMatch::Entry(_)));
    }

    #[test]
    fn test_out_of_scope_root() {
        let tables = hierarchy();
        let registry = registry(&tables);
        let mut buf = Vec::new();
        encode_index_ids(&mut buf, TableId::new(99), IndexId::PRIMARY);
        let err = registry.match_key(&Key::from_vec(buf)).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::OutOfScope { table_id: 99, index_id: 1 });
    }

    #[test]
    fn test_malformed_identifiers() {
        let registry = registry(&hierarchy());
        let err = registry.match_key(&Key::from_bytes(&[0x12, 0x00])).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::MalformedKey(_)));
        assert_eq!(err.offset, 0);

        // Parent key cut inside its shared column.
        let err = registry.match_key(&Key::from_bytes(&[0xbb, 0x89, 0xf6])).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::MalformedKey(_)));
        assert_eq!(err.offset, 3);
    }
}
