//! Scan entry registry.
//!
//! A [`Registry`] is built once per scan from the (table, index, projection)
//! triples the caller wants rows for. Building precomputes everything the
//! hot path needs per entry (key column layout, column id to ordinal map,
//! index kind) and arranges the entries in a prefix trie keyed by
//! identifier pairs, one trie level per interleave ancestor. The registry
//! is immutable afterwards and shared through an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use strata_common::types::{ColumnId, IndexId, Key, TableId};
use strata_encoding::{ColumnType, Direction};
use tracing::debug;

use crate::descriptor::{IndexDescriptor, TableDescriptor};
use crate::error::{ConfigError, DecodeError, DecodeErrorKind};

// =============================================================================
// Projection
// =============================================================================

/// Which of a table's columns a scan materializes, by row position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    mask: Vec<bool>,
}

impl Projection {
    /// Projects every column of `table`.
    #[must_use]
    pub fn all(table: &TableDescriptor) -> Self {
        Self {
            mask: vec![true; table.columns.len()],
        }
    }

    /// Projects no column; rows still come back, with every datum NULL.
    #[must_use]
    pub fn none(table: &TableDescriptor) -> Self {
        Self {
            mask: vec![false; table.columns.len()],
        }
    }

    /// Uses a raw mask, one flag per column in row order. The width is
    /// checked when the registry is built.
    #[must_use]
    pub fn from_mask(mask: Vec<bool>) -> Self {
        Self { mask }
    }

    /// Projects the given columns.
    pub fn columns(table: &TableDescriptor, ids: &[ColumnId]) -> Result<Self, ConfigError> {
        let mut mask = vec![false; table.columns.len()];
        for id in ids {
            let ordinal = table.column_ordinal(*id).ok_or_else(|| ConfigError::UnknownColumn {
                table: table.name.clone(),
                column: *id,
            })?;
            mask[ordinal] = true;
        }
        Ok(Self { mask })
    }

    /// Returns true if the column at `ordinal` is projected.
    #[inline]
    #[must_use]
    pub fn is_projected(&self, ordinal: usize) -> bool {
        self.mask.get(ordinal).copied().unwrap_or(false)
    }

    /// Returns the mask width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.mask.len()
    }

    /// Returns the number of projected columns.
    #[must_use]
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|p| **p).count()
    }
}

// =============================================================================
// Entries
// =============================================================================

/// Identifies a registered entry by registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(usize);

impl EntryId {
    /// Returns the registration position.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// How an index lays out its key-value pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// One pair per column family; values are column tuples.
    Primary,
    /// Extra columns live in the value unless an indexed column is NULL.
    UniqueSecondary,
    /// Extra columns always live in the key.
    NonUniqueSecondary,
}

impl IndexKind {
    fn of(index: &IndexDescriptor) -> Self {
        if index.is_primary() {
            Self::Primary
        } else if index.unique {
            Self::UniqueSecondary
        } else {
            Self::NonUniqueSecondary
        }
    }
}

/// Caller input for one registry entry.
#[derive(Debug, Clone)]
pub struct ScanEntryArgs {
    /// The table.
    pub table: Arc<TableDescriptor>,
    /// The index to scan; must be one of the table's indexes.
    pub index: IndexDescriptor,
    /// Columns to materialize.
    pub projection: Projection,
}

impl ScanEntryArgs {
    /// Creates entry arguments.
    #[must_use]
    pub fn new(table: Arc<TableDescriptor>, index: IndexDescriptor, projection: Projection) -> Self {
        Self {
            table,
            index,
            projection,
        }
    }

    /// Scans the table's primary index.
    #[must_use]
    pub fn primary(table: Arc<TableDescriptor>, projection: Projection) -> Self {
        let index = table.primary_index.clone();
        Self::new(table, index, projection)
    }

    /// Scans a secondary index by id.
    pub fn secondary(
        table: Arc<TableDescriptor>,
        index_id: IndexId,
        projection: Projection,
    ) -> Result<Self, ConfigError> {
        let index = table.index(index_id).cloned().ok_or_else(|| ConfigError::IndexNotInTable {
            table: table.name.clone(),
            index: index_id,
        })?;
        Ok(Self::new(table, index, projection))
    }
}

/// Layout of one column encoded in a key.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KeyColumn {
    pub(crate) ordinal: usize,
    pub(crate) ty: ColumnType,
    pub(crate) direction: Direction,
    pub(crate) needed: bool,
}

/// A registered (table, index) pair with its decoding metadata.
#[derive(Debug)]
pub struct ScanEntry {
    id: EntryId,
    table: Arc<TableDescriptor>,
    index: IndexDescriptor,
    kind: IndexKind,
    projection: Projection,
    /// Row ordinal by column id.
    ordinals: Vec<Option<usize>>,
    pub(crate) key_columns: Vec<KeyColumn>,
    pub(crate) extra_columns: Vec<KeyColumn>,
}

impl ScanEntry {
    /// Returns the entry id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Returns the table.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// Returns the scanned index.
    #[inline]
    #[must_use]
    pub fn index(&self) -> &IndexDescriptor {
        &self.index
    }

    /// Returns the index kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Returns the projection.
    #[inline]
    #[must_use]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Returns the row position of a column, or `None` if the table has no
    /// such column.
    #[inline]
    #[must_use]
    pub fn column_ordinal(&self, id: ColumnId) -> Option<usize> {
        self.ordinals.get(id.as_usize()).copied().flatten()
    }

    /// Builds a decode error carrying this entry's table and index names.
    pub(crate) fn decode_error(&self, key: &Key, offset: usize, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(key, offset, kind).in_index(&self.table.name, &self.index.name)
    }

    pub(crate) fn column_name(&self, ordinal: usize) -> &str {
        &self.table.columns[ordinal].name
    }

    fn new(id: EntryId, args: ScanEntryArgs) -> Result<Self, ConfigError> {
        let ScanEntryArgs {
            table,
            index,
            projection,
        } = args;

        table.validate()?;
        if table.index(index.id) != Some(&index) {
            return Err(ConfigError::IndexNotInTable {
                table: table.name.clone(),
                index: index.id,
            });
        }
        if projection.width() != table.columns.len() {
            return Err(ConfigError::ProjectionWidth {
                table: table.name.clone(),
                width: projection.width(),
                columns: table.columns.len(),
            });
        }

        let mut ordinals = vec![None; table.next_column_id.as_usize()];
        for (ordinal, column) in table.columns.iter().enumerate() {
            ordinals[column.id.as_usize()] = Some(ordinal);
        }
        let layout = |id: ColumnId, direction: Direction| {
            let ordinal = ordinals[id.as_usize()].unwrap_or_default();
            KeyColumn {
                ordinal,
                ty: table.columns[ordinal].ty,
                direction,
                needed: projection.is_projected(ordinal),
            }
        };

        let key_columns: Vec<KeyColumn> = index
            .column_ids
            .iter()
            .zip(&index.directions)
            .map(|(id, dir)| layout(*id, *dir))
            .collect();
        let extra_columns: Vec<KeyColumn> = table
            .extra_columns(&index)
            .into_iter()
            .map(|id| layout(id, Direction::Ascending))
            .collect();

        let kind = IndexKind::of(&index);
        if kind != IndexKind::Primary {
            for (ordinal, column) in table.columns.iter().enumerate() {
                let available = index.contains_column(column.id)
                    || table.is_primary_key_column(column.id)
                    || index.storing.contains(&column.id);
                if projection.is_projected(ordinal) && !available {
                    return Err(ConfigError::ColumnNotInIndex {
                        table: table.name.clone(),
                        index: index.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            id,
            table,
            index,
            kind,
            projection,
            ordinals,
            key_columns,
            extra_columns,
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// One level of the identifier prefix trie.
#[derive(Debug, Default)]
pub(crate) struct PrefixNode {
    /// Entry whose keys end at this level.
    pub(crate) entry: Option<EntryId>,
    /// Key columns between this level's identifiers and a child's sentinel.
    pub(crate) shared_prefix_len: Option<usize>,
    pub(crate) children: HashMap<(TableId, IndexId), PrefixNode>,
}

/// The immutable set of entries a scan decodes rows for.
#[derive(Debug)]
pub struct Registry {
    entries: Vec<ScanEntry>,
    pub(crate) roots: HashMap<(TableId, IndexId), PrefixNode>,
    max_width: usize,
}

impl Registry {
    /// Validates the entries and builds the prefix trie.
    ///
    /// Entries are identified by their position in `args`.
    pub fn build(args: Vec<ScanEntryArgs>) -> Result<Self, ConfigError> {
        if args.is_empty() {
            return Err(ConfigError::NoEntries);
        }

        let mut entries = Vec::with_capacity(args.len());
        let mut roots: HashMap<(TableId, IndexId), PrefixNode> = HashMap::new();
        for (position, arg) in args.into_iter().enumerate() {
            let entry = ScanEntry::new(EntryId(position), arg)?;
            insert_path(&mut roots, &entry)?;
            entries.push(entry);
        }

        let max_width = entries.iter().map(|e| e.table.columns.len()).max().unwrap_or(0);
        debug!(
            entries = entries.len(),
            roots = roots.len(),
            max_width,
            "built scan registry"
        );
        Ok(Self {
            entries,
            roots,
            max_width,
        })
    }

    /// Returns an entry.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this registry.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> &ScanEntry {
        &self.entries[id.0]
    }

    /// Returns every entry in registration order.
    #[must_use]
    pub fn entries(&self) -> &[ScanEntry] {
        &self.entries
    }

    /// Finds the entry registered for a table's index.
    #[must_use]
    pub fn entry_for(&self, table: TableId, index: IndexId) -> Option<EntryId> {
        self.entries
            .iter()
            .find(|e| e.table.id == table && e.index.id == index)
            .map(|e| e.id)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a registry holds at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Widest table among the entries, in columns.
    #[must_use]
    pub fn max_width(&self) -> usize {
        self.max_width
    }
}

fn insert_path(
    roots: &mut HashMap<(TableId, IndexId), PrefixNode>,
    entry: &ScanEntry,
) -> Result<(), ConfigError> {
    let mut level = roots;
    for ancestor in &entry.index.interleave {
        let node = level.entry((ancestor.table_id, ancestor.index_id)).or_default();
        match node.shared_prefix_len {
            Some(existing) if existing != ancestor.shared_prefix_len => {
                return Err(ConfigError::InconsistentInterleave {
                    table_id: ancestor.table_id,
                    index_id: ancestor.index_id,
                    first: existing,
                    second: ancestor.shared_prefix_len,
                });
            }
            _ => node.shared_prefix_len = Some(ancestor.shared_prefix_len),
        }
        level = &mut node.children;
    }

    let node = level.entry((entry.table.id, entry.index.id)).or_default();
    if node.entry.is_some() {
        return Err(ConfigError::DuplicateEntry {
            table: entry.table.name.clone(),
            index: entry.index.name.clone(),
        });
    }
    node.entry = Some(entry.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnDescriptor, InterleaveAncestor};

    fn parent() -> Arc<TableDescriptor> {
        Arc::new(
            TableDescriptor::new(51, "parent")
                .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
                .with_column(ColumnDescriptor::nullable(2, "v", ColumnType::String))
                .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
                .with_index(IndexDescriptor::new(2, "v_idx").with_column(2, Direction::Ascending))
                .build()
                .unwrap(),
        )
    }

    fn child(id: u32, shared: usize) -> Arc<TableDescriptor> {
        Arc::new(
            TableDescriptor::new(id, format!("child{id}"))
                .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
                .with_column(ColumnDescriptor::not_null(2, "c", ColumnType::Int))
                .with_primary_index(
                    IndexDescriptor::primary()
                        .with_column(1, Direction::Ascending)
                        .with_column(2, Direction::Ascending)
                        .interleaved_in(vec![InterleaveAncestor::new(51, 1, shared)]),
                )
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_projection() {
        let table = parent();
        assert_eq!(Projection::all(&table).count(), 2);
        assert_eq!(Projection::none(&table).count(), 0);
        let p = Projection::columns(&table, &[ColumnId::new(2)]).unwrap();
        assert!(!p.is_projected(0));
        assert!(p.is_projected(1));
        assert!(!p.is_projected(5));
        assert!(matches!(
            Projection::columns(&table, &[ColumnId::new(9)]),
            Err(ConfigError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_build_registry() {
        let p = parent();
        let c = child(52, 1);
        let registry = Registry::build(vec![
            ScanEntryArgs::primary(p.clone(), Projection::all(&p)),
            ScanEntryArgs::primary(c.clone(), Projection::all(&c)),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.max_width(), 2);
        assert_eq!(registry.roots.len(), 1);
        let root = &registry.roots[&(TableId::new(51), IndexId::PRIMARY)];
        assert_eq!(root.entry, Some(EntryId(0)));
        assert_eq!(root.shared_prefix_len, Some(1));
        assert_eq!(root.children.len(), 1);

        let entry = registry.entry(EntryId(1));
        assert_eq!(entry.kind(), IndexKind::Primary);
        assert_eq!(entry.key_columns.len(), 2);
        assert_eq!(entry.column_ordinal(ColumnId::new(2)), Some(1));
        assert_eq!(entry.column_ordinal(ColumnId::new(7)), None);
        assert_eq!(registry.entry_for(TableId::new(52), IndexId::PRIMARY), Some(EntryId(1)));
    }

    #[test]
    fn test_child_without_parent_entry() {
        let c = child(52, 1);
        let registry = Registry::build(vec![ScanEntryArgs::primary(c.clone(), Projection::all(&c))]).unwrap();
        let root = &registry.roots[&(TableId::new(51), IndexId::PRIMARY)];
        assert!(root.entry.is_none());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(Registry::build(Vec::new()).unwrap_err(), ConfigError::NoEntries);
    }

    #[test]
    fn test_rejects_duplicate() {
        let p = parent();
        let err = Registry::build(vec![
            ScanEntryArgs::primary(p.clone(), Projection::all(&p)),
            ScanEntryArgs::primary(p.clone(), Projection::none(&p)),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntry { .. }));
    }

    #[test]
    fn test_rejects_foreign_index() {
        let p = parent();
        let c = child(52, 1);
        let err = Registry::build(vec![ScanEntryArgs::new(
            p.clone(),
            c.primary_index.clone(),
            Projection::all(&p),
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::IndexNotInTable { .. }));
        assert!(ScanEntryArgs::secondary(p, IndexId::new(9), Projection::from_mask(vec![])).is_err());
    }

    #[test]
    fn test_rejects_projection_width() {
        let p = parent();
        let err = Registry::build(vec![ScanEntryArgs::primary(p, Projection::from_mask(vec![true]))]).unwrap_err();
        assert!(matches!(err, ConfigError::ProjectionWidth { width: 1, columns: 2, .. }));
    }

    #[test]
    fn test_rejects_unavailable_secondary_column() {
        let t = Arc::new(
            TableDescriptor::new(60, "t")
                .with_column(ColumnDescriptor::not_null(1, "k", ColumnType::Int))
                .with_column(ColumnDescriptor::nullable(2, "a", ColumnType::Int))
                .with_column(ColumnDescriptor::nullable(3, "b", ColumnType::Int))
                .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
                .with_index(IndexDescriptor::new(2, "a_idx").with_column(2, Direction::Ascending))
                .build()
                .unwrap(),
        );
        let all = ScanEntryArgs::secondary(t.clone(), IndexId::new(2), Projection::all(&t)).unwrap();
        assert!(matches!(
            Registry::build(vec![all]).unwrap_err(),
            ConfigError::ColumnNotInIndex { .. }
        ));

        let covered = Projection::columns(&t, &[ColumnId::new(1), ColumnId::new(2)]).unwrap();
        let ok = ScanEntryArgs::secondary(t.clone(), IndexId::new(2), covered).unwrap();
        let registry = Registry::build(vec![ok]).unwrap();
        let entry = registry.entry(EntryId(0));
        assert_eq!(entry.kind(), IndexKind::NonUniqueSecondary);
        assert_eq!(entry.extra_columns.len(), 1);
    }

    #[test]
    fn test_rejects_inconsistent_interleave() {
        let a = child(52, 1);
        let b = Arc::new(
            TableDescriptor::new(53, "other")
                .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
                .with_column(ColumnDescriptor::not_null(2, "q", ColumnType::Int))
                .with_primary_index(
                    IndexDescriptor::primary()
                        .with_column(1, Direction::Ascending)
                        .with_column(2, Direction::Ascending)
                        .interleaved_in(vec![InterleaveAncestor::new(51, 1, 2)]),
                )
                .build()
                .unwrap(),
        );
        let err = Registry::build(vec![
            ScanEntryArgs::primary(a.clone(), Projection::all(&a)),
            ScanEntryArgs::primary(b.clone(), Projection::all(&b)),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InconsistentInterleave { first: 1, second: 2, .. }));
    }
}
