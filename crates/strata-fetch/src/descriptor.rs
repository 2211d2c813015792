//! Table, index, column and family descriptors.
//!
//! Descriptors are immutable once built. [`TableDescriptor::build`] fills in
//! defaults (a single column family, the column id high-water mark) and
//! validates the whole table, so every descriptor reaching the registry is
//! internally consistent.

use std::collections::HashSet;

use strata_common::constants::{MAX_COLUMNS_PER_TABLE, MAX_INTERLEAVE_DEPTH};
use strata_common::types::{ColumnId, FamilyId, IndexId, Key, TableId};
use strata_encoding::key::encode_uvarint_ascending;
use strata_encoding::{ColumnType, Direction};
use strata_kv::Span;

use crate::error::ConfigError;
use crate::keys::encode_index_ids;

// =============================================================================
// Columns and families
// =============================================================================

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column id, unique within the table and never reused.
    pub id: ColumnId,
    /// Column name.
    pub name: String,
    /// Semantic type.
    pub ty: ColumnType,
    /// Whether NULL is allowed.
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Creates a nullable column.
    pub fn nullable(id: u32, name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            id: ColumnId::new(id),
            name: name.into(),
            ty,
            nullable: true,
        }
    }

    /// Creates a non-nullable column.
    pub fn not_null(id: u32, name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            nullable: false,
            ..Self::nullable(id, name, ty)
        }
    }
}

/// A column family: columns stored together in one key-value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDescriptor {
    /// Family id.
    pub id: FamilyId,
    /// Family name.
    pub name: String,
    /// Member columns.
    pub column_ids: Vec<ColumnId>,
}

impl FamilyDescriptor {
    /// Creates a family.
    pub fn new(id: u32, name: impl Into<String>, column_ids: Vec<ColumnId>) -> Self {
        Self {
            id: FamilyId::new(id),
            name: name.into(),
            column_ids,
        }
    }
}

// =============================================================================
// Indexes
// =============================================================================

/// One level of interleave ancestry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterleaveAncestor {
    /// Ancestor table.
    pub table_id: TableId,
    /// Ancestor index.
    pub index_id: IndexId,
    /// Number of this index's key columns encoded under the ancestor,
    /// counted from the previous ancestor.
    pub shared_prefix_len: usize,
}

impl InterleaveAncestor {
    /// Creates an ancestor entry.
    pub fn new(table_id: u32, index_id: u32, shared_prefix_len: usize) -> Self {
        Self {
            table_id: TableId::new(table_id),
            index_id: IndexId::new(index_id),
            shared_prefix_len,
        }
    }
}

/// A primary or secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// Index id; [`IndexId::PRIMARY`] for the primary index.
    pub id: IndexId,
    /// Index name.
    pub name: String,
    /// Whether indexed values are unique.
    pub unique: bool,
    /// Key columns in key order.
    pub column_ids: Vec<ColumnId>,
    /// Direction of each key column.
    pub directions: Vec<Direction>,
    /// Columns copied into the index value.
    pub storing: Vec<ColumnId>,
    /// Interleave ancestry, root first.
    pub interleave: Vec<InterleaveAncestor>,
}

impl IndexDescriptor {
    /// Creates an empty, non-unique index.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: IndexId::new(id),
            name: name.into(),
            unique: false,
            column_ids: Vec::new(),
            directions: Vec::new(),
            storing: Vec::new(),
            interleave: Vec::new(),
        }
    }

    /// Creates an empty primary index.
    #[must_use]
    pub fn primary() -> Self {
        Self::new(IndexId::PRIMARY.as_u32(), "primary").unique()
    }

    /// Appends a key column.
    #[must_use]
    pub fn with_column(mut self, id: u32, direction: Direction) -> Self {
        self.column_ids.push(ColumnId::new(id));
        self.directions.push(direction);
        self
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the STORING columns.
    #[must_use]
    pub fn storing(mut self, columns: impl IntoIterator<Item = ColumnId>) -> Self {
        self.storing = columns.into_iter().collect();
        self
    }

    /// Interleaves the index under the given ancestors, root first.
    #[must_use]
    pub fn interleaved_in(mut self, ancestors: Vec<InterleaveAncestor>) -> Self {
        self.interleave = ancestors;
        self
    }

    /// Returns true for the primary index.
    #[inline]
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.id.is_primary()
    }

    /// Returns true if `id` is one of the key columns.
    #[must_use]
    pub fn contains_column(&self, id: ColumnId) -> bool {
        self.column_ids.contains(&id)
    }

    /// Identifiers of the index whose key space this index lives in.
    #[must_use]
    pub fn root_ids(&self, table_id: TableId) -> (TableId, IndexId) {
        self.interleave
            .first()
            .map_or((table_id, self.id), |root| (root.table_id, root.index_id))
    }
}

// =============================================================================
// Tables
// =============================================================================

/// A table with its columns, families and indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Table id.
    pub id: TableId,
    /// Table name.
    pub name: String,
    /// Columns in row order.
    pub columns: Vec<ColumnDescriptor>,
    /// Column families.
    pub families: Vec<FamilyDescriptor>,
    /// Primary index.
    pub primary_index: IndexDescriptor,
    /// Secondary indexes.
    pub indexes: Vec<IndexDescriptor>,
    /// Every column id ever allocated is below this.
    pub next_column_id: ColumnId,
}

impl TableDescriptor {
    /// Starts a table definition.
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: TableId::new(id),
            name: name.into(),
            columns: Vec::new(),
            families: Vec::new(),
            primary_index: IndexDescriptor::primary(),
            indexes: Vec::new(),
            next_column_id: ColumnId::NONE,
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary index.
    #[must_use]
    pub fn with_primary_index(mut self, index: IndexDescriptor) -> Self {
        self.primary_index = index;
        self
    }

    /// Adds a secondary index.
    #[must_use]
    pub fn with_index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a column family.
    #[must_use]
    pub fn with_family(mut self, family: FamilyDescriptor) -> Self {
        self.families.push(family);
        self
    }

    /// Sets the column id high-water mark, leaving room for dropped columns.
    #[must_use]
    pub fn with_next_column_id(mut self, id: u32) -> Self {
        self.next_column_id = ColumnId::new(id);
        self
    }

    /// Fills in defaults and validates the table.
    ///
    /// Without explicit families every column goes into family 0. An unset
    /// high-water mark becomes one past the largest column id.
    pub fn build(mut self) -> Result<Self, ConfigError> {
        if self.families.is_empty() {
            let all = self.columns.iter().map(|c| c.id).collect();
            self.families.push(FamilyDescriptor::new(FamilyId::PRIMARY.as_u32(), "primary", all));
        }
        if self.next_column_id == ColumnId::NONE {
            let max = self.columns.iter().map(|c| c.id.as_u32()).max().unwrap_or(0);
            self.next_column_id = ColumnId::new(max + 1);
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks that columns, families and indexes are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| Err(ConfigError::invalid_descriptor(&self.name, reason));

        if self.columns.is_empty() {
            return fail("table has no columns".into());
        }
        if self.columns.len() > MAX_COLUMNS_PER_TABLE {
            return fail(format!("more than {MAX_COLUMNS_PER_TABLE} columns"));
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for column in &self.columns {
            if column.id == ColumnId::NONE || column.id >= self.next_column_id {
                return fail(format!(
                    "column '{}' has id {} outside 1..{}",
                    column.name, column.id, self.next_column_id
                ));
            }
            if !ids.insert(column.id) {
                return fail(format!("duplicate column id {}", column.id));
            }
            if !names.insert(column.name.as_str()) {
                return fail(format!("duplicate column name '{}'", column.name));
            }
        }

        self.validate_families()?;

        if !self.primary_index.is_primary() || !self.primary_index.unique {
            return fail(format!("'{}' is not a unique primary index", self.primary_index.name));
        }
        if self.primary_index.column_ids.is_empty() {
            return fail("primary index has no key columns".into());
        }
        if !self.primary_index.storing.is_empty() {
            return fail("primary index cannot have STORING columns".into());
        }
        self.validate_index(&self.primary_index)?;

        let mut index_ids = HashSet::new();
        for index in &self.indexes {
            if index.is_primary() || !index_ids.insert(index.id) {
                return fail(format!("index '{}' has a duplicate id {}", index.name, index.id));
            }
            if index.column_ids.is_empty() {
                return fail(format!("index '{}' has no key columns", index.name));
            }
            self.validate_index(index)?;
            for id in &index.storing {
                if self.column(*id).is_none() {
                    return fail(format!("index '{}' stores unknown column {id}", index.name));
                }
                if index.contains_column(*id) || self.is_primary_key_column(*id) {
                    return fail(format!("index '{}' stores key column {id}", index.name));
                }
            }
        }
        Ok(())
    }

    fn validate_families(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| Err(ConfigError::invalid_descriptor(&self.name, reason));

        if !self.families.iter().any(|f| f.id == FamilyId::PRIMARY) {
            return fail("family 0 is missing".into());
        }
        let mut family_ids = HashSet::new();
        let mut seen = HashSet::new();
        for family in &self.families {
            if !family_ids.insert(family.id) {
                return fail(format!("duplicate family id {}", family.id));
            }
            for id in &family.column_ids {
                if self.column(*id).is_none() {
                    return fail(format!("family '{}' references unknown column {id}", family.name));
                }
                if !seen.insert(*id) {
                    return fail(format!("column {id} belongs to more than one family"));
                }
            }
        }
        if let Some(column) = self.columns.iter().find(|c| !seen.contains(&c.id)) {
            return fail(format!("column '{}' belongs to no family", column.name));
        }
        Ok(())
    }

    fn validate_index(&self, index: &IndexDescriptor) -> Result<(), ConfigError> {
        let fail = |reason: String| Err(ConfigError::invalid_descriptor(&self.name, reason));

        if index.directions.len() != index.column_ids.len() {
            return fail(format!("index '{}' has mismatched column directions", index.name));
        }
        let mut seen = HashSet::new();
        for id in &index.column_ids {
            if self.column(*id).is_none() {
                return fail(format!("index '{}' references unknown column {id}", index.name));
            }
            if !seen.insert(*id) {
                return fail(format!("index '{}' repeats column {id}", index.name));
            }
        }
        if index.interleave.len() > MAX_INTERLEAVE_DEPTH {
            return fail(format!("index '{}' is interleaved too deeply", index.name));
        }
        let shared: usize = index.interleave.iter().map(|a| a.shared_prefix_len).sum();
        if shared > index.column_ids.len() {
            return fail(format!(
                "index '{}' shares {shared} columns with its ancestors but has only {}",
                index.name,
                index.column_ids.len()
            ));
        }
        if index.interleave.iter().any(|a| a.table_id == self.id && a.index_id == index.id) {
            return fail(format!("index '{}' is interleaved in itself", index.name));
        }
        Ok(())
    }

    /// Returns the position of a column in row order.
    #[must_use]
    pub fn column_ordinal(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Looks up a column by id.
    #[must_use]
    pub fn column(&self, id: ColumnId) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Looks up the primary or a secondary index.
    #[must_use]
    pub fn index(&self, id: IndexId) -> Option<&IndexDescriptor> {
        if id == self.primary_index.id {
            return Some(&self.primary_index);
        }
        self.indexes.iter().find(|i| i.id == id)
    }

    /// Returns true if `id` is a primary key column.
    #[must_use]
    pub fn is_primary_key_column(&self, id: ColumnId) -> bool {
        self.primary_index.contains_column(id)
    }

    /// Primary key columns not among `index`'s key columns, in primary key
    /// order. Secondary index entries carry these to identify their row.
    #[must_use]
    pub fn extra_columns(&self, index: &IndexDescriptor) -> Vec<ColumnId> {
        if index.is_primary() {
            return Vec::new();
        }
        self.primary_index
            .column_ids
            .iter()
            .copied()
            .filter(|id| !index.contains_column(*id))
            .collect()
    }

    /// Span covering every key of an index.
    ///
    /// An interleaved index shares its root's key space, so the span covers
    /// the root index and everything interleaved in it.
    #[must_use]
    pub fn index_span(&self, id: IndexId) -> Option<Span> {
        let index = self.index(id)?;
        let (table, index) = index.root_ids(self.id);
        let mut buf = Vec::with_capacity(8);
        encode_index_ids(&mut buf, table, index);
        Some(Span::prefix(Key::from_vec(buf)))
    }

    /// Span covering the primary index.
    #[must_use]
    pub fn primary_span(&self) -> Span {
        let (table, index) = self.primary_index.root_ids(self.id);
        let mut buf = Vec::with_capacity(8);
        encode_index_ids(&mut buf, table, index);
        Span::prefix(Key::from_vec(buf))
    }

    /// Span covering every index rooted in this table. Indexes interleaved
    /// in other tables lie outside it.
    #[must_use]
    pub fn table_span(&self) -> Span {
        let mut buf = Vec::with_capacity(4);
        encode_uvarint_ascending(&mut buf, self.id.as_u64());
        Span::prefix(Key::from_vec(buf))
    }
}
