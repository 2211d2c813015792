//! Descriptor identifier types for StrataDB.
//!
//! Ids appear as unsigned varints in encoded keys and as deltas in value
//! tuples. Each kind gets its own newtype so a column id cannot be passed
//! where an index id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Table identifier.
///
/// Every encoded index key starts with the owning table's id.
///
/// # Example
///
/// ```rust
/// use strata_common::types::TableId;
///
/// let table = TableId::new(51);
/// assert_eq!(table.as_u64(), 51);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TableId(u32);

impl TableId {
    /// Wraps a raw table id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Unwraps the id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the raw value widened for key encoding.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TableId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Index identifier, unique within its table.
///
/// The primary index always has id 1; secondary indexes are numbered from 2.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct IndexId(u32);

impl IndexId {
    /// The primary index of every table.
    pub const PRIMARY: Self = Self(1);

    /// Wraps a raw index id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Unwraps the id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the raw value widened for key encoding.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Whether this names the primary index.
    #[inline]
    #[must_use]
    pub const fn is_primary(self) -> bool {
        self.0 == Self::PRIMARY.0
    }
}

impl fmt::Debug for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexId({})", self.0)
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for IndexId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Column identifier, unique within its table and never reused.
///
/// Value tuples reference columns by id (as deltas), so ids of dropped
/// columns can still appear in old data.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ColumnId(u32);

impl ColumnId {
    /// Placeholder id meaning "no column".
    pub const NONE: Self = Self(0);

    /// Wraps a raw column id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Unwraps the id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the raw value widened to match decoded value-tuple ids.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Returns the raw value as a vector index.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnId({})", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ColumnId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Column family identifier.
///
/// Family 0 always exists and is always written, even when empty, so that
/// every row has at least one key-value pair.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct FamilyId(u32);

impl FamilyId {
    /// The default family.
    pub const PRIMARY: Self = Self(0);

    /// Wraps a raw family id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Unwraps the id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the raw value widened for key encoding.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

impl fmt::Debug for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FamilyId({})", self.0)
    }
}

impl fmt::Display for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FamilyId {
    #[inline]
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}
