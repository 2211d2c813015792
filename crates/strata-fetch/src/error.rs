//! Error types for the row fetcher.

use std::fmt;

use strata_common::error::ErrorCode;
use strata_common::types::{ColumnId, IndexId, Key, TableId};
use strata_encoding::{ColumnType, EncodingError};
use strata_kv::KvError;
use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// =============================================================================
// Configuration errors
// =============================================================================

/// Errors raised while validating descriptors or building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The registry was built from an empty entry list.
    #[error("no scan entries configured")]
    NoEntries,

    /// An index descriptor is not one of its table's indexes.
    #[error("index {index} does not belong to table '{table}'")]
    IndexNotInTable {
        /// Table name.
        table: String,
        /// Offending index id.
        index: IndexId,
    },

    /// Two entries resolve to the same identifier prefix.
    #[error("duplicate scan entry for index '{index}' of table '{table}'")]
    DuplicateEntry {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },

    /// A projection mask does not match the table width.
    #[error("projection for table '{table}' has width {width}, table has {columns} columns")]
    ProjectionWidth {
        /// Table name.
        table: String,
        /// Mask width.
        width: usize,
        /// Table column count.
        columns: usize,
    },

    /// A projection names a column the table does not have.
    #[error("projection for table '{table}' references unknown column {column}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Unknown column id.
        column: ColumnId,
    },

    /// A secondary index cannot produce a projected column.
    #[error("index '{index}' of table '{table}' cannot produce column '{column}'")]
    ColumnNotInIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
        /// Column name.
        column: String,
    },

    /// Two entries disagree about an interleave ancestor.
    #[error(
        "interleave ancestor {table_id}/{index_id} declared with shared prefix lengths {first} and {second}"
    )]
    InconsistentInterleave {
        /// Ancestor table id.
        table_id: TableId,
        /// Ancestor index id.
        index_id: IndexId,
        /// Length seen first.
        first: usize,
        /// Conflicting length.
        second: usize,
    },

    /// A table descriptor is internally inconsistent.
    #[error("invalid descriptor for table '{table}': {reason}")]
    InvalidDescriptor {
        /// Table name.
        table: String,
        /// What is wrong.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid_descriptor(table: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoEntries => ErrorCode::InvalidArgument,
            Self::IndexNotInTable { .. } | Self::InconsistentInterleave { .. } => {
                ErrorCode::DescriptorMismatch
            }
            Self::DuplicateEntry { .. } => ErrorCode::DuplicateEntry,
            Self::ProjectionWidth { .. } | Self::UnknownColumn { .. } | Self::ColumnNotInIndex { .. } => {
                ErrorCode::InvalidProjection
            }
            Self::InvalidDescriptor { .. } => ErrorCode::ConfigInvalid,
        }
    }
}

// =============================================================================
// Decode errors
// =============================================================================

/// What went wrong while decoding a key-value pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeErrorKind {
    /// Key bytes are not a valid encoding.
    #[error("malformed key: {0}")]
    MalformedKey(EncodingError),

    /// Value bytes are not a valid encoding.
    #[error("malformed value: {0}")]
    MalformedValue(EncodingError),

    /// The key's root identifiers match no registered entry.
    #[error("key outside the scan scope (table {table_id}, index {index_id})")]
    OutOfScope {
        /// Decoded table id.
        table_id: u64,
        /// Decoded index id.
        index_id: u64,
    },

    /// Interleave ancestry identifiers differ from the descriptor's.
    #[error("expected identifiers {expected_table}/{expected_index}, found {found_table}/{found_index}")]
    IdentifierMismatch {
        /// Table id the descriptor expects.
        expected_table: TableId,
        /// Index id the descriptor expects.
        expected_index: IndexId,
        /// Table id found in the key.
        found_table: u64,
        /// Index id found in the key.
        found_index: u64,
    },

    /// An interleave sentinel was expected after an ancestor's columns.
    #[error("missing interleave sentinel")]
    MissingSentinel,

    /// The bytes after the key columns are not a column family suffix.
    #[error("invalid column family suffix")]
    InvalidFamilySuffix,

    /// A value references a column id that was never allocated.
    #[error("column id {column_id} is beyond the table's next column id {next_column_id}")]
    ColumnOutOfRange {
        /// Decoded column id.
        column_id: u64,
        /// The table's high-water mark.
        next_column_id: ColumnId,
    },
}

/// A fatal error decoding one key-value pair.
///
/// The offset is relative to the key for key errors and to the value for
/// [`DecodeErrorKind::MalformedValue`] and [`DecodeErrorKind::ColumnOutOfRange`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    /// Owning table name, once the key has been matched.
    pub table: Option<String>,
    /// Owning index name, once the key has been matched.
    pub index: Option<String>,
    /// Column being decoded, when known.
    pub column: Option<String>,
    /// The raw key of the failing pair.
    pub key: Key,
    /// Byte offset of the failure.
    pub offset: usize,
    /// Failure detail.
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    /// Creates an error with no table context.
    #[must_use]
    pub fn new(key: &Key, offset: usize, kind: DecodeErrorKind) -> Self {
        Self {
            table: None,
            index: None,
            column: None,
            key: key.clone(),
            offset,
            kind,
        }
    }

    /// Attaches the owning table and index names.
    #[must_use]
    pub fn in_index(mut self, table: &str, index: &str) -> Self {
        self.table = Some(table.to_string());
        self.index = Some(index.to_string());
        self
    }

    /// Attaches the column name.
    #[must_use]
    pub fn in_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match &self.kind {
            DecodeErrorKind::MalformedValue(EncodingError::TypeMismatch { .. }) => ErrorCode::TypeMismatch,
            DecodeErrorKind::MalformedKey(_)
            | DecodeErrorKind::IdentifierMismatch { .. }
            | DecodeErrorKind::MissingSentinel
            | DecodeErrorKind::InvalidFamilySuffix => ErrorCode::MalformedKey,
            DecodeErrorKind::MalformedValue(_) => ErrorCode::MalformedValue,
            DecodeErrorKind::OutOfScope { .. } => ErrorCode::KeyOutOfScope,
            DecodeErrorKind::ColumnOutOfRange { .. } => ErrorCode::UnknownColumn,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let (Some(table), Some(index)) = (&self.table, &self.index) {
            write!(f, " in {table}@{index}")?;
        }
        if let Some(column) = &self.column {
            write!(f, " column '{column}'")?;
        }
        write!(f, " (key {}, offset {})", self.key, self.offset)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

// =============================================================================
// Encode errors
// =============================================================================

/// Errors raised by [`RowEncoder`](crate::RowEncoder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The row width differs from the table's column count.
    #[error("row has {actual} datums, table '{table}' has {expected} columns")]
    Arity {
        /// Table name.
        table: String,
        /// Column count.
        expected: usize,
        /// Row width.
        actual: usize,
    },

    /// A datum's type differs from its column's type.
    #[error("column '{column}' of type {column_type} cannot hold a {datum_type} datum")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Declared type.
        column_type: ColumnType,
        /// Type of the supplied datum.
        datum_type: ColumnType,
    },

    /// NULL supplied for a non-nullable or key column.
    #[error("column '{column}' of table '{table}' cannot be NULL")]
    NullViolation {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
}

impl EncodeError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Arity { .. } => ErrorCode::InvalidArgument,
            Self::TypeMismatch { .. } | Self::NullViolation { .. } => ErrorCode::EncodeFailed,
        }
    }
}

// =============================================================================
// Fetch errors
// =============================================================================

/// Errors returned by the row fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Registry or descriptor configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A key-value pair could not be decoded.
    #[error("decode error: {0}")]
    Decode(Box<DecodeError>),

    /// The key-value source failed.
    #[error("source error: {0}")]
    Source(#[from] KvError),

    /// The scan was cancelled.
    #[error("scan cancelled")]
    Cancelled,

    /// The fetcher failed earlier and cannot continue.
    #[error("fetcher is unusable after an earlier error")]
    Poisoned,
}

impl From<DecodeError> for FetchError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(Box::new(err))
    }
}

impl FetchError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(e) => e.code(),
            Self::Decode(e) => e.code(),
            Self::Source(e) => e.code(),
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Poisoned => ErrorCode::Poisoned,
        }
    }

    /// Returns the decode error, if this is one.
    #[must_use]
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}
