//! Encoding error types.

use thiserror::Error;

use crate::datum::ColumnType;

/// Result type for encoding operations.
pub type EncodingResult<T> = std::result::Result<T, EncodingError>;

/// Errors raised while encoding or decoding bytes.
///
/// Every decoding error carries the byte offset at which it was detected,
/// relative to the slice the failing function was given. Callers that
/// decode from the middle of a larger buffer use [`EncodingError::at`] to
/// rebase the offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Input ended before the encoding was complete.
    #[error("truncated input at offset {offset}: needed {needed} more bytes")]
    Truncated {
        /// Offset where more input was expected.
        offset: usize,
        /// Number of missing bytes (a lower bound).
        needed: usize,
    },

    /// A marker byte did not match any accepted encoding.
    #[error("invalid marker {marker:#04x} at offset {offset}, expected {expected}")]
    InvalidMarker {
        /// Offset of the marker.
        offset: usize,
        /// The marker byte found.
        marker: u8,
        /// What was expected.
        expected: &'static str,
    },

    /// A byte-string escape sequence was malformed.
    #[error("invalid escape byte {byte:#04x} at offset {offset}")]
    InvalidEscape {
        /// Offset of the escape sequence.
        offset: usize,
        /// The byte following the escape.
        byte: u8,
    },

    /// A string column held bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string encoding.
        offset: usize,
    },

    /// A varint did not fit in 64 bits.
    #[error("varint overflow at offset {offset}")]
    VarintOverflow {
        /// Offset of the varint.
        offset: usize,
    },

    /// A value tag named a type that cannot be decoded.
    #[error("unsupported value type {value_type} at offset {offset}")]
    UnsupportedValueType {
        /// Offset of the tag.
        offset: usize,
        /// The raw type code.
        value_type: u64,
    },

    /// A value's encoded type is incompatible with the column type.
    #[error("value type {value_type} at offset {offset} cannot decode as {column_type}")]
    TypeMismatch {
        /// Offset of the payload.
        offset: usize,
        /// The encoded value type name.
        value_type: &'static str,
        /// The declared column type.
        column_type: ColumnType,
    },
}

impl EncodingError {
    /// Returns the offset at which the error was detected.
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::Truncated { offset, .. }
            | Self::InvalidMarker { offset, .. }
            | Self::InvalidEscape { offset, .. }
            | Self::InvalidUtf8 { offset }
            | Self::VarintOverflow { offset }
            | Self::UnsupportedValueType { offset, .. }
            | Self::TypeMismatch { offset, .. } => *offset,
        }
    }

    /// Shifts the error's offset by `base` bytes.
    #[must_use]
    pub fn at(mut self, base: usize) -> Self {
        match &mut self {
            Self::Truncated { offset, .. }
            | Self::InvalidMarker { offset, .. }
            | Self::InvalidEscape { offset, .. }
            | Self::InvalidUtf8 { offset }
            | Self::VarintOverflow { offset }
            | Self::UnsupportedValueType { offset, .. }
            | Self::TypeMismatch { offset, .. } => *offset += base,
        }
        self
    }

    pub(crate) fn truncated(offset: usize, needed: usize) -> Self {
        Self::Truncated { offset, needed }
    }
}
