//! Stable error codes shared by every StrataDB crate.

use std::fmt;

/// Numeric code attached to every StrataDB error.
///
/// Each crate maps its own error enum onto these codes so callers can
/// branch on the category without matching every variant. The numeric
/// values are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Operation was cancelled.
    Cancelled = 0x0005,
    /// Object is unusable after an earlier failure.
    Poisoned = 0x0006,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,

    // Configuration errors (0x0200 - 0x02FF)
    /// Configuration could not be parsed.
    ConfigParse = 0x0200,
    /// Configuration failed validation.
    ConfigInvalid = 0x0201,
    /// Descriptors are inconsistent with each other.
    DescriptorMismatch = 0x0202,
    /// Two scan entries resolve to the same key prefix.
    DuplicateEntry = 0x0203,
    /// Projection references a column that cannot be produced.
    InvalidProjection = 0x0204,

    // Decoding errors (0x0300 - 0x03FF)
    /// Key bytes could not be decoded.
    MalformedKey = 0x0300,
    /// Value bytes could not be decoded.
    MalformedValue = 0x0301,
    /// Key lies outside every registered scan entry.
    KeyOutOfScope = 0x0302,
    /// Decoded type does not match the declared column type.
    TypeMismatch = 0x0303,
    /// Column id is not part of the table schema.
    UnknownColumn = 0x0304,
    /// Datum cannot be encoded for the target column.
    EncodeFailed = 0x0305,

    // Key-value source errors (0x0400 - 0x04FF)
    /// Source rejected the scan request.
    InvalidSpan = 0x0400,
    /// Source is unavailable.
    SourceUnavailable = 0x0401,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Names the range the code falls in.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Config",
            0x03 => "Decode",
            0x04 => "Source",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_categories() {
        assert_eq!(ErrorCode::Cancelled.category(), "General");
        assert_eq!(ErrorCode::Io.category(), "I/O");
        assert_eq!(ErrorCode::DuplicateEntry.category(), "Config");
        assert_eq!(ErrorCode::MalformedKey.category(), "Decode");
        assert_eq!(ErrorCode::SourceUnavailable.category(), "Source");
    }

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::KeyOutOfScope.as_u16(), 0x0302);
        assert_eq!(ErrorCode::TypeMismatch.to_string(), "TypeMismatch");
    }
}
