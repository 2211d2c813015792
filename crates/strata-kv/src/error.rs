//! Key-value source errors.

use strata_common::error::ErrorCode;
use strata_common::types::Key;
use thiserror::Error;

/// Result type for key-value source operations.
pub type KvResult<T> = std::result::Result<T, KvError>;

/// Errors raised by a key-value source.
#[derive(Debug, Clone, Error)]
pub enum KvError {
    /// A span's start does not sort before its end.
    #[error("invalid span [{start}, {end})")]
    InvalidSpan {
        /// Span start.
        start: Key,
        /// Span end.
        end: Key,
    },

    /// The scan request is malformed.
    #[error("invalid scan request: {message}")]
    InvalidRequest {
        /// What is wrong.
        message: String,
    },

    /// The source could not serve the request.
    #[error("key-value source unavailable: {message}")]
    Unavailable {
        /// Reason reported by the source.
        message: String,
    },

    /// The source cancelled the scan.
    #[error("scan cancelled by key-value source")]
    Cancelled,
}

impl KvError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidSpan { .. } => ErrorCode::InvalidSpan,
            Self::InvalidRequest { .. } => ErrorCode::InvalidArgument,
            Self::Unavailable { .. } => ErrorCode::SourceUnavailable,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }
}
