//! Error handling for StrataDB.
//!
//! `ErrorCode` is shared by every crate; `StrataError` covers the failures
//! of this crate (configuration loading and validation).

mod codes;

use thiserror::Error;

pub use codes::ErrorCode;

/// Result type alias for operations in this crate.
pub type StrataResult<T> = std::result::Result<T, StrataError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum StrataError {
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for the expected structure.
    #[error("failed to parse configuration: {source}")]
    ConfigParse {
        /// The underlying parse error.
        #[from]
        source: toml::de::Error,
    },

    /// Configuration could not be serialized.
    #[error("failed to serialize configuration: {source}")]
    ConfigSerialize {
        /// The underlying serialization error.
        #[from]
        source: toml::ser::Error,
    },

    /// Configuration parsed but holds invalid values.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },
}

impl StrataError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::Io,
            Self::ConfigParse { .. } | Self::ConfigSerialize { .. } => ErrorCode::ConfigParse,
            Self::InvalidConfig { .. } => ErrorCode::ConfigInvalid,
        }
    }
}
