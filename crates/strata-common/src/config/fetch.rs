//! Row fetcher configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BATCH_BYTES, DEFAULT_BATCH_ROWS, DEFAULT_POOL_IDLE_BUFFERS};
use crate::error::{StrataError, StrataResult};

/// Row fetcher configuration.
///
/// Controls how much data a scan requests from the key-value source per
/// batch, how many row buffers are kept for reuse, and whether every
/// fetched key-value pair is traced.
///
/// # Example
///
/// ```rust
/// use strata_common::config::FetchConfig;
///
/// let config = FetchConfig::from_toml_str("batch_rows = 500\ntrace_kv = true").unwrap();
/// assert_eq!(config.batch_rows, 500);
/// assert!(config.trace_kv);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum key-value pairs per source batch. 0 disables the limit.
    /// Default: 10000
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,

    /// Maximum key and value bytes per source batch. 0 disables the limit.
    /// Default: 4 MiB
    #[serde(default = "default_batch_bytes")]
    pub batch_bytes: usize,

    /// Number of idle row buffers kept for reuse.
    /// Default: 4
    #[serde(default = "default_pool_idle_buffers")]
    pub pool_idle_buffers: usize,

    /// Log every fetched key-value pair at TRACE level.
    /// Default: false
    #[serde(default)]
    pub trace_kv: bool,
}

fn default_batch_rows() -> usize {
    DEFAULT_BATCH_ROWS
}

fn default_batch_bytes() -> usize {
    DEFAULT_BATCH_BYTES
}

fn default_pool_idle_buffers() -> usize {
    DEFAULT_POOL_IDLE_BUFFERS
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_rows: default_batch_rows(),
            batch_bytes: default_batch_bytes(),
            pool_idle_buffers: default_pool_idle_buffers(),
            trace_kv: false,
        }
    }
}

impl FetchConfig {
    /// Creates a configuration for tests: tiny batches so that rows
    /// straddle batch boundaries, and tracing enabled.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            batch_rows: 7,
            batch_bytes: 0,
            pool_idle_buffers: 2,
            trace_kv: true,
        }
    }

    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(content: &str) -> StrataResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(StrataError::invalid_config)?;
        Ok(config)
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file(path: &Path) -> StrataResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Saves the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> StrataResult<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Serializes the configuration to TOML.
    pub fn to_toml(&self) -> StrataResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Returns the batch row limit, `None` when unlimited.
    #[must_use]
    pub fn batch_rows_limit(&self) -> Option<usize> {
        (self.batch_rows > 0).then_some(self.batch_rows)
    }

    /// Returns the batch byte limit, `None` when unlimited.
    #[must_use]
    pub fn batch_bytes_limit(&self) -> Option<usize> {
        (self.batch_bytes > 0).then_some(self.batch_bytes)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool_idle_buffers == 0 {
            return Err("pool_idle_buffers must be at least 1".to_string());
        }

        if self.pool_idle_buffers > 1024 {
            return Err("pool_idle_buffers must be at most 1024".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.batch_rows, DEFAULT_BATCH_ROWS);
        assert_eq!(config.batch_bytes_limit(), Some(DEFAULT_BATCH_BYTES));
        assert!(!config.trace_kv);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FetchConfig::from_toml_str("batch_bytes = 0").unwrap();
        assert_eq!(config.batch_bytes_limit(), None);
        assert_eq!(config.batch_rows, DEFAULT_BATCH_ROWS);
        assert_eq!(config.pool_idle_buffers, DEFAULT_POOL_IDLE_BUFFERS);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = FetchConfig::from_toml_str("pool_idle_buffers = 0").unwrap_err();
        assert!(matches!(err, StrataError::InvalidConfig { .. }));

        let err = FetchConfig::from_toml_str("batch_rows = \"many\"").unwrap_err();
        assert!(matches!(err, StrataError::ConfigParse { .. }));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch.toml");

        let config = FetchConfig::for_testing();
        config.save(&path).unwrap();

        let loaded = FetchConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FetchConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, StrataError::Io { .. }));
    }
}
