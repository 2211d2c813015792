//! System-wide constants for StrataDB.

// =============================================================================
// Scan Defaults
// =============================================================================

/// Default maximum number of key-value pairs returned per source batch.
pub const DEFAULT_BATCH_ROWS: usize = 10_000;

/// Default maximum number of key and value bytes returned per source batch.
pub const DEFAULT_BATCH_BYTES: usize = 4 * 1024 * 1024;

/// Default number of idle row buffers a fetcher keeps for reuse.
pub const DEFAULT_POOL_IDLE_BUFFERS: usize = 4;

// =============================================================================
// Descriptor Limits
// =============================================================================

/// Maximum number of columns a table descriptor may declare.
pub const MAX_COLUMNS_PER_TABLE: usize = 1024;

/// Maximum interleave depth (number of ancestors) of an index.
pub const MAX_INTERLEAVE_DEPTH: usize = 32;
