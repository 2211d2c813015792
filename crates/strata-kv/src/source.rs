//! Key-value source interface.

use std::future::Future;
use std::pin::Pin;

use strata_common::types::{Key, Value};

use crate::error::{KvError, KvResult};
use crate::span::Span;

/// A raw key-value pair as returned by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    /// Encoded key.
    pub key: Key,
    /// Encoded value.
    pub value: Value,
}

impl KvPair {
    /// Creates a new pair.
    #[must_use]
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }

    /// Returns the combined key and value size in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

/// Iteration direction within each span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    /// Ascending key order.
    #[default]
    Forward,
    /// Descending key order.
    Reverse,
}

/// A request to scan one or more spans.
///
/// Spans are visited in the order given; within a span keys are returned
/// ascending, or descending for a reverse scan. Callers wanting globally
/// ordered output pass sorted, non-overlapping spans (see
/// [`merge_spans`](crate::merge_spans)) and, for reverse scans, reverse
/// their order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Spans to scan.
    pub spans: Vec<Span>,
    /// Iteration direction.
    pub direction: ScanDirection,
    /// Maximum pairs per batch.
    pub batch_rows: Option<usize>,
    /// Maximum key and value bytes per batch. A batch always holds at
    /// least one pair.
    pub batch_bytes: Option<usize>,
}

impl ScanRequest {
    /// Creates a forward request with no batch limits.
    #[must_use]
    pub fn new(spans: Vec<Span>) -> Self {
        Self {
            spans,
            direction: ScanDirection::Forward,
            batch_rows: None,
            batch_bytes: None,
        }
    }

    /// Sets the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: ScanDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the per-batch pair limit.
    #[must_use]
    pub fn with_batch_rows(mut self, limit: Option<usize>) -> Self {
        self.batch_rows = limit;
        self
    }

    /// Sets the per-batch byte limit.
    #[must_use]
    pub fn with_batch_bytes(mut self, limit: Option<usize>) -> Self {
        self.batch_bytes = limit;
        self
    }

    /// Checks that every span is non-empty and limits are positive.
    pub fn validate(&self) -> KvResult<()> {
        if let Some(span) = self.spans.iter().find(|s| !s.is_valid()) {
            return Err(KvError::InvalidSpan {
                start: span.start.clone(),
                end: span.end.clone(),
            });
        }
        if self.batch_rows == Some(0) {
            return Err(KvError::InvalidRequest {
                message: "batch_rows must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// A source of ordered key-value pairs.
pub trait KvSource: Send + Sync {
    /// Opens a scan. The returned stream owns everything it needs, so it
    /// may outlive the borrow of the source.
    fn open(&self, request: ScanRequest) -> KvResult<Box<dyn KvStream>>;
}

/// An open scan producing batches of pairs in scan order.
pub trait KvStream: Send {
    /// Returns the next batch, or `None` once every span is exhausted.
    ///
    /// Batches are never empty. After `None`, later calls keep returning
    /// `None`.
    fn next_batch(&mut self) -> Pin<Box<dyn Future<Output = KvResult<Option<Vec<KvPair>>>> + Send + '_>>;
}
