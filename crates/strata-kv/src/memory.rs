//! In-memory ordered key-value store.
//!
//! A `BTreeMap` behind a `parking_lot::RwLock`. Opening a scan copies the
//! matching pairs out under the read lock, so a stream sees a consistent
//! snapshot and never holds the lock across an await point. Keys and values
//! are `Bytes`-backed, so the copy only bumps reference counts.

use std::collections::BTreeMap;
use std::future::Future;
use std::ops::Bound;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use strata_common::types::{Key, Value};
use tracing::trace;

use crate::error::{KvError, KvResult};
use crate::source::{KvPair, KvSource, KvStream, ScanDirection, ScanRequest};

/// Sentinel meaning "no injected failure".
const NO_FAILURE: usize = usize::MAX;

/// An in-memory ordered store.
#[derive(Debug)]
pub struct MemKvStore {
    data: RwLock<BTreeMap<Key, Value>>,
    /// Streams opened from now on fail after serving this many batches.
    fail_after_batches: AtomicUsize,
}

impl Default for MemKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemKvStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            fail_after_batches: AtomicUsize::new(NO_FAILURE),
        }
    }

    /// Inserts or replaces a pair.
    pub fn put(&self, key: Key, value: Value) {
        self.data.write().insert(key, value);
    }

    /// Inserts or replaces many pairs under one lock acquisition.
    pub fn put_all(&self, pairs: impl IntoIterator<Item = KvPair>) {
        let mut data = self.data.write();
        for pair in pairs {
            data.insert(pair.key, pair.value);
        }
    }

    /// Removes a key, returning its value.
    pub fn delete(&self, key: &Key) -> Option<Value> {
        self.data.write().remove(key)
    }

    /// Returns the value stored under a key.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    /// Returns the number of stored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the store holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Makes streams opened afterwards fail with
    /// [`KvError::Unavailable`] once they have served `batches` batches.
    /// `None` clears the failure.
    pub fn fail_after_batches(&self, batches: Option<usize>) {
        self.fail_after_batches
            .store(batches.unwrap_or(NO_FAILURE), Ordering::Relaxed);
    }
}

impl KvSource for MemKvStore {
    fn open(&self, request: ScanRequest) -> KvResult<Box<dyn KvStream>> {
        request.validate()?;

        let data = self.data.read();
        let mut pairs = Vec::new();
        for span in &request.spans {
            let range = data.range::<Key, _>((Bound::Included(&span.start), Bound::Excluded(&span.end)));
            let to_pair = |(k, v): (&Key, &Value)| KvPair::new(k.clone(), v.clone());
            match request.direction {
                ScanDirection::Forward => pairs.extend(range.map(to_pair)),
                ScanDirection::Reverse => pairs.extend(range.rev().map(to_pair)),
            }
        }
        drop(data);

        trace!(
            spans = request.spans.len(),
            pairs = pairs.len(),
            direction = ?request.direction,
            "opened in-memory scan"
        );

        let fail_after = self.fail_after_batches.load(Ordering::Relaxed);
        Ok(Box::new(MemKvStream {
            pairs: pairs.into_iter(),
            batch_rows: request.batch_rows.unwrap_or(usize::MAX),
            batch_bytes: request.batch_bytes.unwrap_or(usize::MAX),
            served: 0,
            fail_after: (fail_after != NO_FAILURE).then_some(fail_after),
        }))
    }
}

/// Stream over a snapshot taken when the scan was opened.
struct MemKvStream {
    pairs: std::vec::IntoIter<KvPair>,
    batch_rows: usize,
    batch_bytes: usize,
    served: usize,
    fail_after: Option<usize>,
}

impl MemKvStream {
    fn fill_batch(&mut self) -> KvResult<Option<Vec<KvPair>>> {
        if self.fail_after.is_some_and(|limit| self.served >= limit) {
            return Err(KvError::unavailable(format!(
                "injected failure after {} batches",
                self.served
            )));
        }

        let mut batch = Vec::new();
        let mut bytes = 0usize;
        while batch.len() < self.batch_rows && bytes < self.batch_bytes {
            let Some(pair) = self.pairs.next() else {
                break;
            };
            bytes += pair.size();
            batch.push(pair);
        }

        if batch.is_empty() {
            return Ok(None);
        }
        self.served += 1;
        Ok(Some(batch))
    }
}

impl KvStream for MemKvStream {
    fn next_batch(&mut self) -> Pin<Box<dyn Future<Output = KvResult<Option<Vec<KvPair>>>> + Send + '_>> {
        Box::pin(async move {
            // A real source suspends here; yielding keeps cancellation and
            // fairness paths exercised.
            tokio::task::yield_now().await;
            self.fill_batch()
        })
    }
}
