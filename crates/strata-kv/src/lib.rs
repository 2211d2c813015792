//! # strata-kv
//!
//! The key-value source that row fetchers read from.
//!
//! The transactional store itself lives outside this workspace; this crate
//! defines the narrow interface a fetcher needs from it:
//!
//! - [`Span`]: a half-open key range, plus span merging
//! - [`ScanRequest`]: spans, direction, and batch limits
//! - [`KvSource`] / [`KvStream`]: open a scan and pull ordered batches
//! - [`MemKvStore`]: an in-memory ordered store implementing the interface
//!
//! ## Example
//!
//! ```rust
//! use strata_common::types::{Key, Value};
//! use strata_kv::{KvSource, MemKvStore, ScanRequest, Span};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = MemKvStore::new();
//! store.put(Key::from_bytes(&[0x89, 0x01]), Value::from_bytes(b"a"));
//!
//! let request = ScanRequest::new(vec![Span::prefix(Key::from_bytes(&[0x89]))]);
//! let mut stream = store.open(request).unwrap();
//! let batch = stream.next_batch().await.unwrap().unwrap();
//! assert_eq!(batch.len(), 1);
//! assert!(stream.next_batch().await.unwrap().is_none());
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod memory;
mod source;
mod span;

pub use error::{KvError, KvResult};
pub use memory::MemKvStore;
pub use source::{KvPair, KvSource, KvStream, ScanDirection, ScanRequest};
pub use span::{merge_spans, Span};
