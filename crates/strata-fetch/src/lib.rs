//! # strata-fetch
//!
//! Interleave-aware row fetcher for StrataDB.
//!
//! A single scan may cover several tables and indexes at once: with
//! interleaving, child table rows are stored inside their parent's key
//! space, so one contiguous span holds rows of a whole hierarchy. This crate
//! turns such a stream of key-value pairs back into typed rows:
//!
//! - [`TableDescriptor`] and friends describe tables, column families and
//!   indexes, including interleave ancestry
//! - [`Registry`]: the immutable set of (table, index, projection) entries a
//!   scan decodes, arranged in a prefix trie for key matching
//! - [`RowFetcher`]: pulls batches from a [`KvSource`](strata_kv::KvSource),
//!   matches every key to its entry, decodes key columns and values, and
//!   merges column family pairs into rows
//! - [`DatumPool`]: bounded reuse of row buffers across a scan
//! - [`RowEncoder`]: produces the pairs a row is stored as
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use strata_encoding::{ColumnType, Datum, Direction};
//! use strata_fetch::{
//!     ColumnDescriptor, IndexDescriptor, InterleaveAncestor, Projection, Registry, RowEncoder,
//!     RowFetcher, ScanEntryArgs, ScanOptions, TableDescriptor,
//! };
//! use strata_kv::MemKvStore;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let parent = Arc::new(
//!     TableDescriptor::new(51, "parent")
//!         .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
//!         .with_primary_index(IndexDescriptor::primary().with_column(1, Direction::Ascending))
//!         .build()
//!         .unwrap(),
//! );
//! let child = Arc::new(
//!     TableDescriptor::new(52, "child")
//!         .with_column(ColumnDescriptor::not_null(1, "p", ColumnType::Int))
//!         .with_column(ColumnDescriptor::not_null(2, "c", ColumnType::Int))
//!         .with_primary_index(
//!             IndexDescriptor::primary()
//!                 .with_column(1, Direction::Ascending)
//!                 .with_column(2, Direction::Ascending)
//!                 .interleaved_in(vec![InterleaveAncestor::new(51, 1, 1)]),
//!         )
//!         .build()
//!         .unwrap(),
//! );
//!
//! let store = MemKvStore::new();
//! for p in 0..2 {
//!     store.put_all(RowEncoder::new(&parent).encode_row(&[Datum::Int(p)]).unwrap());
//!     for c in 0..3 {
//!         store.put_all(RowEncoder::new(&child).encode_row(&[Datum::Int(p), Datum::Int(c)]).unwrap());
//!     }
//! }
//!
//! let registry = Registry::build(vec![
//!     ScanEntryArgs::primary(parent.clone(), Projection::all(&parent)),
//!     ScanEntryArgs::primary(child.clone(), Projection::all(&child)),
//! ])
//! .unwrap();
//! let spans = vec![parent.primary_span()];
//! let mut fetcher = RowFetcher::start_scan(Arc::new(registry), &store, spans, ScanOptions::default()).unwrap();
//!
//! let mut per_table = [0, 0];
//! while let Some(row) = fetcher.next_row().await.unwrap() {
//!     per_table[row.entry_id().index()] += 1;
//! }
//! assert_eq!(per_table, [2, 6]);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod descriptor;
mod encoder;
mod error;
mod fetcher;
mod key_decoder;
mod keys;
mod matcher;
mod pool;
mod registry;
mod value_decoder;

pub use descriptor::{ColumnDescriptor, FamilyDescriptor, IndexDescriptor, InterleaveAncestor, TableDescriptor};
pub use encoder::RowEncoder;
pub use error::{ConfigError, DecodeError, DecodeErrorKind, EncodeError, FetchError, FetchResult};
pub use fetcher::{FetchedRow, FetcherStats, OwnedRow, RowFetcher, ScanOptions};
pub use keys::{encode_family_suffix, encode_index_ids};
pub use matcher::KeyMatch;
pub use pool::{DatumPool, PooledRow};
pub use registry::{EntryId, IndexKind, Projection, Registry, ScanEntry, ScanEntryArgs};
