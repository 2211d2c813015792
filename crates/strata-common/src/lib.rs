//! # strata-common
//!
//! Common types, errors, and configuration for StrataDB.
//!
//! This crate provides the foundational types shared by the encoding,
//! key-value, and row fetching layers:
//!
//! - **Types**: Descriptor identifiers (`TableId`, `IndexId`, `ColumnId`,
//!   `FamilyId`) and byte-string keys and values
//! - **Errors**: Stable `ErrorCode`s and the `StrataError` type
//! - **Config**: Row fetcher configuration loaded from TOML
//! - **Constants**: System-wide limits and defaults
//!
//! ## Example
//!
//! ```rust
//! use strata_common::types::{IndexId, Key, TableId};
//!
//! let table = TableId::new(51);
//! let index = IndexId::PRIMARY;
//! let key = Key::from_bytes(&[0xbb, 0x89]);
//! assert_eq!(table.as_u32(), 51);
//! assert_eq!(index.as_u32(), 1);
//! assert_eq!(key.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::FetchConfig;
pub use constants::*;
pub use error::{ErrorCode, StrataError, StrataResult};
pub use types::{ColumnId, FamilyId, IndexId, Key, TableId, Value};
