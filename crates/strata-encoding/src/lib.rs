//! # strata-encoding
//!
//! Byte-level encodings used by StrataDB index entries.
//!
//! - [`key`]: order-preserving encodings for key columns. Encoded keys sort
//!   byte-wise in the same order as the values they encode, ascending or
//!   descending per column. Every encoding is self-delimiting, so a column's
//!   length can be found without decoding it.
//! - [`value`]: the tagged tuple encoding used for column family payloads,
//!   where each column is prefixed with its id (as a delta) and value type.
//! - [`Datum`]: a decoded scalar of a known [`ColumnType`].
//!
//! ## Example
//!
//! ```rust
//! use strata_encoding::key::{self, Direction};
//! use strata_encoding::{ColumnType, Datum};
//!
//! let mut buf = Vec::new();
//! key::encode_key_datum(&mut buf, &Datum::Int(-5), Direction::Ascending);
//! let (datum, len) = key::decode_key_datum(&buf, ColumnType::Int, Direction::Ascending).unwrap();
//! assert_eq!(datum, Datum::Int(-5));
//! assert_eq!(len, buf.len());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod datum;
mod error;
pub mod key;
pub mod value;

pub use datum::{ColumnType, Datum};
pub use error::{EncodingError, EncodingResult};
pub use key::Direction;
pub use value::ValueType;
