//! Core types for StrataDB.

mod ids;
mod keys;

pub use ids::{ColumnId, FamilyId, IndexId, TableId};
pub use keys::{Key, Value};
