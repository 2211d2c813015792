//! Configuration for StrataDB.

mod fetch;

pub use fetch::FetchConfig;
