//! Core data types.

mod id;

pub use id::RowId;
