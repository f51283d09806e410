//! Key encoding for ordered storage.
//!
//! Stores compare keys byte-lexicographically, so everything written into a
//! key must be encoded in a way where byte order equals logical order.
//!
//! # Modules
//!
//! - [`sortable`] - Escaped, terminated byte strings that keep their order
//!   and their boundary when other data is appended
//! - [`keys`] - The composite index key `encode(value) || encode(row_id)`

pub mod keys;
pub mod sortable;

#[cfg(test)]
mod proptest_tests;
