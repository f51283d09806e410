//! Storage engine traits and abstractions.
//!
//! This module defines the core traits that storage backends must implement:
//!
//! - [`StorageEngine`] - Main entry point for creating transactions
//! - [`Transaction`] - Store lifecycle plus commit/rollback
//! - [`Store`] - Point operations and ordered range scans
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`] which is an alias for
//! `Result<T, StorageError>`. See [`StorageError`] for the possible error variants.

mod error;
mod lifecycle;
mod traits;

pub use error::{StorageError, StorageResult};
pub(crate) use lifecycle::{ActiveGuard, Lifecycle};
pub(crate) use traits::pivot_of;
pub use traits::{StorageEngine, Store, Transaction};
