//! Redb storage backend.
//!
//! This module provides a storage backend implementation using Redb,
//! a pure-Rust embedded database. Each store maps to one Redb table, so
//! dropping a store drops the table and its pages with it.
//!
//! # Example
//!
//! ```
//! use keystone_storage::backends::RedbEngine;
//! use keystone_storage::{StorageEngine, Store, Transaction};
//!
//! let engine = RedbEngine::in_memory().unwrap();
//!
//! let mut tx = engine.begin_write().unwrap();
//! tx.create_store("users").unwrap();
//! tx.store("users").unwrap().put(b"user:1", b"Alice").unwrap();
//! tx.commit().unwrap();
//!
//! let tx = engine.begin_read().unwrap();
//! assert_eq!(tx.store("users").unwrap().get(b"user:1").unwrap(), b"Alice");
//! ```
//!
//! # Configuration
//!
//! Use `RedbConfig` to customize the database behavior:
//!
//! ```ignore
//! use keystone_storage::backends::{RedbConfig, RedbEngine};
//!
//! let config = RedbConfig::new()
//!     .cache_size(100 * 1024 * 1024); // 100 MB cache
//!
//! let engine = RedbEngine::open_with_config("my_database.redb", config)?;
//! ```

mod engine;
mod transaction;

pub use engine::{RedbConfig, RedbEngine};
pub use transaction::{RedbStore, RedbTransaction};
