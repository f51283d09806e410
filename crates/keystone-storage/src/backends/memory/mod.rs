//! In-memory storage backend.
//!
//! The reference backend: every store is a `BTreeMap` held behind an `Arc`,
//! and the engine publishes an immutable catalog of stores on each commit.
//!
//! - Read-only transactions clone the current catalog pointer and keep
//!   seeing that snapshot until they end.
//! - The single writable transaction works on its own copy of the catalog;
//!   a store's map is copied the first time the transaction writes to it.
//! - Commit swaps the writer's catalog in; rollback drops it.
//!
//! # Example
//!
//! ```
//! use keystone_storage::backends::MemoryEngine;
//! use keystone_storage::{StorageEngine, Store, Transaction};
//!
//! let engine = MemoryEngine::new();
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
//! # Writer policy
//!
//! What a second `begin_write` does while a writer is active is set with
//! [`MemoryConfig`]:
//!
//! ```
//! use std::time::Duration;
//! use keystone_storage::backends::{MemoryConfig, MemoryEngine, WriterPolicy};
//!
//! let engine = MemoryEngine::with_config(
//!     MemoryConfig::new().writer_policy(WriterPolicy::Timeout(Duration::from_millis(50))),
//! );
//! ```

mod engine;
mod transaction;

pub use engine::{MemoryConfig, MemoryEngine, WriterPolicy};
pub use transaction::{MemoryStore, MemoryTransaction};
