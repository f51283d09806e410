//! Keystone Storage
//!
//! This crate provides the transactional, ordered key-value abstraction that
//! the rest of Keystone is built on, plus its backend implementations.
//!
//! # Overview
//!
//! An engine hands out transactions; a transaction scopes a set of named
//! stores; a store maps byte keys to byte values in byte-lexicographic order.
//! Backends are interchangeable: each must pass the same
//! [`conformance`] suite, so code written against the traits behaves the same
//! on every one of them.
//!
//! # Core Traits
//!
//! - [`StorageEngine`] - The main entry point, producing transactions
//! - [`Transaction`] - Store lifecycle plus commit/rollback
//! - [`Store`] - Point operations and ordered range scans
//!
//! # Error Handling
//!
//! All storage operations return [`StorageResult<T>`], which is an alias for
//! `Result<T, StorageError>`.
//!
//! # Example
//!
//! ```
//! use keystone_storage::backends::MemoryEngine;
//! use keystone_storage::{StorageEngine, StorageError, Store, Transaction};
//!
//! let engine = MemoryEngine::new();
//!
//! let mut tx = engine.begin_write().unwrap();
//! tx.create_store("users").unwrap();
//! {
//!     let mut users = tx.store("users").unwrap();
//!     users.put(b"user:1", b"Alice").unwrap();
//!     users.put(b"user:2", b"Bob").unwrap();
//! }
//! tx.commit().unwrap();
//!
//! let tx = engine.begin_read().unwrap();
//! let users = tx.store("users").unwrap();
//! let mut names = Vec::new();
//! users
//!     .ascend_greater_or_equal(Some(&b"user:"[..]), |_, v| {
//!         names.push(v.to_vec());
//!         Ok::<_, StorageError>(())
//!     })
//!     .unwrap();
//! assert_eq!(names, vec![b"Alice".to_vec(), b"Bob".to_vec()]);
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Storage engine traits and errors
//! - [`backends`] - Concrete storage backend implementations
//! - [`conformance`] - The suite every backend must pass

#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod conformance;
pub mod engine;

pub use engine::{StorageEngine, StorageError, StorageResult, Store, Transaction};
