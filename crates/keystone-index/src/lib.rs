//! Keystone Index
//!
//! Secondary indexes over Keystone stores. An [`Index`] maps byte values to
//! the [`RowId`](keystone_core::RowId)s of the rows holding them; many rows
//! may share one value. Entries are ordered by value, then by row id, and are
//! walked with an [`IndexCursor`].
//!
//! # Example
//!
//! ```
//! use keystone_core::RowId;
//! use keystone_index::{Index, IndexEntry};
//! use keystone_storage::backends::MemoryEngine;
//! use keystone_storage::{StorageEngine, Transaction};
//!
//! let engine = MemoryEngine::new();
//! let mut tx = engine.begin_write().unwrap();
//! tx.create_store("idx_users_name").unwrap();
//!
//! let mut store = tx.store("idx_users_name").unwrap();
//! let mut index = Index::new(&mut store);
//! index.set(b"john", RowId::new(3)).unwrap();
//! index.set(b"jack", RowId::new(2)).unwrap();
//! index.set(b"jack", RowId::new(1)).unwrap();
//!
//! let mut cursor = index.cursor();
//! let jack = IndexEntry::new(b"jack".to_vec(), RowId::new(1));
//! let john = IndexEntry::new(b"john".to_vec(), RowId::new(3));
//! assert_eq!(cursor.first().unwrap(), Some(jack));
//! assert_eq!(cursor.seek(b"jackk").unwrap(), Some(john.clone()));
//! assert_eq!(cursor.seek(b"johnnnn").unwrap(), None);
//! assert_eq!(cursor.prev().unwrap(), Some(john));
//! ```
//!
//! # Modules
//!
//! - [`conformance`] - The suite every backend must pass for indexes

#![deny(clippy::unwrap_used)]

pub mod conformance;
mod cursor;
mod error;
mod index;

pub use cursor::IndexCursor;
pub use error::{IndexError, IndexResult};
pub use index::{Index, IndexEntry};
