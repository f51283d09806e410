//! Storage backend implementations.
//!
//! - [`memory`] - Copy-on-write `BTreeMap` stores, the reference backend
//! - [`redb`] - Persistent (or in-memory) stores on the Redb embedded database

pub mod memory;
pub mod redb;

pub use self::memory::{MemoryConfig, MemoryEngine, MemoryStore, MemoryTransaction, WriterPolicy};
pub use self::redb::{RedbConfig, RedbEngine, RedbStore, RedbTransaction};
