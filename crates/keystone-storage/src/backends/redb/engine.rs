//! Redb storage engine implementation.

use std::path::Path;
use std::sync::RwLock;

use redb::{Builder, Database};
use tracing::debug;

use crate::engine::{Lifecycle, StorageEngine, StorageError, StorageResult};

use super::transaction::RedbTransaction;

/// Configuration options for the Redb storage engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedbConfig {
    /// Cache size in bytes. If `None`, uses Redb's default.
    pub cache_size: Option<usize>,
}

impl RedbConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache size in bytes.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    fn builder(&self) -> Builder {
        let mut builder = Database::builder();
        if let Some(size) = self.cache_size {
            builder.set_cache_size(size);
        }
        builder
    }
}

/// A storage engine backed by Redb.
///
/// Every store is a Redb table of byte keys to byte values. Redb gives
/// snapshot isolation to read transactions and serializes writers; a second
/// `begin_write` blocks until the active writer ends.
pub struct RedbEngine {
    /// `None` once the engine is closed.
    db: RwLock<Option<Database>>,
    lifecycle: Lifecycle,
}

impl RedbEngine {
    /// Open or create a database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, RedbConfig::default())
    }

    /// Open or create a database at the given path with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database file cannot be opened.
    pub fn open_with_config(path: impl AsRef<Path>, config: RedbConfig) -> StorageResult<Self> {
        let path = path.as_ref();
        let db = config.builder().create(path).map_err(|e| StorageError::Open(e.to_string()))?;
        debug!(path = %path.display(), cache_size = ?config.cache_size, "opened redb engine");
        Ok(Self::from_database(db))
    }

    /// Create a database that lives only in memory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be created.
    pub fn in_memory() -> StorageResult<Self> {
        let db = RedbConfig::default()
            .builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| StorageError::Open(e.to_string()))?;
        debug!("opened in-memory redb engine");
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        Self { db: RwLock::new(Some(db)), lifecycle: Lifecycle::new() }
    }
}

impl StorageEngine for RedbEngine {
    type Transaction<'a> = RedbTransaction<'a>;

    fn begin(&self, writable: bool) -> StorageResult<Self::Transaction<'_>> {
        let active = self.lifecycle.enter()?;
        let db = self.db.read().map_err(|_| StorageError::poisoned("redb database"))?;
        let db = db.as_ref().ok_or(StorageError::Closed)?;

        let tx = if writable {
            RedbTransaction::write(
                db.begin_write().map_err(|e| StorageError::Transaction(e.to_string()))?,
                active,
            )
        } else {
            RedbTransaction::read(
                db.begin_read().map_err(|e| StorageError::Transaction(e.to_string()))?,
                active,
            )
        };

        debug!(writable, "begin transaction");
        Ok(tx)
    }

    fn close(&self) -> StorageResult<()> {
        if self.lifecycle.close()? {
            let mut db = self.db.write().map_err(|_| StorageError::poisoned("redb database"))?;
            *db = None;
            debug!("redb engine closed");
        }
        Ok(())
    }
}
