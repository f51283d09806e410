//! In-memory storage engine implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use tracing::debug;

use crate::engine::{Lifecycle, StorageEngine, StorageError, StorageResult};

use super::transaction::MemoryTransaction;

/// The contents of one store.
pub(super) type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// All stores of an engine, by name.
pub(super) type Catalog = BTreeMap<String, Arc<Tree>>;

/// What `begin_write` does while another writable transaction is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriterPolicy {
    /// Wait until the active writer commits or rolls back.
    #[default]
    Block,
    /// Wait at most this long, then fail with [`StorageError::WriterActive`].
    Timeout(Duration),
    /// Fail immediately with [`StorageError::WriterActive`].
    Fail,
}

/// Configuration options for the in-memory storage engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryConfig {
    /// Policy for concurrent `begin_write` calls.
    pub writer_policy: WriterPolicy,
}

impl MemoryConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the writer policy.
    #[must_use]
    pub const fn writer_policy(mut self, policy: WriterPolicy) -> Self {
        self.writer_policy = policy;
        self
    }
}

/// A storage engine that keeps every store in memory.
///
/// Data lives as long as the engine; [`close`](StorageEngine::close) drops it.
pub struct MemoryEngine {
    config: MemoryConfig,
    /// The latest committed catalog.
    committed: RwLock<Arc<Catalog>>,
    writer: WriterLock,
    lifecycle: Lifecycle,
}

impl MemoryEngine {
    /// Create an empty engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    /// Create an empty engine with custom configuration.
    pub fn with_config(config: MemoryConfig) -> Self {
        debug!(writer_policy = ?config.writer_policy, "opening memory engine");
        Self {
            config,
            committed: RwLock::new(Arc::new(Catalog::new())),
            writer: WriterLock::default(),
            lifecycle: Lifecycle::new(),
        }
    }

    /// Get the engine configuration.
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Publish a writer's catalog as the new committed state.
    pub(super) fn install(&self, catalog: Catalog) -> StorageResult<()> {
        let mut committed =
            self.committed.write().map_err(|_| StorageError::poisoned("committed catalog"))?;
        *committed = Arc::new(catalog);
        Ok(())
    }

    fn snapshot(&self) -> StorageResult<Arc<Catalog>> {
        let committed =
            self.committed.read().map_err(|_| StorageError::poisoned("committed catalog"))?;
        Ok(Arc::clone(&committed))
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemoryEngine {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&self, writable: bool) -> StorageResult<Self::Transaction<'_>> {
        let active = self.lifecycle.enter()?;
        // Take the writer slot before the snapshot so the writer starts from
        // the latest commit.
        let writer =
            if writable { Some(self.writer.acquire(self.config.writer_policy)?) } else { None };
        let snapshot = self.snapshot()?;

        debug!(writable, stores = snapshot.len(), "begin transaction");
        Ok(MemoryTransaction::new(self, (*snapshot).clone(), writer, active))
    }

    fn close(&self) -> StorageResult<()> {
        if self.lifecycle.close()? {
            self.install(Catalog::new())?;
            debug!("memory engine closed");
        }
        Ok(())
    }
}

/// Serializes writable transactions.
#[derive(Debug, Default)]
struct WriterLock {
    busy: Mutex<bool>,
    released: Condvar,
}

impl WriterLock {
    fn acquire(&self, policy: WriterPolicy) -> StorageResult<WriterSlot<'_>> {
        let busy = self.busy.lock().map_err(|_| StorageError::poisoned("writer slot"))?;

        let mut busy = match policy {
            WriterPolicy::Block => self
                .released
                .wait_while(busy, |busy| *busy)
                .map_err(|_| StorageError::poisoned("writer slot"))?,
            WriterPolicy::Timeout(timeout) => {
                let (busy, _) = self
                    .released
                    .wait_timeout_while(busy, timeout, |busy| *busy)
                    .map_err(|_| StorageError::poisoned("writer slot"))?;
                busy
            }
            WriterPolicy::Fail => busy,
        };

        if *busy {
            return Err(StorageError::WriterActive);
        }
        *busy = true;
        Ok(WriterSlot { lock: self })
    }
}

/// Marks the writer slot as taken until dropped.
#[derive(Debug)]
pub(super) struct WriterSlot<'a> {
    lock: &'a WriterLock,
}

impl Drop for WriterSlot<'_> {
    fn drop(&mut self) {
        let mut busy = match self.lock.busy.lock() {
            Ok(busy) => busy,
            Err(poisoned) => poisoned.into_inner(),
        };
        *busy = false;
        self.lock.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::engine::{Store, Transaction};

    #[test]
    fn test_config_builder() {
        let config = MemoryConfig::new().writer_policy(WriterPolicy::Fail);
        assert_eq!(config.writer_policy, WriterPolicy::Fail);
        assert_eq!(MemoryConfig::default().writer_policy, WriterPolicy::Block);
    }

    #[test]
    fn test_fail_policy_rejects_second_writer() {
        let engine =
            MemoryEngine::with_config(MemoryConfig::new().writer_policy(WriterPolicy::Fail));

        let first = engine.begin_write().expect("first writer");
        assert!(matches!(engine.begin_write(), Err(StorageError::WriterActive)));

        // Readers are unaffected by the active writer.
        let reader = engine.begin_read().expect("reader");
        reader.rollback().expect("rollback reader");

        first.rollback().expect("rollback");
        engine.begin_write().expect("writer after release").commit().expect("commit");
    }

    #[test]
    fn test_timeout_policy_gives_up() {
        let timeout = Duration::from_millis(20);
        let engine = MemoryEngine::with_config(
            MemoryConfig::new().writer_policy(WriterPolicy::Timeout(timeout)),
        );

        let first = engine.begin_write().expect("first writer");
        assert!(matches!(engine.begin_write(), Err(StorageError::WriterActive)));

        first.rollback().expect("rollback");
        engine.begin_write().expect("writer after release").rollback().expect("rollback");
    }

    #[test]
    fn test_block_policy_waits_for_writer() {
        let engine = Arc::new(MemoryEngine::new());

        let mut first = engine.begin_write().expect("first writer");
        first.create_store("counter").expect("create");
        first.store("counter").expect("store").put(b"n", b"1").expect("put");

        let waiter = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let tx = engine.begin_write().expect("second writer");
                let value = tx.store("counter").expect("store").get(b"n").expect("get");
                tx.rollback().expect("rollback");
                value
            })
        };

        thread::sleep(Duration::from_millis(20));
        first.commit().expect("commit");

        // The blocked writer starts from the state the first writer committed.
        assert_eq!(waiter.join().expect("join"), b"1");
    }

    #[test]
    fn test_close_drops_data() {
        let engine = MemoryEngine::new();
        {
            let mut tx = engine.begin_write().expect("begin");
            tx.create_store("t").expect("create");
            tx.commit().expect("commit");
        }

        engine.close().expect("close");
        engine.close().expect("second close");
        assert!(matches!(engine.begin_read(), Err(StorageError::Closed)));
        assert!(engine.snapshot().expect("snapshot").is_empty());
    }
}
