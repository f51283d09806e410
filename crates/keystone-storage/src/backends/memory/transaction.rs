//! In-memory transaction and store handles.

use std::cell::RefCell;
use std::ops::Bound;
use std::sync::Arc;

use tracing::debug;

use crate::engine::{pivot_of, ActiveGuard, StorageError, StorageResult, Store, Transaction};

use super::engine::{Catalog, MemoryEngine, Tree, WriterSlot};

/// A transaction for the in-memory storage engine.
///
/// Holds a private copy of the catalog. For a writable transaction it is the
/// working copy that [`commit`](Transaction::commit) publishes.
pub struct MemoryTransaction<'a> {
    engine: &'a MemoryEngine,
    stores: RefCell<Catalog>,
    writer: Option<WriterSlot<'a>>,
    _active: ActiveGuard<'a>,
}

impl<'a> MemoryTransaction<'a> {
    pub(super) fn new(
        engine: &'a MemoryEngine,
        stores: Catalog,
        writer: Option<WriterSlot<'a>>,
        active: ActiveGuard<'a>,
    ) -> Self {
        Self { engine, stores: RefCell::new(stores), writer, _active: active }
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.writer.is_none() {
            return Err(StorageError::TransactionReadOnly);
        }
        Ok(())
    }
}

impl Transaction for MemoryTransaction<'_> {
    type Store<'s>
        = MemoryStore<'s>
    where
        Self: 's;

    fn store(&self, name: &str) -> StorageResult<Self::Store<'_>> {
        let exists = self.stores.try_borrow().map_err(busy)?.contains_key(name);
        if !exists {
            return Err(StorageError::StoreNotFound(name.to_string()));
        }
        Ok(MemoryStore {
            stores: &self.stores,
            name: name.to_string(),
            writable: self.writer.is_some(),
        })
    }

    fn create_store(&mut self, name: &str) -> StorageResult<()> {
        self.check_writable()?;
        if name.is_empty() {
            return Err(StorageError::InvalidStoreName(name.to_string()));
        }

        let stores = self.stores.get_mut();
        if stores.contains_key(name) {
            return Err(StorageError::StoreAlreadyExists(name.to_string()));
        }
        stores.insert(name.to_string(), Arc::new(Tree::new()));
        debug!(store = name, "created store");
        Ok(())
    }

    fn drop_store(&mut self, name: &str) -> StorageResult<()> {
        self.check_writable()?;
        if self.stores.get_mut().remove(name).is_none() {
            return Err(StorageError::StoreNotFound(name.to_string()));
        }
        debug!(store = name, "dropped store");
        Ok(())
    }

    fn store_list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let stores = self.stores.try_borrow().map_err(busy)?;
        Ok(stores
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(name, _)| name)
            .take_while(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn commit(self) -> StorageResult<()> {
        if self.writer.is_none() {
            debug!(writable = false, "committed transaction");
            return Ok(());
        }

        let stores = self.stores.into_inner();
        let count = stores.len();
        self.engine.install(stores)?;
        debug!(writable = true, stores = count, "committed transaction");
        Ok(())
    }

    fn rollback(self) -> StorageResult<()> {
        debug!(writable = self.writer.is_some(), "rolled back transaction");
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.writer.is_none()
    }
}

fn busy(_: std::cell::BorrowError) -> StorageError {
    StorageError::Internal("transaction stores are being modified".to_string())
}

/// A handle to one store of a [`MemoryTransaction`].
pub struct MemoryStore<'a> {
    stores: &'a RefCell<Catalog>,
    name: String,
    writable: bool,
}

impl MemoryStore<'_> {
    /// The store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn not_found(&self) -> StorageError {
        StorageError::StoreNotFound(self.name.clone())
    }

    /// The store's current contents.
    ///
    /// Scans iterate this snapshot, so a visitor that writes to the store
    /// does not disturb the walk in progress.
    fn tree(&self) -> StorageResult<Arc<Tree>> {
        let stores = self.stores.try_borrow().map_err(busy)?;
        stores.get(&self.name).cloned().ok_or_else(|| self.not_found())
    }

    /// Run `f` on the store's map, copying it first if a snapshot shares it.
    fn modify<R>(&mut self, f: impl FnOnce(&mut Tree) -> R) -> StorageResult<R> {
        if !self.writable {
            return Err(StorageError::TransactionReadOnly);
        }
        let mut stores = self.stores.try_borrow_mut().map_err(|_| {
            StorageError::Internal("transaction stores are being read".to_string())
        })?;
        let tree = stores.get_mut(&self.name).ok_or_else(|| self.not_found())?;
        Ok(f(Arc::make_mut(tree)))
    }
}

impl Store for MemoryStore<'_> {
    fn get(&self, key: &[u8]) -> StorageResult<Vec<u8>> {
        let stores = self.stores.try_borrow().map_err(busy)?;
        let tree = stores.get(&self.name).ok_or_else(|| self.not_found())?;
        tree.get(key).cloned().ok_or(StorageError::KeyNotFound)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::TransactionReadOnly);
        }
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.modify(|tree| {
            tree.insert(key.to_vec(), value.to_vec());
        })
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::TransactionReadOnly);
        }
        // Avoid copying a shared map just to find nothing to delete.
        if !self.tree()?.contains_key(key) {
            return Err(StorageError::KeyNotFound);
        }
        self.modify(|tree| {
            tree.remove(key);
        })
    }

    fn truncate(&mut self) -> StorageResult<()> {
        if !self.writable {
            return Err(StorageError::TransactionReadOnly);
        }
        let mut stores = self.stores.try_borrow_mut().map_err(|_| {
            StorageError::Internal("transaction stores are being read".to_string())
        })?;
        let tree = stores.get_mut(&self.name).ok_or_else(|| self.not_found())?;
        *tree = Arc::new(Tree::new());
        debug!(store = %self.name, "truncated store");
        Ok(())
    }

    fn ascend_greater_or_equal<F, E>(&self, pivot: Option<&[u8]>, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>,
    {
        let tree = self.tree()?;
        let range = match pivot_of(pivot) {
            Some(pivot) => tree.range::<[u8], _>((Bound::Included(pivot), Bound::Unbounded)),
            None => tree.range::<[u8], _>(..),
        };
        for (key, value) in range {
            visit(key.as_slice(), value.as_slice())?;
        }
        Ok(())
    }

    fn descend_less_or_equal<F, E>(&self, pivot: Option<&[u8]>, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>,
    {
        let tree = self.tree()?;
        let range = match pivot_of(pivot) {
            Some(pivot) => tree.range::<[u8], _>((Bound::Unbounded, Bound::Included(pivot))),
            None => tree.range::<[u8], _>(..),
        };
        for (key, value) in range.rev() {
            visit(key.as_slice(), value.as_slice())?;
        }
        Ok(())
    }
}
