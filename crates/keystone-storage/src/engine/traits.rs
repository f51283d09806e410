//! Core storage engine traits.
//!
//! This module defines the fundamental traits for storage backends:
//!
//! - [`StorageEngine`] - The entry point, producing transactions
//! - [`Transaction`] - A read-only or writable scope over named stores
//! - [`Store`] - An ordered byte-key/byte-value container
//!
//! Every backend must give identical observable behaviour for the same
//! sequence of calls; [`conformance`](crate::conformance) checks that.

use std::sync::Arc;

use super::{StorageError, StorageResult};

/// A storage engine that produces transactions over a set of named stores.
///
/// Implementations must be thread-safe (`Send + Sync`). Read-only
/// transactions may run concurrently and each sees a consistent snapshot
/// taken at [`begin`](StorageEngine::begin). Writable transactions are
/// serialized: a backend either waits for the active writer or refuses with
/// [`StorageError::WriterActive`].
///
/// # Example
///
/// ```ignore
/// use keystone_storage::{Store, StorageEngine, StorageError, Transaction};
///
/// fn example<E: StorageEngine>(engine: &E) -> Result<(), StorageError> {
///     let mut tx = engine.begin_write()?;
///     tx.create_store("users")?;
///     tx.store("users")?.put(b"user:1", b"Alice")?;
///     tx.commit()?;
///
///     let tx = engine.begin_read()?;
///     let alice = tx.store("users")?.get(b"user:1")?;
///     assert_eq!(alice, b"Alice");
///     Ok(())
/// }
/// ```
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a transaction in the requested mode.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Closed`] after [`close`](StorageEngine::close),
    /// [`StorageError::WriterActive`] if the backend refuses to wait for the
    /// current writer, or [`StorageError::Transaction`] if the backend cannot
    /// start one.
    fn begin(&self, writable: bool) -> StorageResult<Self::Transaction<'_>>;

    /// Begin a read-only transaction.
    ///
    /// # Errors
    ///
    /// See [`begin`](StorageEngine::begin).
    fn begin_read(&self) -> StorageResult<Self::Transaction<'_>> {
        self.begin(false)
    }

    /// Begin a writable transaction.
    ///
    /// # Errors
    ///
    /// See [`begin`](StorageEngine::begin).
    fn begin_write(&self) -> StorageResult<Self::Transaction<'_>> {
        self.begin(true)
    }

    /// Release all engine resources.
    ///
    /// Committed data is never affected. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TransactionsActive`] while any transaction
    /// produced by this engine is still alive.
    fn close(&self) -> StorageResult<()>;
}

/// A transaction scoping a set of named stores.
///
/// The transaction ends when it is consumed by [`commit`](Transaction::commit)
/// or [`rollback`](Transaction::rollback). Dropping an active transaction
/// rolls it back. Store handles borrow the transaction, so none can outlive it.
pub trait Transaction {
    /// The store handle type.
    type Store<'a>: Store
    where
        Self: 'a;

    /// Open an existing store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::StoreNotFound`] if no store has this name.
    fn store(&self, name: &str) -> StorageResult<Self::Store<'_>>;

    /// Create a new, empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TransactionReadOnly`] on a read-only transaction,
    /// [`StorageError::StoreAlreadyExists`] if the name is taken, or
    /// [`StorageError::InvalidStoreName`] for an empty name.
    fn create_store(&mut self, name: &str) -> StorageResult<()>;

    /// Drop a store and all of its entries.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::TransactionReadOnly`] on a read-only transaction
    /// or [`StorageError::StoreNotFound`] if no store has this name.
    fn drop_store(&mut self, name: &str) -> StorageResult<()>;

    /// List the names of all stores starting with `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot enumerate its stores.
    fn store_list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Atomically apply every mutation made through this transaction.
    ///
    /// Commit on a read-only transaction just ends it. If commit fails the
    /// pending writes are discarded; none of them become visible.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the backend fails to commit or
    /// [`StorageError::Closed`] if the engine was closed underneath.
    fn commit(self) -> StorageResult<()>;

    /// Discard every mutation made through this transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the backend fails to abort.
    fn rollback(self) -> StorageResult<()>;

    /// Check if this is a read-only transaction.
    fn is_read_only(&self) -> bool;
}

/// An ordered byte-key/byte-value container.
///
/// Keys compare byte-lexicographically and are unique. Mutating methods
/// return [`StorageError::TransactionReadOnly`] on a read-only transaction
/// and leave the store untouched.
///
/// # Range scans
///
/// The two scan primitives seek to a pivot and walk from there, calling a
/// visitor for each entry. The visitor stops the walk by returning an error,
/// which is handed back unchanged. Callers choose the error type; backend
/// failures are converted into it with `From<StorageError>`.
///
/// ```ignore
/// // Collect every key starting with "user:".
/// let mut keys = Vec::new();
/// store.ascend_greater_or_equal(Some(&b"user:"[..]), |k, _| {
///     if !k.starts_with(b"user:") {
///         return Err(Stop::Done);
///     }
///     keys.push(k.to_vec());
///     Ok(())
/// })?;
/// ```
///
/// Visitors may read the store being iterated but must not mutate it.
pub trait Store {
    /// Get the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::KeyNotFound`] if the key doesn't exist.
    fn get(&self, key: &[u8]) -> StorageResult<Vec<u8>>;

    /// Insert a key-value pair, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EmptyKey`] for an empty key.
    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Remove a key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::KeyNotFound`] if the key doesn't exist.
    fn delete(&mut self, key: &[u8]) -> StorageResult<()>;

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to clear the store.
    fn truncate(&mut self) -> StorageResult<()>;

    /// Visit entries in ascending key order, starting at the smallest key
    /// `>= pivot`, or at the smallest key when `pivot` is `None` or empty.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `visit`, or a backend failure
    /// converted into `E`.
    fn ascend_greater_or_equal<F, E>(&self, pivot: Option<&[u8]>, visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>;

    /// Visit entries in descending key order, starting at the largest key
    /// `<= pivot`, or at the largest key when `pivot` is `None` or empty.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `visit`, or a backend failure
    /// converted into `E`.
    fn descend_less_or_equal<F, E>(&self, pivot: Option<&[u8]>, visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>;
}

/// Normalize a scan pivot: an empty pivot means "no pivot".
pub(crate) fn pivot_of(pivot: Option<&[u8]>) -> Option<&[u8]> {
    pivot.filter(|p| !p.is_empty())
}

// ============================================================================
// Blanket Implementations
// ============================================================================

/// Implement `StorageEngine` for `Arc<E>` to allow shared ownership of engines.
impl<E: StorageEngine> StorageEngine for Arc<E> {
    type Transaction<'a>
        = E::Transaction<'a>
    where
        Self: 'a;

    fn begin(&self, writable: bool) -> StorageResult<Self::Transaction<'_>> {
        (**self).begin(writable)
    }

    fn close(&self) -> StorageResult<()> {
        (**self).close()
    }
}

/// Implement `Store` for mutable references so a handle can be lent out.
impl<S: Store + ?Sized> Store for &mut S {
    fn get(&self, key: &[u8]) -> StorageResult<Vec<u8>> {
        (**self).get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        (**self).put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<()> {
        (**self).delete(key)
    }

    fn truncate(&mut self) -> StorageResult<()> {
        (**self).truncate()
    }

    fn ascend_greater_or_equal<F, E>(&self, pivot: Option<&[u8]>, visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>,
    {
        (**self).ascend_greater_or_equal(pivot, visit)
    }

    fn descend_less_or_equal<F, E>(&self, pivot: Option<&[u8]>, visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>,
    {
        (**self).descend_less_or_equal(pivot, visit)
    }
}
