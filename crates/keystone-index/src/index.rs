//! The value to row id index.

use keystone_core::encoding::keys::{decode_index_key, encode_index_key, encode_index_value_prefix};
use keystone_core::RowId;
use keystone_storage::{StorageError, Store};
use tracing::trace;

use crate::cursor::IndexCursor;
use crate::error::{IndexError, IndexResult};

/// One (value, row id) pairing of an index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexEntry {
    /// The indexed value.
    pub value: Vec<u8>,
    /// The row holding the value.
    pub row_id: RowId,
}

impl IndexEntry {
    /// Create a new entry.
    pub fn new(value: impl Into<Vec<u8>>, row_id: RowId) -> Self {
        Self { value: value.into(), row_id }
    }

    pub(crate) fn decode(key: &[u8]) -> IndexResult<Self> {
        let (value, row_id) = decode_index_key(key)?;
        Ok(Self { value, row_id })
    }
}

/// Visitor error used to end a scan of the backing store.
pub(crate) enum Halt {
    /// The scan reached the key it was looking for.
    Found(Vec<u8>),
    /// The scan left the range of interest.
    Done,
    Failed(IndexError),
}

impl From<StorageError> for Halt {
    fn from(e: StorageError) -> Self {
        Self::Failed(e.into())
    }
}

/// A secondary index mapping byte values to the rows that hold them.
///
/// Many rows may share a value. Entries live in the backing store as
/// composite keys, ordered by value and then by row id, with empty stored
/// values; see [`keystone_core::encoding::keys`].
///
/// The index borrows nothing beyond its store, so it is typically built over
/// a store handle for the duration of a transaction:
///
/// ```
/// use keystone_core::RowId;
/// use keystone_index::Index;
/// use keystone_storage::backends::MemoryEngine;
/// use keystone_storage::{StorageEngine, Transaction};
///
/// let engine = MemoryEngine::new();
/// let mut tx = engine.begin_write().unwrap();
/// tx.create_store("idx_users_name").unwrap();
///
/// let mut store = tx.store("idx_users_name").unwrap();
/// let mut index = Index::new(&mut store);
/// index.set(b"jack", RowId::new(2)).unwrap();
/// index.set(b"jack", RowId::new(1)).unwrap();
/// index.set(b"john", RowId::new(3)).unwrap();
///
/// assert_eq!(index.row_ids(b"jack").unwrap(), vec![RowId::new(1), RowId::new(2)]);
/// ```
pub struct Index<S: Store> {
    store: S,
}

impl<S: Store> Index<S> {
    /// Build an index over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record that `row_id` holds `value`. Setting an existing pairing again
    /// has no effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    pub fn set(&mut self, value: &[u8], row_id: RowId) -> IndexResult<()> {
        let key = encode_index_key(value, row_id);
        self.store.put(&key, &[])?;
        trace!(value_len = value.len(), %row_id, "index set");
        Ok(())
    }

    /// Remove the pairing of `value` and `row_id`.
    ///
    /// # Errors
    ///
    /// Returns an error for which [`IndexError::is_key_not_found`] holds if
    /// the pairing is not in the index.
    pub fn delete(&mut self, value: &[u8], row_id: RowId) -> IndexResult<()> {
        let key = encode_index_key(value, row_id);
        self.store.delete(&key)?;
        trace!(value_len = value.len(), %row_id, "index delete");
        Ok(())
    }

    /// All rows holding `value`, in ascending row id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned or holds a malformed key.
    pub fn row_ids(&self, value: &[u8]) -> IndexResult<Vec<RowId>> {
        let prefix = encode_index_value_prefix(value);
        let mut row_ids = Vec::new();

        let result = self.store.ascend_greater_or_equal(Some(prefix.as_slice()), |key, _| {
            if !key.starts_with(&prefix) {
                return Err(Halt::Done);
            }
            let entry = IndexEntry::decode(key).map_err(Halt::Failed)?;
            row_ids.push(entry.row_id);
            Ok(())
        });

        match result {
            Ok(()) | Err(Halt::Done | Halt::Found(_)) => Ok(row_ids),
            Err(Halt::Failed(e)) => Err(e),
        }
    }

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be cleared.
    pub fn truncate(&mut self) -> IndexResult<()> {
        self.store.truncate()?;
        Ok(())
    }

    /// Open a cursor over the index. The cursor starts unpositioned.
    pub fn cursor(&self) -> IndexCursor<'_, S> {
        IndexCursor::new(&self.store)
    }

    /// Get a reference to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the backing store back.
    pub fn into_inner(self) -> S {
        self.store
    }
}
