//! Stateful cursor over an [`Index`](crate::Index).

use keystone_core::encoding::keys::{encode_index_value_prefix, successor};
use keystone_storage::Store;

use crate::error::IndexResult;
use crate::index::{Halt, IndexEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Position {
    /// No movement has happened yet.
    Unpositioned,
    /// On the entry with this composite key.
    At(Vec<u8>),
    /// A seek found nothing; parked after the last entry.
    AfterLast,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

/// A cursor walking index entries in (value, row id) order.
///
/// Every movement returns the entry the cursor lands on, or `None` when
/// there is no entry in that direction. Moving past either end leaves the
/// cursor on the boundary entry, so the opposite move returns its
/// neighbour. Only the current key is remembered: entries added or removed
/// between moves are seen as the cursor reaches them.
///
/// ```
/// use keystone_core::RowId;
/// use keystone_index::Index;
/// use keystone_storage::backends::MemoryEngine;
/// use keystone_storage::{StorageEngine, Transaction};
///
/// let engine = MemoryEngine::new();
/// let mut tx = engine.begin_write().unwrap();
/// tx.create_store("idx").unwrap();
/// let mut store = tx.store("idx").unwrap();
/// let mut index = Index::new(&mut store);
/// index.set(b"jack", RowId::new(1)).unwrap();
/// index.set(b"john", RowId::new(2)).unwrap();
///
/// let mut cursor = index.cursor();
/// let entry = cursor.seek(b"jo").unwrap().unwrap();
/// assert_eq!(entry.value, b"john");
/// assert_eq!(cursor.prev().unwrap().unwrap().value, b"jack");
/// assert!(cursor.prev().unwrap().is_none());
/// ```
pub struct IndexCursor<'a, S: Store> {
    store: &'a S,
    position: Position,
}

impl<'a, S: Store> IndexCursor<'a, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        Self { store, position: Position::Unpositioned }
    }

    /// Move to the smallest entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned or holds a malformed key.
    pub fn first(&mut self) -> IndexResult<Option<IndexEntry>> {
        let found = self.step(Direction::Forward, None, None)?;
        self.land(found, Position::Unpositioned)
    }

    /// Move to the largest entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned or holds a malformed key.
    pub fn last(&mut self) -> IndexResult<Option<IndexEntry>> {
        let found = self.step(Direction::Backward, None, None)?;
        self.land(found, Position::Unpositioned)
    }

    /// Move to the first entry whose value is `>= target`.
    ///
    /// If every value is smaller, returns `None` and parks the cursor after
    /// the last entry, where [`prev`](Self::prev) returns the last entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned or holds a malformed key.
    pub fn seek(&mut self, target: &[u8]) -> IndexResult<Option<IndexEntry>> {
        let pivot = encode_index_value_prefix(target);
        let found = self.step(Direction::Forward, Some(pivot.as_slice()), None)?;
        self.land(found, Position::AfterLast)
    }

    /// Move to the following entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned or holds a malformed key.
    pub fn next(&mut self) -> IndexResult<Option<IndexEntry>> {
        match &self.position {
            Position::Unpositioned => self.first(),
            Position::AfterLast => Ok(None),
            Position::At(key) => {
                let pivot = successor(key);
                let found = self.step(Direction::Forward, Some(pivot.as_slice()), None)?;
                self.advance(found)
            }
        }
    }

    /// Move to the preceding entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be scanned or holds a malformed key.
    pub fn prev(&mut self) -> IndexResult<Option<IndexEntry>> {
        match &self.position {
            Position::Unpositioned | Position::AfterLast => self.last(),
            Position::At(key) => {
                let key = key.as_slice();
                let found = self.step(Direction::Backward, Some(key), Some(key))?;
                self.advance(found)
            }
        }
    }

    /// Position after a jump: `missing` is where an empty result leaves the cursor.
    fn land(
        &mut self,
        found: Option<Vec<u8>>,
        missing: Position,
    ) -> IndexResult<Option<IndexEntry>> {
        match found {
            Some(key) => self.arrive(key),
            None => {
                self.position = missing;
                Ok(None)
            }
        }
    }

    /// Position after a relative step; running off the end keeps the current entry.
    fn advance(&mut self, found: Option<Vec<u8>>) -> IndexResult<Option<IndexEntry>> {
        match found {
            Some(key) => self.arrive(key),
            None => Ok(None),
        }
    }

    fn arrive(&mut self, key: Vec<u8>) -> IndexResult<Option<IndexEntry>> {
        let entry = IndexEntry::decode(&key)?;
        self.position = Position::At(key);
        Ok(Some(entry))
    }

    /// The first key from `pivot` in `direction`, skipping `exclude`.
    fn step(
        &self,
        direction: Direction,
        pivot: Option<&[u8]>,
        exclude: Option<&[u8]>,
    ) -> IndexResult<Option<Vec<u8>>> {
        let visit = |key: &[u8], _: &[u8]| {
            if Some(key) == exclude {
                return Ok(());
            }
            Err(Halt::Found(key.to_vec()))
        };

        let result = match direction {
            Direction::Forward => self.store.ascend_greater_or_equal(pivot, visit),
            Direction::Backward => self.store.descend_less_or_equal(pivot, visit),
        };

        match result {
            Ok(()) | Err(Halt::Done) => Ok(None),
            Err(Halt::Found(key)) => Ok(Some(key)),
            Err(Halt::Failed(e)) => Err(e),
        }
    }
}
