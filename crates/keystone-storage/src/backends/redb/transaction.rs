//! Redb transaction and store handles.

use std::fmt::Display;
use std::ops::Bound;

use redb::{
    AccessGuard, ReadTransaction, ReadableTable, TableDefinition, TableError, TableHandle,
    WriteTransaction,
};
use tracing::debug;

use crate::engine::{pivot_of, ActiveGuard, StorageError, StorageResult, Store, Transaction};

/// Key and value type of every store table.
type Bytes = &'static [u8];

type KeyValue = (Vec<u8>, Vec<u8>);

/// Entries fetched per table opening during a scan.
const SCAN_BATCH_SIZE: usize = 1000;

fn definition(name: &str) -> TableDefinition<'_, Bytes, Bytes> {
    TableDefinition::new(name)
}

fn internal(e: impl Display) -> StorageError {
    StorageError::Internal(e.to_string())
}

fn table_error(name: &str, e: TableError) -> StorageError {
    match e {
        TableError::TableDoesNotExist(_) => StorageError::StoreNotFound(name.to_string()),
        other => internal(other),
    }
}

/// The underlying Redb transaction.
pub(super) enum Inner {
    Read(ReadTransaction),
    Write(WriteTransaction),
}

impl Inner {
    fn writer(&self) -> StorageResult<&WriteTransaction> {
        match self {
            Self::Write(tx) => Ok(tx),
            Self::Read(_) => Err(StorageError::TransactionReadOnly),
        }
    }

    fn table_names(&self) -> StorageResult<Vec<String>> {
        let names = match self {
            Self::Read(tx) => {
                tx.list_tables().map_err(internal)?.map(|t| t.name().to_string()).collect()
            }
            Self::Write(tx) => {
                tx.list_tables().map_err(internal)?.map(|t| t.name().to_string()).collect()
            }
        };
        Ok(names)
    }

    fn has_table(&self, name: &str) -> StorageResult<bool> {
        Ok(self.table_names()?.iter().any(|n| n == name))
    }

    /// Up to [`SCAN_BATCH_SIZE`] entries of table `name` starting at `from`.
    ///
    /// The table is closed again before returning.
    fn fetch_batch(
        &self,
        name: &str,
        from: Bound<&[u8]>,
        forward: bool,
    ) -> StorageResult<Vec<KeyValue>> {
        let def = definition(name);
        let range = if forward { (from, Bound::Unbounded) } else { (Bound::Unbounded, from) };
        match self {
            Self::Read(tx) => {
                let table = tx.open_table(def).map_err(|e| table_error(name, e))?;
                take_batch(&table, range, forward)
            }
            Self::Write(tx) => {
                let table = tx.open_table(def).map_err(|e| table_error(name, e))?;
                take_batch(&table, range, forward)
            }
        }
    }
}

/// A transaction for the Redb storage engine.
pub struct RedbTransaction<'a> {
    inner: Inner,
    _active: ActiveGuard<'a>,
}

impl<'a> RedbTransaction<'a> {
    pub(super) fn read(tx: ReadTransaction, active: ActiveGuard<'a>) -> Self {
        Self { inner: Inner::Read(tx), _active: active }
    }

    pub(super) fn write(tx: WriteTransaction, active: ActiveGuard<'a>) -> Self {
        Self { inner: Inner::Write(tx), _active: active }
    }
}

impl Transaction for RedbTransaction<'_> {
    type Store<'s>
        = RedbStore<'s>
    where
        Self: 's;

    fn store(&self, name: &str) -> StorageResult<Self::Store<'_>> {
        if !self.inner.has_table(name)? {
            return Err(StorageError::StoreNotFound(name.to_string()));
        }
        Ok(RedbStore { tx: &self.inner, name: name.to_string() })
    }

    fn create_store(&mut self, name: &str) -> StorageResult<()> {
        let tx = self.inner.writer()?;
        if name.is_empty() {
            return Err(StorageError::InvalidStoreName(name.to_string()));
        }
        if self.inner.has_table(name)? {
            return Err(StorageError::StoreAlreadyExists(name.to_string()));
        }

        // Opening a table in a write transaction creates it.
        tx.open_table(definition(name)).map_err(internal)?;
        debug!(store = name, "created store");
        Ok(())
    }

    fn drop_store(&mut self, name: &str) -> StorageResult<()> {
        let tx = self.inner.writer()?;
        if !tx.delete_table(definition(name)).map_err(internal)? {
            return Err(StorageError::StoreNotFound(name.to_string()));
        }
        debug!(store = name, "dropped store");
        Ok(())
    }

    fn store_list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> =
            self.inner.table_names()?.into_iter().filter(|n| n.starts_with(prefix)).collect();
        names.sort_unstable();
        Ok(names)
    }

    fn commit(self) -> StorageResult<()> {
        match self.inner {
            Inner::Write(tx) => {
                tx.commit().map_err(|e| StorageError::Transaction(e.to_string()))?;
                debug!(writable = true, "committed transaction");
            }
            Inner::Read(_) => debug!(writable = false, "committed transaction"),
        }
        Ok(())
    }

    fn rollback(self) -> StorageResult<()> {
        match self.inner {
            Inner::Write(tx) => {
                tx.abort().map_err(|e| StorageError::Transaction(e.to_string()))?;
                debug!(writable = true, "rolled back transaction");
            }
            Inner::Read(_) => debug!(writable = false, "rolled back transaction"),
        }
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        matches!(self.inner, Inner::Read(_))
    }
}

/// A handle to one store (Redb table) of a [`RedbTransaction`].
///
/// Each call opens the table afresh. Scans fetch entries in batches and close
/// the table before visiting them, so a visitor may read the scanned store.
/// Writes made by a visitor show up in batches not yet fetched.
pub struct RedbStore<'a> {
    tx: &'a Inner,
    name: String,
}

impl RedbStore<'_> {
    /// The store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn scan<F, E>(&self, pivot: Option<&[u8]>, forward: bool, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>,
    {
        let pivot = pivot_of(pivot);
        let mut resume: Option<Vec<u8>> = None;
        loop {
            let from = match (&resume, pivot) {
                (Some(last), _) => Bound::Excluded(last.as_slice()),
                (None, Some(pivot)) => Bound::Included(pivot),
                (None, None) => Bound::Unbounded,
            };
            let batch = self.tx.fetch_batch(&self.name, from, forward)?;
            let exhausted = batch.len() < SCAN_BATCH_SIZE;

            for (key, value) in &batch {
                visit(key.as_slice(), value.as_slice())?;
            }
            if exhausted {
                return Ok(());
            }
            resume = batch.into_iter().next_back().map(|(key, _)| key);
        }
    }
}

impl Store for RedbStore<'_> {
    fn get(&self, key: &[u8]) -> StorageResult<Vec<u8>> {
        let def = definition(&self.name);
        let value = match self.tx {
            Inner::Read(tx) => {
                let table = tx.open_table(def).map_err(|e| table_error(&self.name, e))?;
                lookup(&table, key)?
            }
            Inner::Write(tx) => {
                let table = tx.open_table(def).map_err(|e| table_error(&self.name, e))?;
                lookup(&table, key)?
            }
        };
        value.ok_or(StorageError::KeyNotFound)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let tx = self.tx.writer()?;
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        let mut table =
            tx.open_table(definition(&self.name)).map_err(|e| table_error(&self.name, e))?;
        table.insert(key, value).map_err(internal)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<()> {
        let tx = self.tx.writer()?;
        let mut table =
            tx.open_table(definition(&self.name)).map_err(|e| table_error(&self.name, e))?;
        let removed = table.remove(key).map_err(internal)?.is_some();
        if !removed {
            return Err(StorageError::KeyNotFound);
        }
        Ok(())
    }

    fn truncate(&mut self) -> StorageResult<()> {
        let tx = self.tx.writer()?;
        tx.delete_table(definition(&self.name)).map_err(internal)?;
        tx.open_table(definition(&self.name)).map_err(internal)?;
        debug!(store = %self.name, "truncated store");
        Ok(())
    }

    fn ascend_greater_or_equal<F, E>(&self, pivot: Option<&[u8]>, visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>,
    {
        self.scan(pivot, true, visit)
    }

    fn descend_less_or_equal<F, E>(&self, pivot: Option<&[u8]>, visit: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
        E: From<StorageError>,
    {
        self.scan(pivot, false, visit)
    }
}

fn lookup<T>(table: &T, key: &[u8]) -> StorageResult<Option<Vec<u8>>>
where
    T: ReadableTable<Bytes, Bytes>,
{
    Ok(table.get(key).map_err(internal)?.map(|v| v.value().to_vec()))
}

fn take_batch<T>(
    table: &T,
    range: (Bound<&[u8]>, Bound<&[u8]>),
    forward: bool,
) -> StorageResult<Vec<KeyValue>>
where
    T: ReadableTable<Bytes, Bytes>,
{
    let range = table.range::<&[u8]>(range).map_err(internal)?;
    if forward {
        collect_batch(range)
    } else {
        collect_batch(range.rev())
    }
}

type RawEntry<'g> = Result<(AccessGuard<'g, Bytes>, AccessGuard<'g, Bytes>), redb::StorageError>;

fn collect_batch<'g, I>(entries: I) -> StorageResult<Vec<KeyValue>>
where
    I: Iterator<Item = RawEntry<'g>>,
{
    entries
        .take(SCAN_BATCH_SIZE)
        .map(|entry| {
            let (key, value) = entry.map_err(internal)?;
            Ok((key.value().to_vec(), value.value().to_vec()))
        })
        .collect()
}
