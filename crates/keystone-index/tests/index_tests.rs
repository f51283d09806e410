//! Index behaviour across transactions, plus cursor walks against a model.

use std::collections::BTreeSet;

use proptest::prelude::*;

use keystone_core::RowId;
use keystone_index::{Index, IndexEntry};
use keystone_storage::backends::{MemoryEngine, RedbEngine};
use keystone_storage::{StorageEngine, Transaction};

/// Build an index in one transaction and read it from the next.
fn commit_then_read<E: StorageEngine>(engine: &E) {
    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.create_store("idx_name").expect("failed to create store");
        let mut store = tx.store("idx_name").expect("failed to open store");
        let mut index = Index::new(&mut store);
        index.set(b"jack", RowId::new(2)).expect("failed to set");
        index.set(b"jack", RowId::new(1)).expect("failed to set");
        index.set(b"john", RowId::new(3)).expect("failed to set");
        drop(store);
        tx.commit().expect("failed to commit");
    }

    let tx = engine.begin_read().expect("failed to begin read");
    let mut store = tx.store("idx_name").expect("failed to open store");
    let mut index = Index::new(&mut store);

    assert_eq!(index.row_ids(b"jack").expect("row ids"), vec![RowId::new(1), RowId::new(2)]);
    assert_eq!(
        index.cursor().last().expect("last"),
        Some(IndexEntry::new(b"john".to_vec(), RowId::new(3)))
    );

    // Writes through a read-only transaction are refused.
    assert!(index.set(b"jim", RowId::new(4)).expect_err("read-only").is_read_only());
    assert!(index.delete(b"jack", RowId::new(1)).expect_err("read-only").is_read_only());
    assert!(index.truncate().expect_err("read-only").is_read_only());
}

#[test]
fn test_memory_index_survives_commit() {
    commit_then_read(&MemoryEngine::new());
}

#[test]
fn test_redb_index_survives_commit() {
    commit_then_read(&RedbEngine::in_memory().expect("failed to open"));
}

#[test]
fn test_redb_index_survives_reopen() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("index.redb");

    {
        let engine = RedbEngine::open(&path).expect("failed to open");
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.create_store("idx").expect("failed to create store");
        let mut store = tx.store("idx").expect("failed to open store");
        Index::new(&mut store).set(b"persisted", RowId::new(42)).expect("failed to set");
        drop(store);
        tx.commit().expect("failed to commit");
        engine.close().expect("failed to close");
    }

    let engine = RedbEngine::open(&path).expect("failed to reopen");
    let tx = engine.begin_read().expect("failed to begin read");
    let store = tx.store("idx").expect("failed to open store");
    let index = Index::new(store);
    assert_eq!(index.row_ids(b"persisted").expect("row ids"), vec![RowId::new(42)]);
}

#[test]
fn test_rolled_back_entries_vanish() {
    let engine = MemoryEngine::new();
    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.create_store("idx").expect("failed to create store");
        tx.commit().expect("failed to commit");
    }
    {
        let tx = engine.begin_write().expect("failed to begin write");
        let mut store = tx.store("idx").expect("failed to open store");
        Index::new(&mut store).set(b"temp", RowId::new(1)).expect("failed to set");
        drop(store);
        tx.rollback().expect("failed to rollback");
    }

    let tx = engine.begin_read().expect("failed to begin read");
    let store = tx.store("idx").expect("failed to open store");
    assert_eq!(Index::new(store).cursor().first().expect("first"), None);
}

// ============================================================================
// Cursor walks against a sorted model
// ============================================================================

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![Just(0u8), Just(1), Just(b'j'), Just(0xff)], 0..4)
}

fn entries_strategy() -> impl Strategy<Value = Vec<(Vec<u8>, u64)>> {
    prop::collection::vec((value_strategy(), 0u64..5), 0..40)
}

fn check_walks<E: StorageEngine>(
    engine: &E,
    entries: &[(Vec<u8>, u64)],
    targets: &[Vec<u8>],
) -> Result<(), TestCaseError> {
    let mut tx = engine.begin_write().expect("begin");
    tx.create_store("idx").expect("create");
    let mut store = tx.store("idx").expect("store");
    let mut index = Index::new(&mut store);

    let mut model = BTreeSet::new();
    for (value, id) in entries {
        index.set(value, RowId::new(*id)).expect("set");
        model.insert((value.clone(), *id));
    }
    let sorted: Vec<IndexEntry> =
        model.iter().map(|(v, id)| IndexEntry::new(v.clone(), RowId::new(*id))).collect();

    let mut cursor = index.cursor();

    let mut forward = Vec::new();
    let mut next = cursor.first().expect("first");
    while let Some(entry) = next {
        forward.push(entry);
        next = cursor.next().expect("next");
    }
    prop_assert_eq!(&forward, &sorted);

    let mut backward = Vec::new();
    let mut prev = cursor.last().expect("last");
    while let Some(entry) = prev {
        backward.push(entry);
        prev = cursor.prev().expect("prev");
    }
    backward.reverse();
    prop_assert_eq!(&backward, &sorted);

    for target in targets {
        let expected = sorted.iter().find(|e| e.value.as_slice() >= target.as_slice()).cloned();
        prop_assert_eq!(cursor.seek(target).expect("seek"), expected.clone());

        match expected {
            // The entry before the ceiling, if any.
            Some(found) => {
                let before = sorted.iter().rev().find(|e| **e < found).cloned();
                prop_assert_eq!(cursor.prev().expect("prev"), before);
            }
            // Parked past the end.
            None => prop_assert_eq!(cursor.prev().expect("prev"), sorted.last().cloned()),
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn memory_cursor_matches_model(
        entries in entries_strategy(),
        targets in prop::collection::vec(value_strategy(), 0..6),
    ) {
        check_walks(&MemoryEngine::new(), &entries, &targets)?;
    }

    #[test]
    fn redb_cursor_matches_model(
        entries in entries_strategy(),
        targets in prop::collection::vec(value_strategy(), 0..6),
    ) {
        check_walks(&RedbEngine::in_memory().expect("open"), &entries, &targets)?;
    }
}
