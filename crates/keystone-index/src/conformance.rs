//! Index conformance suite.
//!
//! Drives an [`Index`] built over a fresh store of any backend through the
//! ordering and duplicate-handling contract. It reuses the storage crate's
//! [`EngineHarness`], so a backend certifies both layers with one harness:
//!
//! ```ignore
//! use keystone_index::conformance::run_index_suite;
//! use keystone_storage::conformance::run_store_suite;
//!
//! #[test]
//! fn test_memory_conformance() {
//!     run_store_suite::<MemoryHarness>();
//!     run_index_suite::<MemoryHarness>();
//! }
//! ```

use keystone_core::RowId;
use keystone_storage::conformance::EngineHarness;
use keystone_storage::{StorageEngine, Store, Transaction};

use crate::{Index, IndexEntry};

const STORE: &str = "idx";

/// Run every index conformance case against engines from `H`.
///
/// Each case gets a fresh engine and a writable transaction holding one
/// store, and rolls the transaction back when done.
///
/// # Panics
///
/// Panics if the index deviates from its contract on this backend.
pub fn run_index_suite<H: EngineHarness>() {
    macro_rules! run_case {
        ($case:ident) => {{
            let engine = H::create_engine().expect("failed to create engine");
            {
                let mut tx = engine.begin_write().expect("failed to begin write");
                tx.create_store(STORE).expect("failed to create store");
                let mut store = tx.store(STORE).expect("failed to open store");
                $case(&mut Index::new(&mut store));
                drop(store);
                tx.rollback().expect("failed to rollback");
            }
            H::cleanup(engine);
        }};
    }

    run_case!(test_single_entry);
    run_case!(test_duplicate_ordering);
    run_case!(test_first_last);
    run_case!(test_next_prev_boundaries);
    run_case!(test_seek_between_values);
    run_case!(test_seek_and_step);
    run_case!(test_seek_beyond_last);
    run_case!(test_binary_values);
    run_case!(test_delete);
    run_case!(test_row_ids);
    run_case!(test_truncate);
}

fn entry(value: &[u8], id: u64) -> Option<IndexEntry> {
    Some(IndexEntry::new(value, RowId::new(id)))
}

fn set_all<S: Store>(index: &mut Index<S>, pairs: &[(&[u8], u64)]) {
    for (value, id) in pairs {
        index.set(value, RowId::new(*id)).expect("failed to set");
    }
}

/// Walk the whole index forwards.
fn collect<S: Store>(index: &Index<S>) -> Vec<IndexEntry> {
    let mut cursor = index.cursor();
    let mut entries = Vec::new();
    let mut next = cursor.first().expect("failed to move");
    while let Some(entry) = next {
        entries.push(entry);
        next = cursor.next().expect("failed to move");
    }
    entries
}

fn test_single_entry<S: Store>(index: &mut Index<S>) {
    index.set(b"hello", RowId::new(1)).expect("failed to set");

    let mut cursor = index.cursor();
    assert_eq!(cursor.first().expect("first"), entry(b"hello", 1));
    assert_eq!(cursor.last().expect("last"), entry(b"hello", 1));
    assert_eq!(cursor.next().expect("next"), None);
    assert_eq!(cursor.prev().expect("prev"), None);
    assert_eq!(cursor.seek(b"hello").expect("seek"), entry(b"hello", 1));
    assert_eq!(cursor.seek(b"").expect("seek"), entry(b"hello", 1));
}

fn test_duplicate_ordering<S: Store>(index: &mut Index<S>) {
    // Set out of order, with one pairing repeated.
    set_all(index, &[(b"john", 3), (b"jack", 2), (b"jack", 1), (b"john", 3)]);

    let expected = [
        IndexEntry::new(b"jack".to_vec(), RowId::new(1)),
        IndexEntry::new(b"jack".to_vec(), RowId::new(2)),
        IndexEntry::new(b"john".to_vec(), RowId::new(3)),
    ];
    assert_eq!(collect(index), expected);
}

fn test_first_last<S: Store>(index: &mut Index<S>) {
    set_all(index, &[(b"jack", 0), (b"jack", 1), (b"jack", 2)]);
    set_all(index, &[(b"john", 3), (b"john", 4), (b"john", 5)]);

    let mut cursor = index.cursor();
    assert_eq!(cursor.first().expect("first"), entry(b"jack", 0));
    assert_eq!(cursor.last().expect("last"), entry(b"john", 5));
    assert_eq!(cursor.seek(b"jack").expect("seek"), entry(b"jack", 0));
    assert_eq!(cursor.seek(b"john").expect("seek"), entry(b"john", 3));
}

fn test_next_prev_boundaries<S: Store>(index: &mut Index<S>) {
    index.set(b"john", RowId::new(20)).expect("failed to set");
    for i in 0..10 {
        index.set(b"jack", RowId::new(i)).expect("failed to set");
    }

    let mut cursor = index.cursor();
    assert_eq!(cursor.first().expect("first"), entry(b"jack", 0));
    for i in 1..10 {
        assert_eq!(cursor.next().expect("next"), entry(b"jack", i));
    }
    assert_eq!(cursor.next().expect("next"), entry(b"john", 20));

    // Past the end: nothing, and the cursor stays on the last entry.
    assert_eq!(cursor.next().expect("next"), None);
    for i in (0..10).rev() {
        assert_eq!(cursor.prev().expect("prev"), entry(b"jack", i));
    }

    // Past the start: nothing, and the cursor stays on the first entry.
    assert_eq!(cursor.prev().expect("prev"), None);
    assert_eq!(cursor.next().expect("next"), entry(b"jack", 1));
}

fn test_seek_between_values<S: Store>(index: &mut Index<S>) {
    set_all(index, &[(b"jack", 0), (b"jack", 1), (b"jack", 2)]);
    set_all(index, &[(b"john", 3), (b"john", 4), (b"john", 5)]);

    let mut cursor = index.cursor();
    // Below every value.
    assert_eq!(cursor.seek(b"a").expect("seek"), entry(b"jack", 0));
    // A prefix of a stored value.
    assert_eq!(cursor.seek(b"jac").expect("seek"), entry(b"jack", 0));
    // Between two stored values.
    assert_eq!(cursor.seek(b"jackk").expect("seek"), entry(b"john", 3));
    assert_eq!(cursor.prev().expect("prev"), entry(b"jack", 2));
    assert_eq!(cursor.seek(b"john").expect("seek"), entry(b"john", 3));
}

fn test_seek_and_step<S: Store>(index: &mut Index<S>) {
    set_all(index, &[(b"jack", 10), (b"john", 20)]);

    let mut cursor = index.cursor();
    assert_eq!(cursor.seek(b"jack").expect("seek"), entry(b"jack", 10));
    assert_eq!(cursor.next().expect("next"), entry(b"john", 20));
    assert_eq!(cursor.prev().expect("prev"), entry(b"jack", 10));
    assert_eq!(cursor.prev().expect("prev"), None);
    assert_eq!(cursor.next().expect("next"), entry(b"john", 20));

    assert_eq!(cursor.seek(b"john").expect("seek"), entry(b"john", 20));
    assert_eq!(cursor.next().expect("next"), None);
    assert_eq!(cursor.prev().expect("prev"), entry(b"jack", 10));

    assert_eq!(cursor.seek(b"john").expect("seek"), entry(b"john", 20));
    assert_eq!(cursor.prev().expect("prev"), entry(b"jack", 10));
}

fn test_seek_beyond_last<S: Store>(index: &mut Index<S>) {
    set_all(index, &[(b"jack", 10), (b"john", 20)]);

    let mut cursor = index.cursor();
    assert_eq!(cursor.seek(b"johnnnn").expect("seek"), None);
    // Parked past the end: next stays empty, prev returns the last entry.
    assert_eq!(cursor.next().expect("next"), None);
    assert_eq!(cursor.prev().expect("prev"), entry(b"john", 20));
    assert_eq!(cursor.prev().expect("prev"), entry(b"jack", 10));
}

fn test_binary_values<S: Store>(index: &mut Index<S>) {
    // Values holding 0x00 and 0xff bytes, and values that prefix each other.
    let values: [&[u8]; 6] = [b"", b"\x00", b"\x00\x00", b"\x00\x01", b"a", b"a\xff"];
    for (id, value) in values.iter().enumerate().rev() {
        index.set(value, RowId::new(id as u64)).expect("failed to set");
    }

    let walked: Vec<Vec<u8>> = collect(index).into_iter().map(|e| e.value).collect();
    assert_eq!(walked, values.iter().map(|v| v.to_vec()).collect::<Vec<_>>());

    let mut cursor = index.cursor();
    assert_eq!(cursor.seek(b"\x00\x00").expect("seek"), entry(b"\x00\x00", 2));
    assert_eq!(cursor.seek(b"\x00\x00\x00").expect("seek"), entry(b"\x00\x01", 3));
    assert_eq!(cursor.prev().expect("prev"), entry(b"\x00\x00", 2));
    assert_eq!(cursor.seek(b"a\x00").expect("seek"), entry(b"a\xff", 5));
}

fn test_delete<S: Store>(index: &mut Index<S>) {
    set_all(index, &[(b"jack", 1), (b"jack", 2), (b"john", 3)]);

    index.delete(b"jack", RowId::new(1)).expect("failed to delete");
    assert!(index.delete(b"jack", RowId::new(1)).expect_err("deleted twice").is_key_not_found());
    assert!(index.delete(b"john", RowId::new(1)).expect_err("wrong row").is_key_not_found());

    let mut cursor = index.cursor();
    assert_eq!(cursor.first().expect("first"), entry(b"jack", 2));
    assert_eq!(cursor.next().expect("next"), entry(b"john", 3));
    assert_eq!(cursor.next().expect("next"), None);
}

fn test_row_ids<S: Store>(index: &mut Index<S>) {
    set_all(index, &[(b"jack", 7), (b"jack", 2), (b"jackk", 1), (b"jac", 5), (b"john", 3)]);

    assert_eq!(index.row_ids(b"jack").expect("row ids"), vec![RowId::new(2), RowId::new(7)]);
    assert_eq!(index.row_ids(b"jac").expect("row ids"), vec![RowId::new(5)]);
    assert_eq!(index.row_ids(b"john").expect("row ids"), vec![RowId::new(3)]);
    assert!(index.row_ids(b"jo").expect("row ids").is_empty());
    assert!(index.row_ids(b"zzz").expect("row ids").is_empty());
}

fn test_truncate<S: Store>(index: &mut Index<S>) {
    set_all(index, &[(b"jack", 1), (b"john", 2)]);
    index.truncate().expect("failed to truncate");

    assert!(collect(index).is_empty());
    assert_eq!(index.cursor().seek(b"").expect("seek"), None);

    index.set(b"jim", RowId::new(9)).expect("index is still usable");
    assert_eq!(collect(index), vec![IndexEntry::new(b"jim".to_vec(), RowId::new(9))]);
}
