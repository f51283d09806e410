//! Backend conformance suite.
//!
//! Every [`StorageEngine`] implementation must give the same observable
//! results for the same sequence of calls. This module drives a fresh engine
//! through that contract and panics on the first deviation, so a backend is
//! certified by a single integration test:
//!
//! ```ignore
//! use keystone_storage::backends::RedbEngine;
//! use keystone_storage::conformance::{run_store_suite, EngineHarness};
//! use keystone_storage::StorageResult;
//!
//! struct RedbHarness;
//!
//! impl EngineHarness for RedbHarness {
//!     type Engine = RedbEngine;
//!
//!     fn create_engine() -> StorageResult<Self::Engine> {
//!         RedbEngine::in_memory()
//!     }
//! }
//!
//! #[test]
//! fn test_redb_conformance() {
//!     run_store_suite::<RedbHarness>();
//! }
//! ```

use std::thread;
use std::time::Duration;

use crate::engine::{StorageEngine, StorageError, StorageResult, Store, Transaction};

/// Creates fresh engines for the conformance suites.
pub trait EngineHarness {
    /// The storage engine type being tested. It is shared across threads by
    /// the concurrency cases.
    type Engine: StorageEngine + Sync;

    /// Create a new, empty storage engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be opened.
    fn create_engine() -> StorageResult<Self::Engine>;

    /// Clean up after a test case (remove temp files, etc.).
    fn cleanup(_engine: Self::Engine) {}
}

/// Run every store conformance case against engines from `H`.
///
/// # Panics
///
/// Panics if the backend deviates from the storage contract.
pub fn run_store_suite<H: EngineHarness>() {
    test_round_trip::<H>();
    test_delete::<H>();
    test_empty_key_and_value::<H>();
    test_truncate::<H>();
    test_ascending_order::<H>();
    test_descending_order::<H>();
    test_pivot_seek::<H>();
    test_early_stop::<H>();
    test_read_inside_scan::<H>();
    test_read_only_enforcement::<H>();
    test_store_lifecycle::<H>();
    test_store_list::<H>();
    test_commit_and_rollback::<H>();
    test_snapshot_isolation::<H>();
    test_concurrent_readers::<H>();
    test_writers_serialize::<H>();
    test_close::<H>();
}

/// Open an engine holding one committed store `name` filled with `entries`.
fn seeded<H: EngineHarness>(name: &str, entries: &[(&[u8], &[u8])]) -> H::Engine {
    let engine = H::create_engine().expect("failed to create engine");
    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.create_store(name).expect("failed to create store");
        let mut store = tx.store(name).expect("failed to open store");
        for (key, value) in entries {
            store.put(key, value).expect("failed to put");
        }
        drop(store);
        tx.commit().expect("failed to commit");
    }
    engine
}

fn keys_of(pairs: &[(Vec<u8>, Vec<u8>)]) -> Vec<&[u8]> {
    pairs.iter().map(|(k, _)| k.as_slice()).collect()
}

fn collect_ascending<S: Store>(store: &S, pivot: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut seen = Vec::new();
    store
        .ascend_greater_or_equal(pivot, |k, v| {
            seen.push((k.to_vec(), v.to_vec()));
            Ok::<_, StorageError>(())
        })
        .expect("failed to ascend");
    seen
}

fn collect_descending<S: Store>(store: &S, pivot: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut seen = Vec::new();
    store
        .descend_less_or_equal(pivot, |k, v| {
            seen.push((k.to_vec(), v.to_vec()));
            Ok::<_, StorageError>(())
        })
        .expect("failed to descend");
    seen
}

/// Begin a write transaction, retrying while another writer holds the engine.
fn begin_write_retrying<E: StorageEngine>(engine: &E) -> E::Transaction<'_> {
    loop {
        match engine.begin_write() {
            Ok(tx) => return tx,
            Err(StorageError::WriterActive) => thread::yield_now(),
            Err(e) => panic!("failed to begin write: {e}"),
        }
    }
}

fn counter_of<S: Store>(store: &S) -> u64 {
    let bytes = store.get(b"n").expect("failed to get counter");
    u64::from_be_bytes(bytes.try_into().expect("counter is 8 bytes"))
}

fn test_round_trip<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"key1", b"value1")]);

    {
        let tx = engine.begin_read().expect("failed to begin read");
        let store = tx.store("kv").expect("failed to open store");
        assert_eq!(store.get(b"key1").expect("failed to get"), b"value1");
        assert!(store.get(b"missing").expect_err("missing key").is_key_not_found());
    }

    // Overwrite in place.
    {
        let tx = engine.begin_write().expect("failed to begin write");
        tx.store("kv").expect("failed to open store").put(b"key1", b"updated").expect("put");
        tx.commit().expect("failed to commit");
    }
    {
        let tx = engine.begin_read().expect("failed to begin read");
        let store = tx.store("kv").expect("failed to open store");
        assert_eq!(store.get(b"key1").expect("failed to get"), b"updated");
        assert_eq!(collect_ascending(&store, None).len(), 1);
    }

    H::cleanup(engine);
}

fn test_delete<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"a", b"1"), (b"b", b"2")]);

    {
        let tx = engine.begin_write().expect("failed to begin write");
        let mut store = tx.store("kv").expect("failed to open store");
        store.delete(b"a").expect("failed to delete");
        assert!(store.get(b"a").expect_err("deleted key").is_key_not_found());
        assert!(store.delete(b"a").expect_err("second delete").is_key_not_found());
        assert!(store.delete(b"zzz").expect_err("missing key").is_key_not_found());
        drop(store);
        tx.commit().expect("failed to commit");
    }

    {
        let tx = engine.begin_read().expect("failed to begin read");
        let store = tx.store("kv").expect("failed to open store");
        assert!(store.get(b"a").expect_err("deleted key").is_key_not_found());
        assert_eq!(store.get(b"b").expect("failed to get"), b"2");
    }

    H::cleanup(engine);
}

fn test_empty_key_and_value<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[]);

    let tx = engine.begin_write().expect("failed to begin write");
    let mut store = tx.store("kv").expect("failed to open store");
    assert!(matches!(store.put(b"", b"x"), Err(StorageError::EmptyKey)));

    store.put(b"k", b"").expect("failed to put empty value");
    assert!(store.get(b"k").expect("failed to get").is_empty());
    assert_eq!(collect_ascending(&store, None), vec![(b"k".to_vec(), Vec::new())]);
    drop(store);
    tx.rollback().expect("failed to rollback");

    H::cleanup(engine);
}

fn test_truncate<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"a", b"1"), (b"b", b"2"), (b"c", b"3")]);

    {
        let tx = engine.begin_write().expect("failed to begin write");
        let mut store = tx.store("kv").expect("failed to open store");
        store.truncate().expect("failed to truncate");
        assert!(collect_ascending(&store, None).is_empty());
        store.put(b"d", b"4").expect("store is still usable");
        drop(store);
        tx.commit().expect("failed to commit");
    }

    {
        let tx = engine.begin_read().expect("failed to begin read");
        let store = tx.store("kv").expect("truncate keeps the store");
        assert_eq!(keys_of(&collect_ascending(&store, None)), vec![&b"d"[..]]);
    }

    H::cleanup(engine);
}

fn test_ascending_order<H: EngineHarness>() {
    // Inserted out of order, including keys that are prefixes of each other
    // and bytes above 0x7f.
    let engine = seeded::<H>(
        "kv",
        &[(b"b", b""), (b"\xff", b""), (b"a\x00", b""), (b"ab", b""), (b"a", b""), (b"\x01", b"")],
    );

    let tx = engine.begin_read().expect("failed to begin read");
    let store = tx.store("kv").expect("failed to open store");
    let seen = collect_ascending(&store, None);
    let expected: [&[u8]; 6] = [b"\x01", b"a", b"a\x00", b"ab", b"b", b"\xff"];
    assert_eq!(keys_of(&seen), expected);
    drop(store);
    drop(tx);

    H::cleanup(engine);
}

fn test_descending_order<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"c", b"3"), (b"a", b"1"), (b"b", b"2"), (b"bb", b"22")]);

    let tx = engine.begin_read().expect("failed to begin read");
    let store = tx.store("kv").expect("failed to open store");
    let ascending = collect_ascending(&store, None);
    let mut descending = collect_descending(&store, None);
    descending.reverse();
    assert_eq!(ascending, descending);
    drop(store);
    drop(tx);

    H::cleanup(engine);
}

fn test_pivot_seek<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"b", b""), (b"d", b""), (b"f", b"")]);

    let tx = engine.begin_read().expect("failed to begin read");
    let store = tx.store("kv").expect("failed to open store");

    let cases: [(&[u8], &[&[u8]], &[&[u8]]); 5] = [
        // (pivot, ascending from pivot, descending from pivot)
        (b"a", &[b"b", b"d", b"f"], &[]),
        (b"b", &[b"b", b"d", b"f"], &[b"b"]),
        (b"c", &[b"d", b"f"], &[b"b"]),
        (b"f", &[b"f"], &[b"f", b"d", b"b"]),
        (b"g", &[], &[b"f", b"d", b"b"]),
    ];
    for (pivot, up, down) in cases {
        assert_eq!(keys_of(&collect_ascending(&store, Some(pivot))), up, "ascend from {pivot:?}");
        assert_eq!(
            keys_of(&collect_descending(&store, Some(pivot))),
            down,
            "descend from {pivot:?}"
        );
    }

    // An empty pivot means no pivot.
    assert_eq!(collect_ascending(&store, Some(&b""[..])), collect_ascending(&store, None));
    assert_eq!(collect_descending(&store, Some(&b""[..])), collect_descending(&store, None));
    drop(store);
    drop(tx);

    H::cleanup(engine);
}

/// Visitor error used to stop a scan.
#[derive(Debug, PartialEq)]
enum Stop {
    Here(Vec<u8>),
    Storage(String),
}

impl From<StorageError> for Stop {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

fn test_read_inside_scan<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(&b"a"[..], &b"1"[..]), (&b"b"[..], &b"2"[..])]);

    for writable in [false, true] {
        let tx = engine.begin(writable).expect("failed to begin");
        let store = tx.store("kv").expect("failed to open store");

        let mut seen = Vec::new();
        store
            .ascend_greater_or_equal(None, |key, _| {
                seen.push(store.get(key)?);
                Ok::<_, StorageError>(())
            })
            .expect("failed to read during ascend");
        assert_eq!(seen, vec![b"1".to_vec(), b"2".to_vec()]);

        seen.clear();
        store
            .descend_less_or_equal(None, |key, _| {
                seen.push(store.get(key)?);
                Ok::<_, StorageError>(())
            })
            .expect("failed to read during descend");
        assert_eq!(seen, vec![b"2".to_vec(), b"1".to_vec()]);

        drop(store);
        tx.rollback().expect("failed to rollback");
    }

    H::cleanup(engine);
}

fn test_early_stop<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"a", b""), (b"b", b""), (b"c", b""), (b"d", b"")]);

    let tx = engine.begin_read().expect("failed to begin read");
    let store = tx.store("kv").expect("failed to open store");

    let mut visited = 0;
    let result = store.ascend_greater_or_equal(None, |k, _| {
        visited += 1;
        if k == b"b" {
            return Err(Stop::Here(k.to_vec()));
        }
        Ok(())
    });
    assert_eq!(result, Err(Stop::Here(b"b".to_vec())));
    assert_eq!(visited, 2);

    let mut visited = 0;
    let result = store.descend_less_or_equal(Some(&b"c"[..]), |k, _| {
        visited += 1;
        Err(Stop::Here(k.to_vec()))
    });
    assert_eq!(result, Err(Stop::Here(b"c".to_vec())));
    assert_eq!(visited, 1);
    drop(store);
    drop(tx);

    H::cleanup(engine);
}

fn test_read_only_enforcement<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"a", b"1")]);

    {
        let mut tx = engine.begin_read().expect("failed to begin read");
        assert!(tx.is_read_only());

        {
            let mut store = tx.store("kv").expect("failed to open store");
            assert!(store.put(b"b", b"2").expect_err("put").is_read_only());
            assert!(store.delete(b"a").expect_err("delete").is_read_only());
            assert!(store.truncate().expect_err("truncate").is_read_only());
        }
        assert!(tx.create_store("other").expect_err("create").is_read_only());
        assert!(tx.drop_store("kv").expect_err("drop").is_read_only());
        tx.commit().expect("read-only commit just ends the transaction");
    }

    // None of the refused calls left a trace.
    {
        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.store_list("").expect("failed to list"), vec!["kv".to_string()]);
        let store = tx.store("kv").expect("failed to open store");
        assert_eq!(collect_ascending(&store, None), vec![(b"a".to_vec(), b"1".to_vec())]);
    }

    let tx = engine.begin_write().expect("failed to begin write");
    assert!(!tx.is_read_only());
    tx.rollback().expect("failed to rollback");

    H::cleanup(engine);
}

fn test_store_lifecycle<H: EngineHarness>() {
    let engine = H::create_engine().expect("failed to create engine");

    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        assert!(matches!(tx.store("users"), Err(StorageError::StoreNotFound(_))));

        tx.create_store("users").expect("failed to create store");
        assert!(matches!(tx.create_store("users"), Err(StorageError::StoreAlreadyExists(_))));
        assert!(matches!(tx.create_store(""), Err(StorageError::InvalidStoreName(_))));

        tx.store("users").expect("failed to open store").put(b"k", b"v").expect("put");
        tx.commit().expect("failed to commit");
    }

    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.drop_store("users").expect("failed to drop store");
        assert!(matches!(tx.store("users"), Err(StorageError::StoreNotFound(_))));
        assert!(matches!(tx.drop_store("users"), Err(StorageError::StoreNotFound(_))));

        // Recreating a dropped store gives an empty one.
        tx.create_store("users").expect("failed to recreate store");
        let store = tx.store("users").expect("failed to open store");
        assert!(collect_ascending(&store, None).is_empty());
        drop(store);
        tx.rollback().expect("failed to rollback");
    }

    // The rolled back drop never happened.
    {
        let tx = engine.begin_read().expect("failed to begin read");
        let store = tx.store("users").expect("failed to open store");
        assert_eq!(store.get(b"k").expect("failed to get"), b"v");
    }

    H::cleanup(engine);
}

fn test_store_list<H: EngineHarness>() {
    let engine = H::create_engine().expect("failed to create engine");

    let mut tx = engine.begin_write().expect("failed to begin write");
    assert!(tx.store_list("").expect("failed to list").is_empty());
    for name in ["idx_users_b", "users", "idx_users_a", "idx", "orders"] {
        tx.create_store(name).expect("failed to create store");
    }

    assert_eq!(
        tx.store_list("").expect("failed to list"),
        vec!["idx", "idx_users_a", "idx_users_b", "orders", "users"]
    );
    assert_eq!(tx.store_list("idx_").expect("failed to list"), vec!["idx_users_a", "idx_users_b"]);
    assert!(tx.store_list("nothing").expect("failed to list").is_empty());
    tx.commit().expect("failed to commit");

    H::cleanup(engine);
}

fn test_commit_and_rollback<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"a", b"1")]);

    // Rolled back writes vanish.
    {
        let mut tx = engine.begin_write().expect("failed to begin write");
        tx.store("kv").expect("failed to open store").put(b"b", b"2").expect("put");
        tx.create_store("scratch").expect("failed to create store");
        tx.rollback().expect("failed to rollback");
    }
    // So do the writes of a transaction dropped without ending it.
    {
        let tx = engine.begin_write().expect("failed to begin write");
        tx.store("kv").expect("failed to open store").put(b"c", b"3").expect("put");
    }

    {
        let tx = engine.begin_read().expect("failed to begin read");
        assert_eq!(tx.store_list("").expect("failed to list"), vec!["kv".to_string()]);
        let store = tx.store("kv").expect("failed to open store");
        assert_eq!(keys_of(&collect_ascending(&store, None)), vec![&b"a"[..]]);
    }

    // A writer sees its own uncommitted writes.
    {
        let tx = engine.begin_write().expect("failed to begin write");
        let mut store = tx.store("kv").expect("failed to open store");
        store.put(b"d", b"4").expect("put");
        assert_eq!(store.get(b"d").expect("failed to get"), b"4");
        drop(store);
        tx.commit().expect("failed to commit");
    }

    {
        let tx = engine.begin_read().expect("failed to begin read");
        let store = tx.store("kv").expect("failed to open store");
        assert_eq!(keys_of(&collect_ascending(&store, None)), vec![&b"a"[..], &b"d"[..]]);
    }

    H::cleanup(engine);
}

fn test_snapshot_isolation<H: EngineHarness>() {
    let engine = seeded::<H>("kv", &[(b"key1", b"initial")]);

    let reader = engine.begin_read().expect("failed to begin read");
    {
        let tx = engine.begin_write().expect("failed to begin write");
        tx.store("kv").expect("failed to open store").put(b"key1", b"updated").expect("put");
        tx.commit().expect("failed to commit");
    }

    // The older reader keeps its snapshot; a new one sees the commit.
    let old = reader.store("kv").expect("failed to open store");
    assert_eq!(old.get(b"key1").expect("failed to get"), b"initial");
    drop(old);
    reader.rollback().expect("failed to end reader");

    let fresh = engine.begin_read().expect("failed to begin read");
    let store = fresh.store("kv").expect("failed to open store");
    assert_eq!(store.get(b"key1").expect("failed to get"), b"updated");
    drop(store);
    drop(fresh);

    H::cleanup(engine);
}

fn test_concurrent_readers<H: EngineHarness>() {
    let engine = seeded::<H>("counter", &[(&b"n"[..], &b"0"[..])]);

    let before = engine.begin_read().expect("failed to begin read");
    let writer = engine.begin_write().expect("failed to begin write");
    writer.store("counter").expect("failed to open store").put(b"n", b"1").expect("put");

    // Readers on other threads run alongside the writer and see the last commit.
    thread::scope(|s| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let tx = engine.begin_read().expect("failed to begin read");
                    let value = tx.store("counter").expect("failed to open store").get(b"n");
                    value.expect("failed to get")
                })
            })
            .collect();
        for reader in readers {
            assert_eq!(reader.join().expect("reader panicked"), b"0");
        }
    });
    writer.commit().expect("failed to commit");

    let store = before.store("counter").expect("failed to open store");
    assert_eq!(store.get(b"n").expect("failed to get"), b"0");
    drop(store);
    drop(before);

    let after = engine.begin_read().expect("failed to begin read");
    let store = after.store("counter").expect("failed to open store");
    assert_eq!(store.get(b"n").expect("failed to get"), b"1");
    drop(store);
    drop(after);

    H::cleanup(engine);
}

fn test_writers_serialize<H: EngineHarness>() {
    const WORKERS: u64 = 4;
    const ROUNDS: u64 = 10;

    let zero = 0u64.to_be_bytes();
    let engine = seeded::<H>("counter", &[(&b"n"[..], &zero[..])]);

    // Lost updates would show up as a short count.
    thread::scope(|s| {
        for _ in 0..WORKERS {
            s.spawn(|| {
                for _ in 0..ROUNDS {
                    let tx = begin_write_retrying(&engine);
                    let mut store = tx.store("counter").expect("failed to open store");
                    let n = counter_of(&store);
                    store.put(b"n", &(n + 1).to_be_bytes()).expect("failed to put");
                    drop(store);
                    tx.commit().expect("failed to commit");
                }
            });
        }
    });
    {
        let tx = engine.begin_read().expect("failed to begin read");
        let n = counter_of(&tx.store("counter").expect("failed to open store"));
        assert_eq!(n, WORKERS * ROUNDS);
    }

    // A second writer either waits for the first to finish or is refused.
    let first = engine.begin_write().expect("failed to begin write");
    first.store("counter").expect("failed to open store").put(b"n", &zero).expect("put");
    thread::scope(|s| {
        let second = s.spawn(|| match engine.begin_write() {
            Ok(tx) => {
                let n = counter_of(&tx.store("counter").expect("failed to open store"));
                tx.rollback().expect("failed to rollback");
                Some(n)
            }
            Err(StorageError::WriterActive) => None,
            Err(e) => panic!("failed to begin write: {e}"),
        });
        thread::sleep(Duration::from_millis(20));
        first.commit().expect("failed to commit");

        if let Some(n) = second.join().expect("writer panicked") {
            assert_eq!(n, 0, "second writer started before the first committed");
        }
    });

    H::cleanup(engine);
}

fn test_close<H: EngineHarness>() {
    let engine = H::create_engine().expect("failed to create engine");

    let tx = engine.begin_read().expect("failed to begin read");
    assert!(matches!(engine.close(), Err(StorageError::TransactionsActive(1))));
    drop(tx);

    engine.close().expect("failed to close");
    engine.close().expect("second close is a no-op");
    assert!(matches!(engine.begin_read(), Err(StorageError::Closed)));
    assert!(matches!(engine.begin_write(), Err(StorageError::Closed)));

    H::cleanup(engine);
}
