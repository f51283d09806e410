//! Property tests comparing every backend against a `BTreeMap` model.
//!
//! Random sequences of writes, commits and rollbacks are applied to a real
//! engine and to the model; afterwards every scan must match the model.

use std::collections::BTreeMap;
use std::ops::Bound;

use proptest::prelude::*;

use keystone_storage::backends::{MemoryEngine, RedbEngine};
use keystone_storage::{StorageEngine, StorageError, Store, Transaction};

type Model = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Clone)]
enum Op {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
    Truncate,
    Commit,
    Rollback,
}

/// Short keys over a tiny alphabet so operations collide often.
fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![Just(0u8), Just(1), Just(b'a'), Just(0xff)], 1..4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (key_strategy(), prop::collection::vec(any::<u8>(), 0..4))
            .prop_map(|(k, v)| Op::Put(k, v)),
        3 => key_strategy().prop_map(Op::Delete),
        1 => Just(Op::Truncate),
        1 => Just(Op::Commit),
        1 => Just(Op::Rollback),
    ]
}

fn scan_up<S: Store>(store: &S, pivot: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    store
        .ascend_greater_or_equal(pivot, |k, v| {
            out.push((k.to_vec(), v.to_vec()));
            Ok::<_, StorageError>(())
        })
        .expect("ascend");
    out
}

fn scan_down<S: Store>(store: &S, pivot: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    store
        .descend_less_or_equal(pivot, |k, v| {
            out.push((k.to_vec(), v.to_vec()));
            Ok::<_, StorageError>(())
        })
        .expect("descend");
    out
}

fn model_up(model: &Model, pivot: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    model
        .range::<[u8], _>((Bound::Included(pivot), Bound::Unbounded))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn model_down(model: &Model, pivot: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    // An empty pivot means "from the largest key".
    let upper = if pivot.is_empty() { Bound::Unbounded } else { Bound::Included(pivot) };
    model
        .range::<[u8], _>((Bound::Unbounded, upper))
        .rev()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn check_scans<S: Store>(
    store: &S,
    model: &Model,
    pivots: &[Vec<u8>],
) -> Result<(), TestCaseError> {
    let all: Vec<_> = model.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    prop_assert_eq!(scan_up(store, None), all.clone());

    let mut reversed = all;
    reversed.reverse();
    prop_assert_eq!(scan_down(store, None), reversed);

    for pivot in pivots {
        prop_assert_eq!(scan_up(store, Some(pivot.as_slice())), model_up(model, pivot));
        prop_assert_eq!(scan_down(store, Some(pivot.as_slice())), model_down(model, pivot));
    }
    Ok(())
}

fn run_against_model<E: StorageEngine>(
    engine: &E,
    ops: &[Op],
    pivots: &[Vec<u8>],
) -> Result<(), TestCaseError> {
    {
        let mut tx = engine.begin_write().expect("begin");
        tx.create_store("model").expect("create");
        tx.commit().expect("commit");
    }

    let mut committed = Model::new();
    let mut pending = Model::new();
    let mut tx = engine.begin_write().expect("begin");

    for op in ops {
        match op {
            Op::Put(k, v) => {
                tx.store("model").expect("store").put(k, v).expect("put");
                pending.insert(k.clone(), v.clone());
            }
            Op::Delete(k) => {
                let result = tx.store("model").expect("store").delete(k);
                match pending.remove(k) {
                    Some(_) => prop_assert!(result.is_ok()),
                    None => prop_assert!(matches!(result, Err(StorageError::KeyNotFound))),
                }
            }
            Op::Truncate => {
                tx.store("model").expect("store").truncate().expect("truncate");
                pending.clear();
            }
            Op::Commit => {
                tx.commit().expect("commit");
                committed = pending.clone();
                tx = engine.begin_write().expect("begin");
            }
            Op::Rollback => {
                tx.rollback().expect("rollback");
                pending = committed.clone();
                tx = engine.begin_write().expect("begin");
            }
        }
    }

    check_scans(&tx.store("model").expect("store"), &pending, pivots)?;
    tx.rollback().expect("rollback");

    let tx = engine.begin_read().expect("begin");
    check_scans(&tx.store("model").expect("store"), &committed, pivots)?;
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn memory_matches_model(
        ops in prop::collection::vec(op_strategy(), 0..60),
        pivots in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..3), 0..6),
    ) {
        let engine = MemoryEngine::new();
        run_against_model(&engine, &ops, &pivots)?;
    }

    #[test]
    fn redb_matches_model(
        ops in prop::collection::vec(op_strategy(), 0..60),
        pivots in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..3), 0..6),
    ) {
        let engine = RedbEngine::in_memory().expect("open");
        run_against_model(&engine, &ops, &pivots)?;
    }
}
