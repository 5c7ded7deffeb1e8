//! Model-based tests: random operation sequences checked against a
//! `BTreeMap` after every step.

use std::collections::BTreeMap;

use paged_btree::{Attributes, BTree, Error, Key, TreeConfig};
use proptest::prelude::*;
use tempfile::tempdir;

#[derive(Clone, Debug)]
enum Op {
    Insert(Key, f64),
    Remove(Key),
    Update(Key, f64),
    Read(Key),
}

fn op_strategy(max_key: Key) -> impl Strategy<Value = Op> {
    let key = 0..max_key;
    let value = prop_oneof![4 => 0.5f64..100.0, 1 => -10.0f64..=0.0];
    prop_oneof![
        4 => (key.clone(), value.clone()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => key.clone().prop_map(Op::Remove),
        2 => (key.clone(), value).prop_map(|(k, v)| Op::Update(k, v)),
        1 => key.prop_map(Op::Read),
    ]
}

fn attrs(v: f64) -> Attributes {
    [1.0, v, 2.0, 3.0, 4.0]
}

fn run_sequence(degree: usize, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let dir = tempdir().unwrap();
    let config = TreeConfig::default()
        .with_degree(degree)
        .with_index_pool_pages(3)
        .with_data_pool_pages(2);
    let mut tree = BTree::create_in(dir.path(), config).unwrap();
    let mut model: BTreeMap<Key, Attributes> = BTreeMap::new();

    for op in ops {
        match op {
            Op::Insert(k, v) => {
                let result = tree.insert(k, attrs(v));
                if v <= 0.0 {
                    prop_assert!(
                        matches!(result, Err(Error::InvalidAttribute { index: 1, .. })),
                        "expected InvalidAttribute, got {:?}",
                        result
                    );
                } else if model.contains_key(&k) {
                    prop_assert!(
                        matches!(result, Err(Error::DuplicateKey(_))),
                        "expected DuplicateKey, got {:?}",
                        result
                    );
                } else {
                    prop_assert!(result.is_ok(), "insert {} failed: {:?}", k, result);
                    model.insert(k, attrs(v));
                }
            }
            Op::Remove(k) => {
                let result = tree.remove(k);
                if model.remove(&k).is_some() {
                    prop_assert!(result.is_ok(), "remove {} failed: {:?}", k, result);
                } else {
                    prop_assert!(
                        matches!(result, Err(Error::KeyNotFound(_))),
                        "expected KeyNotFound, got {:?}",
                        result
                    );
                }
            }
            Op::Update(k, v) => {
                let result = tree.update(k, attrs(v));
                if v <= 0.0 {
                    prop_assert!(
                        matches!(result, Err(Error::InvalidAttribute { .. })),
                        "expected InvalidAttribute, got {:?}",
                        result
                    );
                } else if let Some(stored) = model.get_mut(&k) {
                    prop_assert!(result.is_ok(), "update {} failed: {:?}", k, result);
                    *stored = attrs(v);
                } else {
                    prop_assert!(
                        matches!(result, Err(Error::KeyNotFound(_))),
                        "expected KeyNotFound, got {:?}",
                        result
                    );
                }
            }
            Op::Read(k) => match model.get(&k) {
                Some(expected) => prop_assert_eq!(tree.read(k).unwrap(), *expected),
                None => {
                    let result = tree.read(k);
                    prop_assert!(
                        matches!(result, Err(Error::KeyNotFound(_))),
                        "expected KeyNotFound, got {:?}",
                        result
                    );
                }
            },
        }

        let shape = tree.validate();
        prop_assert!(shape.is_ok(), "invariant broken: {:?}", shape);
        prop_assert_eq!(tree.len(), model.len());
        prop_assert_eq!(tree.pinned_pages(), 0);
    }

    let keys: Vec<Key> = model.keys().copied().collect();
    prop_assert_eq!(tree.keys().unwrap(), keys);
    for (k, expected) in &model {
        prop_assert_eq!(tree.read(*k).unwrap(), *expected);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_degree_one_matches_model(ops in prop::collection::vec(op_strategy(40), 1..200)) {
        run_sequence(1, ops)?;
    }

    #[test]
    fn test_degree_two_matches_model(ops in prop::collection::vec(op_strategy(60), 1..250)) {
        run_sequence(2, ops)?;
    }

    #[test]
    fn test_degree_three_matches_model(ops in prop::collection::vec(op_strategy(120), 1..300)) {
        run_sequence(3, ops)?;
    }
}
