//! Property tests for tree derivation and the mutation layer.

use lt_core::{FlatRecord, MutationError, RecordStore, build_tree};
use proptest::prelude::*;
use std::collections::BTreeMap;

const NAMES: &[&str] = &["a", "b", "c", "d", "e", "f", "g", "h"];

fn name_strategy() -> impl Strategy<Value = String> {
    proptest::sample::select(NAMES).prop_map(str::to_string)
}

/// Arbitrary lists, including dangling parents, self references, cycles and duplicates.
fn corrupt_list_strategy() -> impl Strategy<Value = Vec<FlatRecord>> {
    let parent = prop_oneof![
        2 => Just(None),
        5 => name_strategy().prop_map(Some),
        1 => Just(Some("missing".to_string())),
    ];
    proptest::collection::vec((name_strategy(), parent, any::<bool>()), 0..12).prop_map(|rows| {
        rows.into_iter()
            .map(|(name, parent, done)| FlatRecord {
                name,
                parent,
                task_complete: done.then_some(true),
                ..FlatRecord::default()
            })
            .collect()
    })
}

/// Lists with unique names where every parent is an earlier record.
fn valid_list_strategy() -> impl Strategy<Value = Vec<FlatRecord>> {
    proptest::collection::vec(any::<prop::sample::Index>(), 0..NAMES.len()).prop_map(|picks| {
        let mut out: Vec<FlatRecord> = Vec::new();
        for (i, pick) in picks.into_iter().enumerate() {
            let mut record = FlatRecord::named(NAMES[i]);
            if i > 0 && pick.index(3) != 0 {
                record.parent = Some(out[pick.index(i)].name.clone());
            }
            out.push(record);
        }
        out
    })
}

fn tree_names(records: &[FlatRecord]) -> BTreeMap<String, usize> {
    let built = build_tree(records);
    let mut counts = BTreeMap::new();
    for (_, node) in built.root.walk() {
        *counts.entry(node.name().to_string()).or_insert(0) += 1;
    }
    counts
}

#[derive(Clone, Debug)]
enum Op {
    Add(String, Option<String>),
    Remove(String),
    Rename(String, String),
    Toggle(String),
    Swap(String, String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (name_strategy(), proptest::option::of(name_strategy()))
            .prop_map(|(n, p)| Op::Add(n, p)),
        1 => name_strategy().prop_map(Op::Remove),
        1 => (name_strategy(), name_strategy()).prop_map(|(a, b)| Op::Rename(a, b)),
        1 => name_strategy().prop_map(Op::Toggle),
        1 => (name_strategy(), name_strategy()).prop_map(|(a, b)| Op::Swap(a, b)),
    ]
}

fn apply(store: &mut RecordStore, op: &Op) -> Result<(), MutationError> {
    match op {
        Op::Add(name, parent) => {
            let mut record = FlatRecord::named(name.clone());
            record.parent = parent.clone();
            store.add(record).map(|_| ())
        }
        Op::Remove(name) => store.remove(name).map(|_| ()),
        Op::Rename(from, to) => {
            let mut record = store
                .get(from)
                .cloned()
                .ok_or_else(|| MutationError::NotFound(from.clone()))?;
            record.name = to.clone();
            store.update(from, record).map(|_| ())
        }
        Op::Toggle(name) => store.toggle_task_complete(name).map(|_| ()),
        Op::Swap(a, b) => store.swap_positions(a, b).map(|_| ()),
    }
}

proptest! {
    #[test]
    fn build_is_deterministic(list in corrupt_list_strategy()) {
        let first = build_tree(&list);
        let second = build_tree(&list.clone());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn no_record_is_lost_even_when_corrupt(list in corrupt_list_strategy()) {
        let mut expected = BTreeMap::new();
        for record in &list {
            *expected.entry(record.name.clone()).or_insert(0usize) += 1;
        }
        prop_assert_eq!(tree_names(&list), expected);
    }

    #[test]
    fn valid_lists_build_cleanly(list in valid_list_strategy()) {
        let built = build_tree(&list);
        prop_assert!(built.is_clean());
        prop_assert_eq!(built.root.descendant_count(), list.len());
    }

    #[test]
    fn swap_is_an_involution(list in valid_list_strategy(), a in 0usize..8, b in 0usize..8) {
        prop_assume!(!list.is_empty());
        let mut store = RecordStore::from_records(list.clone());
        let a = list[a % list.len()].name.clone();
        let b = list[b % list.len()].name.clone();
        store.swap_positions(&a, &b).unwrap();
        store.swap_positions(&a, &b).unwrap();
        prop_assert_eq!(store.records(), list.as_slice());
    }

    #[test]
    fn index_tracks_positions_under_any_sequence(ops in proptest::collection::vec(op_strategy(), 0..40)) {
        let mut store = RecordStore::new();
        for op in &ops {
            let before = store.clone();
            let result = apply(&mut store, op);
            if result.is_err() {
                prop_assert_eq!(&store, &before);
            }
            prop_assert!(store.index().is_consistent_with(store.records()));
        }
        let mut names: Vec<&str> = store.names();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), store.len());
    }

    #[test]
    fn revert_restores_any_successful_step(ops in proptest::collection::vec(op_strategy(), 1..30)) {
        let mut store = RecordStore::new();
        for op in &ops {
            let snapshot = store.snapshot();
            let applied = match op {
                Op::Add(name, parent) => {
                    let mut record = FlatRecord::named(name.clone());
                    record.parent = parent.clone();
                    store.add(record)
                }
                Op::Remove(name) => store.remove(name),
                Op::Rename(from, to) => match store.get(from).cloned() {
                    Some(mut record) => {
                        record.name = to.clone();
                        store.update(from, record)
                    }
                    None => continue,
                },
                Op::Toggle(name) => store.toggle_task_complete(name),
                Op::Swap(a, b) => store.swap_positions(a, b),
            };
            if let Ok(applied) = applied {
                let mut reverted = store.clone();
                reverted.revert(&applied).unwrap();
                prop_assert_eq!(reverted.snapshot(), snapshot);
                prop_assert!(reverted.index().is_consistent_with(reverted.records()));
            }
        }
    }
}
