#![forbid(unsafe_code)]

use crate::record::FlatRecord;
use std::collections::HashMap;

/// Name → position lookup over the flat list.
///
/// Full rebuilds are O(n) and used whenever positions shift; the append and swap
/// patches are O(1) and keep the mapping exact for position-stable edits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameIndex {
    positions: HashMap<String, usize>,
}

impl NameIndex {
    pub fn from_records(records: &[FlatRecord]) -> Self {
        let mut index = Self::default();
        index.rebuild_all(records);
        index
    }

    /// Keeps the first position for a name that appears more than once.
    pub fn rebuild_all(&mut self, records: &[FlatRecord]) {
        self.positions.clear();
        self.positions.reserve(records.len());
        for (position, record) in records.iter().enumerate() {
            self.positions
                .entry(record.name.clone())
                .or_insert(position);
        }
    }

    pub fn patch_append(&mut self, name: &str, position: usize) {
        self.positions.insert(name.to_string(), position);
    }

    pub fn patch_swap(&mut self, name_a: &str, name_b: &str) {
        let (Some(&a), Some(&b)) = (self.positions.get(name_a), self.positions.get(name_b)) else {
            return;
        };
        self.positions.insert(name_a.to_string(), b);
        self.positions.insert(name_b.to_string(), a);
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True when every record's name maps to its current position and nothing else is mapped.
    pub fn is_consistent_with(&self, records: &[FlatRecord]) -> bool {
        self.positions.len() == records.len()
            && records
                .iter()
                .enumerate()
                .all(|(position, record)| self.position(&record.name) == Some(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(names: &[&str]) -> Vec<FlatRecord> {
        names.iter().map(|n| FlatRecord::named(*n)).collect()
    }

    #[test]
    fn rebuild_maps_every_name() {
        let list = records(&["a", "b", "c"]);
        let index = NameIndex::from_records(&list);
        assert_eq!(index.position("c"), Some(2));
        assert!(index.is_consistent_with(&list));
    }

    #[test]
    fn append_and_swap_patches_stay_exact() {
        let mut list = records(&["a", "b"]);
        let mut index = NameIndex::from_records(&list);

        list.push(FlatRecord::named("c"));
        index.patch_append("c", 2);
        assert!(index.is_consistent_with(&list));

        list.swap(0, 2);
        index.patch_swap("a", "c");
        assert_eq!(index.position("a"), Some(2));
        assert_eq!(index.position("c"), Some(0));
        assert!(index.is_consistent_with(&list));
    }

    #[test]
    fn swap_with_unknown_name_is_ignored() {
        let list = records(&["a"]);
        let mut index = NameIndex::from_records(&list);
        index.patch_swap("a", "zzz");
        assert_eq!(index.position("a"), Some(0));
        assert!(!index.contains("zzz"));
    }

    #[test]
    fn duplicates_resolve_to_first_and_are_reported_inconsistent() {
        let list = records(&["a", "a"]);
        let index = NameIndex::from_records(&list);
        assert_eq!(index.position("a"), Some(0));
        assert!(!index.is_consistent_with(&list));
    }
}
