//! Aggregate indexes
//!
//! [`KeyIndex`] is the live lookup structure used while events stream in.
//! [`RankedIndex`] is built once at report time by draining a `KeyIndex` and
//! re-inserting every aggregate under the display [`SortChain`].
//!
//! Both keep their entries in a sorted vector: lookups and insert positions
//! are binary searches, and growth goes through `try_reserve` so running out
//! of memory surfaces as an error.

use crate::aggregate::Aggregate;
use crate::sort::SortChain;
use std::cmp::Ordering;
use std::collections::TryReserveError;

/// Aggregates ordered by key
#[derive(Debug, Default, Clone)]
pub struct KeyIndex {
    entries: Vec<Aggregate>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, key: u32) -> Option<&Aggregate> {
        self.entries
            .binary_search_by_key(&key, |agg| agg.key)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    /// Return the aggregate for `key`, inserting a zeroed one on a miss
    pub fn find_or_create(&mut self, key: u32) -> Result<&mut Aggregate, TryReserveError> {
        let pos = match self.entries.binary_search_by_key(&key, |agg| agg.key) {
            Ok(pos) => pos,
            Err(pos) => {
                self.entries.try_reserve(1)?;
                self.entries.insert(pos, Aggregate::new(key));
                pos
            }
        };
        Ok(&mut self.entries[pos])
    }

    /// In-order (ascending key) traversal
    pub fn iter(&self) -> impl Iterator<Item = &Aggregate> {
        self.entries.iter()
    }

    /// Remove every aggregate, leaving the index empty
    pub fn drain(&mut self) -> std::vec::Drain<'_, Aggregate> {
        self.entries.drain(..)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Aggregates in display order: greatest first under the chain.
///
/// An aggregate that compares equal to ones already present is placed after
/// them. Beyond that, the relative order of equal aggregates is not
/// guaranteed.
#[derive(Debug, Default, Clone)]
pub struct RankedIndex {
    entries: Vec<Aggregate>,
}

impl RankedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, agg: Aggregate, chain: &SortChain) {
        let pos = self
            .entries
            .partition_point(|held| chain.compare(&agg, held) != Ordering::Greater);
        self.entries.insert(pos, agg);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Aggregate> {
        self.entries.iter()
    }

    pub fn find(&self, key: u32) -> Option<&Aggregate> {
        self.entries.iter().find(|agg| agg.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::{SortDimension, SortRegistry};

    fn rank_all<I>(aggregates: I, chain: &SortChain) -> RankedIndex
    where
        I: IntoIterator<Item = Aggregate>,
    {
        let mut ranked = RankedIndex::new();
        for agg in aggregates {
            ranked.insert(agg, chain);
        }
        ranked
    }

    #[test]
    fn test_find_or_create_is_idempotent() {
        let mut index = KeyIndex::new();
        index.find_or_create(5).unwrap().count = 3;
        index.find_or_create(1).unwrap();
        let again = index.find_or_create(5).unwrap();
        assert_eq!(again.count, 3);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_key_index_traverses_in_key_order() {
        let mut index = KeyIndex::new();
        for key in [30, 4, 17, 4, 0, 255] {
            index.find_or_create(key).unwrap();
        }
        let keys: Vec<u32> = index.iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![0, 4, 17, 30, 255]);
    }

    #[test]
    fn test_find_miss_does_not_insert() {
        let mut index = KeyIndex::new();
        index.find_or_create(2).unwrap();
        assert!(index.find(3).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_drain_empties_index() {
        let mut index = KeyIndex::new();
        index.find_or_create(2).unwrap();
        index.find_or_create(9).unwrap();
        let drained: Vec<Aggregate> = index.drain().collect();
        assert_eq!(drained.len(), 2);
        assert!(index.is_empty());
    }

    #[test]
    fn test_ranked_default_chain_lists_ascending_keys() {
        let registry = SortRegistry::builtin();
        let chain = SortChain::default_order(&registry).unwrap();
        let aggs = [12, 3, 40, 7].map(Aggregate::new);
        let ranked = rank_all(aggs, &chain);
        let keys: Vec<u32> = ranked.iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![3, 7, 12, 40]);
    }

    #[test]
    fn test_ranked_max_lists_worst_first() {
        let registry = SortRegistry::builtin();
        let chain = SortChain::parse("max", &registry).unwrap();
        let aggs = [(1, 10), (2, 500), (3, 70)].map(|(key, max_run)| {
            let mut agg = Aggregate::new(key);
            agg.max_run = max_run;
            agg
        });
        let ranked = rank_all(aggs, &chain);
        let keys: Vec<u32> = ranked.iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![2, 3, 1]);
    }

    #[test]
    fn test_ranked_equal_entries_follow_earlier_ones() {
        let registry = SortRegistry::builtin();
        let chain = SortChain::parse("count", &registry).unwrap();
        let ranked = rank_all([4, 1, 9].map(Aggregate::new), &chain);
        let keys: Vec<u32> = ranked.iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![4, 1, 9]);
    }

    #[test]
    fn test_ranked_custom_ascending_chain() {
        fn ascending(l: &Aggregate, r: &Aggregate) -> Ordering {
            r.key.cmp(&l.key)
        }
        let chain = SortChain::new(vec![SortDimension::new("ascending", ascending)]);
        let ranked = rank_all([5, 2, 8, 1].map(Aggregate::new), &chain);
        assert_eq!(ranked.find(8).map(|a| a.key), Some(8));
        let keys: Vec<u32> = ranked.iter().map(|a| a.key).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}
