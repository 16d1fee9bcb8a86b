//! Aggregation scopes: the global view of an event class, or one CPU's view

use crate::aggregate::Aggregate;
use crate::index::{KeyIndex, RankedIndex};
use crate::sort::SortChain;
use std::collections::TryReserveError;

/// Global scope or the scope of a single CPU
#[derive(Debug, Default, Clone)]
pub struct Scope {
    cpu: Option<u32>,
    index: KeyIndex,
    ranked: RankedIndex,
}

impl Scope {
    pub fn global() -> Self {
        Self::default()
    }

    pub fn for_cpu(cpu: u32) -> Self {
        Self {
            cpu: Some(cpu),
            ..Self::default()
        }
    }

    /// `None` for the global scope
    pub fn cpu(&self) -> Option<u32> {
        self.cpu
    }

    pub fn find_or_create(&mut self, key: u32) -> Result<&mut Aggregate, TryReserveError> {
        self.index.find_or_create(key)
    }

    /// Exact key lookup, valid before and after ranking
    pub fn find(&self, key: u32) -> Option<&Aggregate> {
        self.index.find(key).or_else(|| self.ranked.find(key))
    }

    /// Move every live aggregate into display order.
    ///
    /// Meant to run once after the stream ends; aggregates created after a
    /// ranking are merged into the existing order on the next call.
    pub fn rank(&mut self, chain: &SortChain) -> &RankedIndex {
        for agg in self.index.drain() {
            self.ranked.insert(agg, chain);
        }
        &self.ranked
    }

    pub fn len(&self) -> usize {
        self.index.len() + self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortRegistry;

    #[test]
    fn test_global_and_cpu_scopes() {
        assert_eq!(Scope::global().cpu(), None);
        assert_eq!(Scope::for_cpu(3).cpu(), Some(3));
    }

    #[test]
    fn test_rank_drains_live_index() {
        let registry = SortRegistry::builtin();
        let chain = SortChain::default_order(&registry).unwrap();
        let mut scope = Scope::global();
        for key in [9, 2, 5] {
            scope.find_or_create(key).unwrap();
        }

        let keys: Vec<u32> = scope.rank(&chain).iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![2, 5, 9]);
        assert_eq!(scope.len(), 3);
        assert!(scope.find(5).is_some());
    }

    #[test]
    fn test_rank_merges_late_aggregates() {
        let registry = SortRegistry::builtin();
        let chain = SortChain::default_order(&registry).unwrap();
        let mut scope = Scope::for_cpu(0);
        scope.find_or_create(4).unwrap();
        scope.rank(&chain);
        scope.find_or_create(1).unwrap();
        let keys: Vec<u32> = scope.rank(&chain).iter().map(|a| a.key).collect();
        assert_eq!(keys, vec![1, 4]);
    }
}
