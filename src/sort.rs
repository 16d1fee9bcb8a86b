//! Sort dimensions for `--sort key[,key2...]`
//!
//! A [`SortChain`] is an ordered list of comparators evaluated left to right;
//! the first one that does not return `Equal` decides. Reports list
//! aggregates from the greatest to the least under the chain, so `key`
//! (which inverts raw key order) yields ascending keys while `max` puts the
//! worst offender first.

use crate::aggregate::Aggregate;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Default chain used when no `--sort` is given
pub const DEFAULT_SORT_ORDER: &str = "key, average, maximum, minimum, count, total";

pub type CompareFn = fn(&Aggregate, &Aggregate) -> Ordering;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortKeyError {
    #[error("Unknown --sort key: `{name}'. Valid keys: {valid}")]
    UnknownKey { name: String, valid: String },

    #[error("Empty --sort specification")]
    Empty,
}

/// A named comparator
#[derive(Clone, Copy)]
pub struct SortDimension {
    pub name: &'static str,
    pub cmp: CompareFn,
}

impl SortDimension {
    pub const fn new(name: &'static str, cmp: CompareFn) -> Self {
        Self { name, cmp }
    }
}

impl fmt::Debug for SortDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SortDimension").field(&self.name).finish()
    }
}

/// Higher keys compare less
pub fn key_cmp(l: &Aggregate, r: &Aggregate) -> Ordering {
    r.key.cmp(&l.key)
}

/// Empty aggregates compare less than any populated one
pub fn avg_cmp(l: &Aggregate, r: &Aggregate) -> Ordering {
    match (l.average(), r.average()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(avgl), Some(avgr)) => avgl.cmp(&avgr),
    }
}

pub fn max_cmp(l: &Aggregate, r: &Aggregate) -> Ordering {
    l.max_run.cmp(&r.max_run)
}

/// Inverse of [`max_cmp`]: compares the stored *maximum*, not `min_run`
pub fn min_cmp(l: &Aggregate, r: &Aggregate) -> Ordering {
    r.max_run.cmp(&l.max_run)
}

pub fn count_cmp(l: &Aggregate, r: &Aggregate) -> Ordering {
    l.count.cmp(&r.count)
}

pub fn total_cmp(l: &Aggregate, r: &Aggregate) -> Ordering {
    l.total_runtime.cmp(&r.total_runtime)
}

/// Name → comparator table, built once and passed to whoever parses sort
/// specifications
#[derive(Debug, Clone)]
pub struct SortRegistry {
    dimensions: Vec<(&'static str, SortDimension)>,
}

impl SortRegistry {
    /// Built-in dimensions with their canonical names and the short aliases
    /// of `perf irq`
    pub fn builtin() -> Self {
        let key = SortDimension::new("key", key_cmp);
        let average = SortDimension::new("average", avg_cmp);
        let maximum = SortDimension::new("maximum", max_cmp);
        let minimum = SortDimension::new("minimum", min_cmp);
        let count = SortDimension::new("count", count_cmp);
        let total = SortDimension::new("total", total_cmp);

        Self {
            dimensions: vec![
                ("key", key),
                ("irq", key),
                ("average", average),
                ("avg", average),
                ("maximum", maximum),
                ("max", maximum),
                ("minimum", minimum),
                ("min", minimum),
                ("count", count),
                ("total", total),
                ("runtime", total),
            ],
        }
    }

    /// Add or replace a dimension
    pub fn register(&mut self, dimension: SortDimension) {
        self.dimensions.retain(|(name, _)| *name != dimension.name);
        self.dimensions.push((dimension.name, dimension));
    }

    pub fn get(&self, name: &str) -> Option<SortDimension> {
        self.dimensions
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, dim)| *dim)
    }

    /// Accepted names, comma separated
    pub fn names(&self) -> String {
        self.dimensions
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for SortRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Ordered list of comparators
#[derive(Debug, Clone)]
pub struct SortChain {
    dimensions: Vec<SortDimension>,
}

impl SortChain {
    pub fn new(dimensions: Vec<SortDimension>) -> Self {
        Self { dimensions }
    }

    /// Parse a list such as `"max, avg,count"`; tokens split on commas and
    /// spaces
    pub fn parse(spec: &str, registry: &SortRegistry) -> Result<Self, SortKeyError> {
        let tokens: Vec<&str> = spec
            .split([',', ' '])
            .filter(|tok| !tok.is_empty())
            .collect();
        Self::from_names(&tokens, registry)
    }

    pub fn from_names<S: AsRef<str>>(
        names: &[S],
        registry: &SortRegistry,
    ) -> Result<Self, SortKeyError> {
        if names.is_empty() {
            return Err(SortKeyError::Empty);
        }

        let dimensions = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                registry
                    .get(name)
                    .ok_or_else(|| SortKeyError::UnknownKey {
                        name: name.to_string(),
                        valid: registry.names(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dimensions })
    }

    /// The default display chain
    pub fn default_order(registry: &SortRegistry) -> Result<Self, SortKeyError> {
        Self::parse(DEFAULT_SORT_ORDER, registry)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.dimensions.iter().map(|d| d.name).collect()
    }

    pub fn compare(&self, l: &Aggregate, r: &Aggregate) -> Ordering {
        self.dimensions
            .iter()
            .map(|dim| (dim.cmp)(l, r))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}
