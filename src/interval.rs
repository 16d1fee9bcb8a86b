//! Interval storage
//!
//! Every interval is referenced from two sequences at once (the global-scope
//! aggregate and the CPU-scope aggregate of its key), so intervals live in an
//! arena owned by the event class and the sequences hold `IntervalId`s.

use std::collections::TryReserveError;

/// Index of an interval inside an [`IntervalArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalId(usize);

/// One enter→exit pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interval {
    pub entry_time: u64,
    pub exit_time: u64,
    /// `exit_time - entry_time`, valid once `finish` is set
    pub runtime: u64,
    pub finish: bool,
}

impl Interval {
    /// A freshly opened interval
    pub fn open(entry_time: u64) -> Self {
        Self {
            entry_time,
            ..Self::default()
        }
    }

    /// Close the interval at `exit_time`.
    ///
    /// Returns the runtime, or `None` when the exit precedes the entry. The
    /// interval is left untouched in that case.
    pub fn close(&mut self, exit_time: u64) -> Option<u64> {
        let runtime = exit_time.checked_sub(self.entry_time)?;
        self.exit_time = exit_time;
        self.runtime = runtime;
        self.finish = true;
        Some(runtime)
    }
}

/// Slot storage for intervals.
///
/// Removed intervals leave an empty slot behind; ids are never reused, so a
/// stale id can only ever resolve to `None`.
#[derive(Debug, Default)]
pub struct IntervalArena {
    slots: Vec<Option<Interval>>,
    live: usize,
}

impl IntervalArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an interval, failing instead of aborting when memory runs out
    pub fn insert(&mut self, interval: Interval) -> Result<IntervalId, TryReserveError> {
        self.slots.try_reserve(1)?;
        let id = IntervalId(self.slots.len());
        self.slots.push(Some(interval));
        self.live += 1;
        Ok(id)
    }

    pub fn get(&self, id: IntervalId) -> Option<&Interval> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: IntervalId) -> Option<&mut Interval> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, id: IntervalId) -> Option<Interval> {
        let removed = self.slots.get_mut(id.0).and_then(Option::take);
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    /// Number of intervals still stored
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
