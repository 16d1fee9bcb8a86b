//! Per-key latency statistics

use crate::interval::IntervalId;
use std::collections::TryReserveError;

/// Accumulated statistics for one key within one scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub key: u32,
    /// Intervals in arrival order
    intervals: Vec<IntervalId>,
    /// Shortest runtime; zero means no sample yet
    pub min_run: u64,
    /// Entry time of the shortest interval
    pub min_run_at: u64,
    pub max_run: u64,
    pub max_run_at: u64,
    /// Intervals currently held, including an in-flight one
    pub count: u64,
    pub total_runtime: u64,
    pub lost_events: u64,
}

impl Aggregate {
    pub fn new(key: u32) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }

    pub fn intervals(&self) -> &[IntervalId] {
        &self.intervals
    }

    /// Most recently appended interval
    pub fn tail(&self) -> Option<IntervalId> {
        self.intervals.last().copied()
    }

    /// Append a newly opened interval
    pub fn push(&mut self, id: IntervalId) -> Result<(), TryReserveError> {
        self.intervals.try_reserve(1)?;
        self.intervals.push(id);
        self.count += 1;
        Ok(())
    }

    /// Drop an interval that will never complete and count it as lost.
    ///
    /// The interval is usually at or near the tail, so the search runs
    /// backwards.
    pub fn discard(&mut self, id: IntervalId) -> bool {
        match self.intervals.iter().rposition(|&held| held == id) {
            Some(pos) => {
                self.intervals.remove(pos);
                self.count -= 1;
                self.lost_events += 1;
                true
            }
            None => false,
        }
    }

    pub fn note_lost(&mut self) {
        self.lost_events += 1;
    }

    /// Fold a completed interval into min/max/total; the total saturates at
    /// `u64::MAX`
    pub fn record(&mut self, runtime: u64, entry_time: u64) {
        if runtime > self.max_run {
            self.max_run = runtime;
            self.max_run_at = entry_time;
        }
        if runtime < self.min_run || self.min_run == 0 {
            self.min_run = runtime;
            self.min_run_at = entry_time;
        }
        self.total_runtime = self.total_runtime.saturating_add(runtime);
    }

    /// Integer average runtime, `None` without intervals
    pub fn average(&self) -> Option<u64> {
        self.total_runtime.checked_div(self.count)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
