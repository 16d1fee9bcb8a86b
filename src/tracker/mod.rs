//! Interval tracker: pairs enter/exit events into intervals
//!
//! Every event updates two aggregates for its key: the one in the class's
//! global scope and the one in the scope of the CPU it was captured on.
//! Matching is driven by the CPU scope, since an interval always opens and
//! closes on the same CPU.
//!
//! Anomalies do not stop processing:
//! - an enter while the CPU's last interval for the key is still open drops
//!   that interval (stale enter)
//! - an exit whose last interval is already closed is dropped (orphan exit)
//! - an exit earlier than its enter drops the interval (negative duration)
//!
//! Each of these increments the lost-event counter of both aggregates.

use crate::event::{format_usec, Event, EventClass, Phase, StreamCounters};
use crate::interval::{Interval, IntervalArena};
use crate::scope::Scope;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, TryReserveError};
use thiserror::Error;
use tracing::{debug, warn};

/// Exclusive upper bound on CPU indices
pub const MAX_CPUS: u32 = 4096;

/// Fatal tracking errors; the run is aborted and no report is produced
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("CPU index {cpu} out of range (must be below {max})")]
    CpuOutOfRange { cpu: u32, max: u32 },

    #[error("Out of memory while allocating {what}")]
    OutOfMemory {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
}

fn out_of_memory(what: &'static str) -> impl FnOnce(TryReserveError) -> TrackError {
    move |source| TrackError::OutOfMemory { what, source }
}

/// Recoverable anomalies seen while matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyCounts {
    pub stale_enters: u64,
    pub orphan_exits: u64,
    pub negative_durations: u64,
    /// Exits for a key that never entered on that CPU
    pub silent_exits: u64,
}

impl AnomalyCounts {
    /// Anomalies that were charged to the lost-event counters
    pub fn lost(&self) -> u64 {
        self.stale_enters + self.orphan_exits + self.negative_durations
    }
}

/// Scopes, intervals and anomaly counters of one event class
#[derive(Debug)]
pub struct ClassTracker {
    class: EventClass,
    global: Scope,
    cpus: BTreeMap<u32, Scope>,
    arena: IntervalArena,
    anomalies: AnomalyCounts,
}

impl ClassTracker {
    pub fn new(class: EventClass) -> Self {
        Self {
            class,
            global: Scope::global(),
            cpus: BTreeMap::new(),
            arena: IntervalArena::new(),
            anomalies: AnomalyCounts::default(),
        }
    }

    pub fn class(&self) -> EventClass {
        self.class
    }

    pub fn global(&self) -> &Scope {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut Scope {
        &mut self.global
    }

    pub fn cpu(&self, cpu: u32) -> Option<&Scope> {
        self.cpus.get(&cpu)
    }

    /// CPU scopes in ascending CPU order
    pub fn cpus(&self) -> impl Iterator<Item = (u32, &Scope)> {
        self.cpus.iter().map(|(&cpu, scope)| (cpu, scope))
    }

    pub fn cpus_mut(&mut self) -> impl Iterator<Item = (u32, &mut Scope)> {
        self.cpus.iter_mut().map(|(&cpu, scope)| (cpu, scope))
    }

    pub fn arena(&self) -> &IntervalArena {
        &self.arena
    }

    pub fn anomalies(&self) -> AnomalyCounts {
        self.anomalies
    }

    fn check_cpu(cpu: u32) -> Result<(), TrackError> {
        if cpu >= MAX_CPUS {
            return Err(TrackError::CpuOutOfRange { cpu, max: MAX_CPUS });
        }
        Ok(())
    }

    /// Handle an entry event for `key` on `cpu`
    pub fn enter(&mut self, key: u32, cpu: u32, timestamp: u64) -> Result<(), TrackError> {
        Self::check_cpu(cpu)?;
        let class = self.class;
        let cpu_scope = match self.cpus.entry(cpu) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(%class, cpu, "new cpu scope");
                entry.insert(Scope::for_cpu(cpu))
            }
        };

        let global = self
            .global
            .find_or_create(key)
            .map_err(out_of_memory("aggregate"))?;
        let local = cpu_scope
            .find_or_create(key)
            .map_err(out_of_memory("aggregate"))?;

        if let Some(tail) = local.tail() {
            if self.arena.get(tail).is_some_and(|interval| !interval.finish) {
                local.discard(tail);
                global.discard(tail);
                self.arena.remove(tail);
                self.anomalies.stale_enters += 1;
                warn!(
                    %class,
                    key,
                    cpu,
                    at = %format_usec(timestamp),
                    "entry without exit, dropping the unfinished interval"
                );
            }
        }

        let id = self
            .arena
            .insert(Interval::open(timestamp))
            .map_err(out_of_memory("interval"))?;
        global.push(id).map_err(out_of_memory("interval"))?;
        local.push(id).map_err(out_of_memory("interval"))?;
        Ok(())
    }

    /// Handle an exit event for `key` on `cpu`
    pub fn exit(&mut self, key: u32, cpu: u32, timestamp: u64) -> Result<(), TrackError> {
        Self::check_cpu(cpu)?;
        let class = self.class;
        let cpu_scope = match self.cpus.entry(cpu) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                debug!(%class, cpu, "new cpu scope");
                entry.insert(Scope::for_cpu(cpu))
            }
        };

        let global = self
            .global
            .find_or_create(key)
            .map_err(out_of_memory("aggregate"))?;
        let local = cpu_scope
            .find_or_create(key)
            .map_err(out_of_memory("aggregate"))?;

        let Some(tail) = local.tail() else {
            self.anomalies.silent_exits += 1;
            return Ok(());
        };
        let Some(interval) = self.arena.get_mut(tail) else {
            return Ok(());
        };

        if interval.finish {
            global.note_lost();
            local.note_lost();
            self.anomalies.orphan_exits += 1;
            warn!(
                %class,
                key,
                cpu,
                at = %format_usec(timestamp),
                "exit without entry, dropping it"
            );
            return Ok(());
        }

        match interval.close(timestamp) {
            Some(runtime) => {
                let entry_time = interval.entry_time;
                global.record(runtime, entry_time);
                local.record(runtime, entry_time);
            }
            None => {
                let entry_time = interval.entry_time;
                global.discard(tail);
                local.discard(tail);
                self.arena.remove(tail);
                self.anomalies.negative_durations += 1;
                warn!(
                    %class,
                    key,
                    cpu,
                    entry = %format_usec(entry_time),
                    exit = %format_usec(timestamp),
                    "runtime delta < 0, dropping the interval"
                );
            }
        }
        Ok(())
    }
}

/// Tracks irq and softirq intervals side by side
#[derive(Debug)]
pub struct Tracker {
    irq: ClassTracker,
    softirq: ClassTracker,
    counters: StreamCounters,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            irq: ClassTracker::new(EventClass::Irq),
            softirq: ClassTracker::new(EventClass::Softirq),
            counters: StreamCounters::default(),
        }
    }

    /// Feed one event
    pub fn process(&mut self, event: &Event) -> Result<(), TrackError> {
        let class = self.class_mut(event.kind.class());
        match event.kind.phase() {
            Phase::Enter => class.enter(event.key, event.cpu, event.timestamp),
            Phase::Exit => class.exit(event.key, event.cpu, event.timestamp),
        }
    }

    /// Feed a whole stream, stopping at the first fatal error
    pub fn process_all<'a, I>(&mut self, events: I) -> Result<(), TrackError>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        events.into_iter().try_for_each(|event| self.process(event))
    }

    pub fn class(&self, class: EventClass) -> &ClassTracker {
        match class {
            EventClass::Irq => &self.irq,
            EventClass::Softirq => &self.softirq,
        }
    }

    pub fn class_mut(&mut self, class: EventClass) -> &mut ClassTracker {
        match class {
            EventClass::Irq => &mut self.irq,
            EventClass::Softirq => &mut self.softirq,
        }
    }

    pub fn counters(&self) -> StreamCounters {
        self.counters
    }

    pub fn set_counters(&mut self, counters: StreamCounters) {
        self.counters = counters;
    }

    pub fn into_classes(self) -> (ClassTracker, ClassTracker, StreamCounters) {
        (self.irq, self.softirq, self.counters)
    }
}

#[cfg(test)]
mod tests;
