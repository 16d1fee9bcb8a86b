//! Report building
//!
//! After the stream ends, every scope that is printed has its live index
//! drained into display order under the configured [`SortChain`]. The result
//! is a plain data model ([`Report`]) rendered as text, JSON or CSV.
//!
//! Single-key mode ([`KeyReport`]) skips ranking and extracts the raw
//! samples of one aggregate for a histogram and an external heatmap.

mod by_key;
mod text;

pub use by_key::{KeyLookup, KeyReport, Sample, DEFAULT_HEAT_DATA};

use crate::aggregate::Aggregate;
use crate::event::{EventClass, StreamCounters};
use crate::scope::Scope;
use crate::sort::SortChain;
use crate::tracker::{AnomalyCounts, ClassTracker, Tracker};
use serde::Serialize;

/// Which CPU scopes get their own table after the global one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuSelection {
    #[default]
    None,
    All,
    Only(u32),
}

impl CpuSelection {
    fn includes(self, cpu: u32) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Only(only) => only == cpu,
        }
    }
}

/// One printed aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    pub key: u32,
    pub count: u64,
    pub total_runtime: u64,
    pub average: u64,
    pub min_run: u64,
    pub min_run_at: u64,
    pub max_run: u64,
    pub max_run_at: u64,
    pub lost_events: u64,
}

impl AggregateRow {
    /// `None` for aggregates without intervals, which are never printed
    pub fn from_aggregate(agg: &Aggregate) -> Option<Self> {
        let average = agg.average()?;
        Some(Self {
            key: agg.key,
            count: agg.count,
            total_runtime: agg.total_runtime,
            average,
            min_run: agg.min_run,
            min_run_at: agg.min_run_at,
            max_run: agg.max_run,
            max_run_at: agg.max_run_at,
            lost_events: agg.lost_events,
        })
    }
}

/// A ranked scope with its totals line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeReport {
    /// `None` for the global scope
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    pub rows: Vec<AggregateRow>,
    pub total_count: u64,
    pub total_runtime: u64,
}

impl ScopeReport {
    /// Rank the scope and collect its non-empty aggregates in display order
    pub fn build(scope: &mut Scope, chain: &SortChain) -> Self {
        let cpu = scope.cpu();
        let rows: Vec<AggregateRow> = scope
            .rank(chain)
            .iter()
            .filter_map(AggregateRow::from_aggregate)
            .collect();

        let total_count = rows
            .iter()
            .fold(0u64, |acc, row| acc.saturating_add(row.count));
        let total_runtime = rows
            .iter()
            .fold(0u64, |acc, row| acc.saturating_add(row.total_runtime));

        Self {
            cpu,
            rows,
            total_count,
            total_runtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassReport {
    pub class: EventClass,
    pub global: ScopeReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cpus: Vec<ScopeReport>,
    pub anomalies: AnomalyCounts,
}

impl ClassReport {
    pub fn build(mut tracker: ClassTracker, chain: &SortChain, cpus: CpuSelection) -> Self {
        let global = ScopeReport::build(tracker.global_mut(), chain);
        let cpus = tracker
            .cpus_mut()
            .filter(|(cpu, _)| cpus.includes(*cpu))
            .map(|(_, scope)| ScopeReport::build(scope, chain))
            .collect();

        Self {
            class: tracker.class(),
            global,
            cpus,
            anomalies: tracker.anomalies(),
        }
    }
}

/// Full summary report over both event classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub sort: Vec<&'static str>,
    pub classes: Vec<ClassReport>,
    pub counters: StreamCounters,
}

impl Report {
    /// Consume the tracker and rank every selected scope
    pub fn build(tracker: Tracker, chain: &SortChain, cpus: CpuSelection) -> Self {
        let (irq, softirq, counters) = tracker.into_classes();
        let classes = [irq, softirq]
            .into_iter()
            .map(|class| ClassReport::build(class, chain, cpus))
            .collect();

        Self {
            sort: chain.names(),
            classes,
            counters,
        }
    }

    pub fn class(&self, class: EventClass) -> Option<&ClassReport> {
        self.classes.iter().find(|report| report.class == class)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
