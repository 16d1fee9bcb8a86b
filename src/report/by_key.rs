//! Single-key report: raw samples, histogram and heatmap data

use crate::event::{EventClass, NSEC_PER_MSEC};
use crate::histogram::Histogram;
use crate::tracker::ClassTracker;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// Sample file written when no other path is configured
pub const DEFAULT_HEAT_DATA: &str = "heat.data";

/// One completed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub entry_time: u64,
    pub runtime: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyReport {
    pub class: EventClass,
    pub key: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Completed intervals in arrival order
    pub samples: Vec<Sample>,
}

/// Outcome of a single-key lookup; the misses are not errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLookup {
    Found(KeyReport),
    CpuNotFound { key: u32, cpu: u32 },
    KeyNotFound { key: u32 },
}

impl KeyLookup {
    /// Message printed for a miss
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Found(_) => None,
            Self::CpuNotFound { key, cpu } => {
                Some(format!("Key {key} on cpu {cpu} doesn't exist"))
            }
            Self::KeyNotFound { key } => Some(format!("Could not find key {key}")),
        }
    }
}

impl KeyReport {
    /// Collect the completed intervals of `key`, from one CPU scope when
    /// `cpu` is given, from the global scope otherwise
    pub fn build(tracker: &ClassTracker, key: u32, cpu: Option<u32>) -> KeyLookup {
        let scope = match cpu {
            Some(cpu) => match tracker.cpu(cpu) {
                Some(scope) => scope,
                None => return KeyLookup::CpuNotFound { key, cpu },
            },
            None => tracker.global(),
        };
        let Some(agg) = scope.find(key) else {
            return KeyLookup::KeyNotFound { key };
        };

        let samples = agg
            .intervals()
            .iter()
            .filter_map(|&id| tracker.arena().get(id))
            .filter(|interval| interval.finish)
            .map(|interval| Sample {
                entry_time: interval.entry_time,
                runtime: interval.runtime,
            })
            .collect();

        KeyLookup::Found(Self {
            class: tracker.class(),
            key,
            cpu,
            samples,
        })
    }

    /// Message printed when the key exists but no interval has completed
    pub fn empty_message(&self) -> Option<String> {
        if !self.samples.is_empty() {
            return None;
        }
        Some(match self.cpu {
            Some(cpu) => format!("No completed intervals for key {} on cpu {cpu}", self.key),
            None => format!("No completed intervals for key {}", self.key),
        })
    }

    pub fn durations(&self) -> Vec<u64> {
        self.samples.iter().map(|s| s.runtime).collect()
    }

    pub fn histogram(&self) -> Option<Histogram> {
        Histogram::from_samples(&self.durations())
    }

    /// Entry time of the first and last sample
    pub fn time_span(&self) -> Option<(u64, u64)> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some((first.entry_time, last.entry_time))
    }

    pub fn run_min(&self) -> u64 {
        self.samples.iter().map(|s| s.runtime).min().unwrap_or(0)
    }

    pub fn run_max(&self) -> u64 {
        self.samples.iter().map(|s| s.runtime).max().unwrap_or(0)
    }

    /// `entry_time_ms runtime_ns` per line
    pub fn heat_data(&self) -> String {
        let mut out = String::new();
        for sample in &self.samples {
            let _ = writeln!(
                out,
                "{} {}",
                sample.entry_time / NSEC_PER_MSEC,
                sample.runtime
            );
        }
        out
    }

    pub fn write_heat_data(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.heat_data())
    }

    /// Suggested heatmap invocation; never executed here
    pub fn heatmap_command(&self, data: &Path) -> String {
        format!(
            "tools/trace2heatmap.pl --title \"{} {}\" --unitstime=ms --unitslabel=ns --maxlat={} --minlat={} --grid {} > heat.svg",
            self.class,
            self.key,
            self.run_max(),
            self.run_min(),
            data.display()
        )
    }
}
