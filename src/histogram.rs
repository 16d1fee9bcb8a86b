//! Linear latency histogram for single-key reports
//!
//! Ten equal-width buckets spanning `[min, max]` of the samples, rendered as
//! a fixed-width text table with a 50 character bar per bucket.

use crate::event::{NSEC_PER_MSEC, NSEC_PER_USEC};
use serde::Serialize;
use std::fmt::{self, Write as _};

/// Number of histogram buckets
pub const NUM_BUCKETS: usize = 10;

/// Width of a full bar
pub const BAR_WIDTH: u64 = 50;

/// Display unit for bucket boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Msecs,
    Usecs,
}

impl Unit {
    pub const fn nanos(self) -> u64 {
        match self {
            Self::Msecs => NSEC_PER_MSEC,
            Self::Usecs => NSEC_PER_USEC,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub min: u64,
    pub max: u64,
    /// Bucket width, `(max - min) / 10`
    pub delta: u64,
    pub unit: Unit,
    /// Lower boundaries of the buckets plus `max` as the last upper bound
    pub boundaries: [u64; NUM_BUCKETS + 1],
    pub counts: [u64; NUM_BUCKETS],
    pub samples: u64,
}

impl Histogram {
    /// Bucket the samples; `None` for an empty slice
    pub fn from_samples(samples: &[u64]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;

        let delta = (max - min) / NUM_BUCKETS as u64;
        let unit = if delta > NSEC_PER_MSEC {
            Unit::Msecs
        } else {
            Unit::Usecs
        };

        let mut boundaries = [0u64; NUM_BUCKETS + 1];
        for (i, boundary) in boundaries.iter_mut().take(NUM_BUCKETS).enumerate() {
            *boundary = min + delta * i as u64;
        }
        boundaries[NUM_BUCKETS] = max;

        let mut counts = [0u64; NUM_BUCKETS];
        for &sample in samples {
            counts[bucket_index(sample, min, delta)] += 1;
        }

        Some(Self {
            min,
            max,
            delta,
            unit,
            boundaries,
            counts,
            samples: samples.len() as u64,
        })
    }

    /// Bar length for a bucket count; non-empty buckets always get at least
    /// one character
    pub fn bar_len(&self, count: u64) -> u64 {
        let len = count * BAR_WIDTH / self.samples;
        if len == 0 && count > 0 {
            1
        } else {
            len
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        match self.unit {
            Unit::Msecs => writeln!(out, "       msecs           : count\t\t distribution")?,
            Unit::Usecs => writeln!(out, "      usecs            : count\t\t distribution")?,
        }

        let scale = self.unit.nanos() as f64;
        for (i, &count) in self.counts.iter().enumerate() {
            let bar = self.bar_len(count) as usize;
            writeln!(
                out,
                "{:9.3}-{:<9.3}    : {}\t\t|{:<width$}|",
                self.boundaries[i] as f64 / scale,
                self.boundaries[i + 1] as f64 / scale,
                count,
                "*".repeat(bar),
                width = BAR_WIDTH as usize
            )?;
        }
        writeln!(
            out,
            "analyzed {} [max:{}  min:{}]",
            self.samples, self.max, self.min
        )
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn bucket_index(sample: u64, min: u64, delta: u64) -> usize {
    let index = if delta == 0 {
        0
    } else {
        (sample - min) / delta
    };
    index.min(NUM_BUCKETS as u64 - 1) as usize
}
