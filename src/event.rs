//! Trace events consumed by the interval tracker
//!
//! Each record is one tracepoint hit: an irq or softirq handler entering or
//! leaving on some CPU.

use serde::Serialize;
use std::fmt;

pub const NSEC_PER_USEC: u64 = 1_000;
pub const NSEC_PER_MSEC: u64 = 1_000_000;
pub const NSEC_PER_SEC: u64 = 1_000_000_000;

/// Event class: which family of handlers an event belongs to.
///
/// Classes are aggregated independently, each with its own global and
/// per-CPU scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventClass {
    /// Hardware interrupt handlers, keyed by IRQ number
    Irq,
    /// Software interrupts, keyed by vector number
    Softirq,
}

impl EventClass {
    /// Label used in report section headers
    pub const fn title(self) -> &'static str {
        match self {
            Self::Irq => "IRQ",
            Self::Softirq => "SOFTIRQ",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Irq => "irq",
            Self::Softirq => "softirq",
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an event opens or closes an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Enter,
    Exit,
}

/// The four tracepoints the tracker understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    IrqEntry,
    IrqExit,
    SoftirqEntry,
    SoftirqExit,
}

impl EventKind {
    pub const fn class(self) -> EventClass {
        match self {
            Self::IrqEntry | Self::IrqExit => EventClass::Irq,
            Self::SoftirqEntry | Self::SoftirqExit => EventClass::Softirq,
        }
    }

    pub const fn phase(self) -> Phase {
        match self {
            Self::IrqEntry | Self::SoftirqEntry => Phase::Enter,
            Self::IrqExit | Self::SoftirqExit => Phase::Exit,
        }
    }

    /// Map a perf tracepoint name (`irq:irq_handler_entry`, ...) to a kind
    pub fn from_tracepoint(name: &str) -> Option<Self> {
        match name {
            "irq:irq_handler_entry" => Some(Self::IrqEntry),
            "irq:irq_handler_exit" => Some(Self::IrqExit),
            "irq:softirq_entry" => Some(Self::SoftirqEntry),
            "irq:softirq_exit" => Some(Self::SoftirqExit),
            _ => None,
        }
    }

    /// Name of the tracepoint field that carries the classification key
    pub const fn key_field(self) -> &'static str {
        match self.class() {
            EventClass::Irq => "irq",
            EventClass::Softirq => "vec",
        }
    }
}

/// A single decoded event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// IRQ number or softirq vector
    pub key: u32,
    pub cpu: u32,
    /// Capture time in nanoseconds
    pub timestamp: u64,
}

impl Event {
    pub fn new(kind: EventKind, key: u32, cpu: u32, timestamp: u64) -> Self {
        Self {
            kind,
            key,
            cpu,
            timestamp,
        }
    }
}

/// Counters supplied by the event source, shown verbatim in the report footer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamCounters {
    /// Total records seen, including tracepoints the tracker ignores
    pub nr_events: u64,
    /// Events the transport dropped
    pub nr_lost_events: u64,
    /// Number of lost-event records
    pub nr_lost_chunks: u64,
}

/// Format a nanosecond timestamp as `secs.usecs`
pub fn format_usec(timestamp: u64) -> String {
    format!(
        "{}.{:06}",
        timestamp / NSEC_PER_SEC,
        (timestamp % NSEC_PER_SEC) / NSEC_PER_USEC
    )
}
