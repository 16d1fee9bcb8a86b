//! Text trace input
//!
//! Two formats are understood:
//! - `perf script` output for the `irq:*` tracepoints, e.g.
//!   `swapper     0 [003]  4018.384545: irq:irq_handler_entry: irq=27 name=eth0`
//! - JSON Lines with a `type` tag, e.g.
//!   `{"type":"irq_entry","key":27,"cpu":3,"ts":4018384545000}`
//!
//! The reader yields events one at a time and keeps the stream counters
//! (events seen, events lost, lost chunks) for the report footer.

use crate::event::{Event, EventKind, StreamCounters, NSEC_PER_SEC};
use clap::ValueEnum;
use regex::Regex;
use serde::Deserialize;
use std::io::{BufRead, Lines};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TraceReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid JSON record: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Input trace format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceFormat {
    /// Detect from the first non-blank line
    #[default]
    Auto,
    /// `perf script` text output
    PerfScript,
    /// One JSON object per line
    Jsonl,
}

/// Result of parsing one `perf script` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerfLine {
    Event(Event),
    /// A well-formed sample of a tracepoint we do not track
    Ignored,
    Malformed,
}

fn sample_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:.*?\s+)?\d+(?:/\d+)?\s+\[(?P<cpu>\d+)\]\s+(?P<secs>\d+)\.(?P<frac>\d+):\s+(?:\d+\s+)?(?P<event>[\w-]+:[\w-]+):\s*(?P<args>.*)$",
        )
        .expect("sample pattern is valid")
    })
}

fn field_regex(field: &str) -> &'static Regex {
    static IRQ: OnceLock<Regex> = OnceLock::new();
    static VEC: OnceLock<Regex> = OnceLock::new();
    let (cell, pattern) = match field {
        "irq" => (&IRQ, r"(?:^|\s)irq=(\d+)"),
        _ => (&VEC, r"(?:^|\s)vec=(\d+)"),
    };
    cell.get_or_init(|| Regex::new(pattern).expect("field pattern is valid"))
}

/// `secs.frac` to nanoseconds; fractions longer than nine digits are
/// truncated
fn parse_timestamp(secs: &str, frac: &str) -> Option<u64> {
    let secs: u64 = secs.parse().ok()?;
    let digits = frac.get(..frac.len().min(9))?;
    let scale = 10u64.pow(9 - digits.len() as u32);
    let frac: u64 = digits.parse().ok()?;
    secs.checked_mul(NSEC_PER_SEC)?.checked_add(frac * scale)
}

/// Parse a single `perf script` output line
pub fn parse_perf_line(line: &str) -> PerfLine {
    let Some(caps) = sample_regex().captures(line) else {
        return PerfLine::Malformed;
    };
    let Some(kind) = EventKind::from_tracepoint(&caps["event"]) else {
        return PerfLine::Ignored;
    };

    let cpu = caps["cpu"].parse().ok();
    let timestamp = parse_timestamp(&caps["secs"], &caps["frac"]);
    let key = field_regex(kind.key_field())
        .captures(&caps["args"])
        .and_then(|field| field[1].parse().ok());

    match (key, cpu, timestamp) {
        (Some(key), Some(cpu), Some(timestamp)) => {
            PerfLine::Event(Event::new(kind, key, cpu, timestamp))
        }
        _ => PerfLine::Malformed,
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonRecord {
    IrqEntry { key: u32, cpu: u32, ts: u64 },
    IrqExit { key: u32, cpu: u32, ts: u64 },
    SoftirqEntry { key: u32, cpu: u32, ts: u64 },
    SoftirqExit { key: u32, cpu: u32, ts: u64 },
    /// One lost chunk carrying `lost` dropped events
    Lost { lost: u64 },
    #[serde(other)]
    Other,
}

/// Streaming reader over a text trace
pub struct TraceReader<R> {
    lines: Lines<R>,
    format: TraceFormat,
    line_no: usize,
    counters: StreamCounters,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R, format: TraceFormat) -> Self {
        Self {
            lines: reader.lines(),
            format,
            line_no: 0,
            counters: StreamCounters::default(),
        }
    }

    /// Format in use; `Auto` until the first non-blank line was read
    pub fn format(&self) -> TraceFormat {
        self.format
    }

    pub fn counters(&self) -> StreamCounters {
        self.counters
    }

    fn detect(line: &str) -> TraceFormat {
        if line.trim_start().starts_with('{') {
            TraceFormat::Jsonl
        } else {
            TraceFormat::PerfScript
        }
    }

    fn perf_event(&mut self, line: &str) -> Option<Event> {
        match parse_perf_line(line) {
            PerfLine::Event(event) => {
                self.counters.nr_events += 1;
                Some(event)
            }
            PerfLine::Ignored => {
                self.counters.nr_events += 1;
                None
            }
            PerfLine::Malformed => {
                debug!(line = self.line_no, "skipping unparsable line");
                None
            }
        }
    }

    fn json_event(&mut self, line: &str) -> Result<Option<Event>, TraceReadError> {
        let record: JsonRecord =
            serde_json::from_str(line).map_err(|source| TraceReadError::Json {
                line: self.line_no,
                source,
            })?;

        let (kind, key, cpu, ts) = match record {
            JsonRecord::IrqEntry { key, cpu, ts } => (EventKind::IrqEntry, key, cpu, ts),
            JsonRecord::IrqExit { key, cpu, ts } => (EventKind::IrqExit, key, cpu, ts),
            JsonRecord::SoftirqEntry { key, cpu, ts } => (EventKind::SoftirqEntry, key, cpu, ts),
            JsonRecord::SoftirqExit { key, cpu, ts } => (EventKind::SoftirqExit, key, cpu, ts),
            JsonRecord::Lost { lost } => {
                self.counters.nr_lost_events += lost;
                self.counters.nr_lost_chunks += 1;
                return Ok(None);
            }
            JsonRecord::Other => {
                self.counters.nr_events += 1;
                return Ok(None);
            }
        };
        self.counters.nr_events += 1;
        Ok(Some(Event::new(kind, key, cpu, ts)))
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Event, TraceReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if self.format == TraceFormat::Auto {
                self.format = Self::detect(trimmed);
                debug!(format = ?self.format, "detected trace format");
            }

            let event = match self.format {
                TraceFormat::Jsonl => match self.json_event(trimmed) {
                    Ok(event) => event,
                    Err(err) => return Some(Err(err)),
                },
                _ => self.perf_event(&line),
            };
            if let Some(event) = event {
                return Some(Ok(event));
            }
        }
    }
}
