//! irqlat - interrupt and softirq latency analysis for recorded traces
//!
//! Pairs entry/exit events per key and CPU into intervals, aggregates them
//! per key (globally and per CPU) and ranks the aggregates with a
//! configurable comparator chain. A single key can be drilled into for a
//! duration histogram and heatmap data.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod event;
pub mod histogram;
pub mod index;
pub mod interval;
pub mod report;
pub mod scope;
pub mod sort;
pub mod trace_reader;
pub mod tracker;
