//! CLI argument parsing for irqlat

use crate::trace_reader::TraceFormat;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable fixed-width tables (default)
    #[default]
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "irqlat")]
#[command(version)]
#[command(about = "Interrupt and softirq latency report for recorded traces", long_about = None)]
pub struct Cli {
    /// Trace to read (`perf script` output or JSON Lines); stdin when absent or `-`
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Input trace format
    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<TraceFormat>,

    /// Sort by key(s): key, average, maximum, minimum, count, total
    /// (aliases: irq, avg, max, min, runtime)
    #[arg(short = 's', long = "sort", value_name = "KEY[,KEY2...]")]
    pub sort: Option<String>,

    /// CPU to profile on
    #[arg(short = 'C', long = "cpu", value_name = "CPU")]
    pub cpu: Option<u32>,

    /// IRQ number to profile (single-key report)
    #[arg(short = 'H', long = "irq", value_name = "IRQ")]
    pub irq: Option<u32>,

    /// Softirq vector to profile (single-key report)
    #[arg(short = 'S', long = "softirq", value_name = "VEC")]
    pub softirq: Option<u32>,

    /// Print a table for every CPU after the global one
    #[arg(long = "per-cpu")]
    pub per_cpu: bool,

    /// Output format
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Sample file written in single-key mode (default: heat.data)
    #[arg(long = "heat-data", value_name = "FILE")]
    pub heat_data: Option<PathBuf>,

    /// TOML config file; command line flags take precedence
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List the accepted sort keys and exit
    #[arg(long = "list-sort-keys")]
    pub list_sort_keys: bool,

    /// Enable debug diagnostics on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
