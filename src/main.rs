use anyhow::{Context, Result};
use clap::Parser;
use irqlat::cli::{Cli, OutputFormat};
use irqlat::config::{FileConfig, ReportConfig};
use irqlat::csv_output;
use irqlat::event::{format_usec, EventClass};
use irqlat::report::{KeyLookup, KeyReport, Report};
use irqlat::sort::{SortChain, SortRegistry};
use irqlat::trace_reader::TraceReader;
use irqlat::tracker::Tracker;
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize tracing: warnings by default, everything with --debug,
/// RUST_LOG overrides both
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_input(input: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match input {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open trace {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Feed the whole trace into a tracker; any fatal error aborts the run
fn read_trace(args: &Cli, config: &ReportConfig) -> Result<Tracker> {
    let input = open_input(args.input.as_deref())?;
    let mut reader = TraceReader::new(input, config.input_format);
    let mut tracker = Tracker::new();

    for event in reader.by_ref() {
        let event = event.context("Failed to read trace")?;
        tracker.process(&event)?;
    }
    tracker.set_counters(reader.counters());
    debug!(format = ?reader.format(), counters = ?tracker.counters(), "trace consumed");

    Ok(tracker)
}

fn report_key(
    tracker: &Tracker,
    config: &ReportConfig,
    class: EventClass,
    key: u32,
) -> Result<()> {
    let report = match KeyReport::build(tracker.class(class), key, config.cpu) {
        KeyLookup::Found(report) => report,
        miss => {
            if let Some(message) = miss.message() {
                println!("{message}");
            }
            return Ok(());
        }
    };

    // no heat file for a key without completed intervals
    let command = match report.empty_message() {
        Some(_) => None,
        None => {
            report
                .write_heat_data(&config.heat_data)
                .with_context(|| format!("Failed to write {}", config.heat_data.display()))?;
            Some(report.heatmap_command(&config.heat_data))
        }
    };

    match config.format {
        OutputFormat::Text => {
            if let Some(message) = report.empty_message() {
                println!("{message}");
            }
            if let Some(histogram) = report.histogram() {
                print!("{histogram}");
            }
            if let (Some((begin, end)), Some(command)) = (report.time_span(), &command) {
                println!("{}-{}:{}", format_usec(begin), format_usec(end), command);
            }
        }
        OutputFormat::Json => {
            let value = json!({
                "report": report,
                "histogram": report.histogram(),
                "heatmap_command": command,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => print!("{}", csv_output::samples_to_csv(&report)),
    }

    Ok(())
}

fn report_summary(tracker: Tracker, config: &ReportConfig, chain: &SortChain) -> Result<()> {
    let report = Report::build(tracker, chain, config.cpu_selection());
    match config.format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Csv => print!("{}", csv_output::report_to_csv(&report)),
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let registry = SortRegistry::builtin();
    if args.list_sort_keys {
        println!("{}", registry.names());
        return Ok(());
    }

    let file = args.config.as_deref().map(FileConfig::load).transpose()?;
    let config = ReportConfig::resolve(&args, file);

    // sort keys are checked before any input is consumed
    let chain = config.sort_chain(&registry)?;

    let tracker = read_trace(&args, &config)?;

    match config.key_selection() {
        Some((class, key)) => report_key(&tracker, &config, class, key),
        None => report_summary(tracker, &config, &chain),
    }
}
