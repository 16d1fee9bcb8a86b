//! CSV output for summary and single-key reports

use crate::report::{KeyReport, Report, ScopeReport};
use std::fmt::Write as _;

const REPORT_HEADER: &str =
    "class,scope,key,count,total_ns,avg_ns,min_ns,min_at_ns,max_ns,max_at_ns,lost";
const SAMPLE_HEADER: &str = "class,key,entry_time_ns,runtime_ns";

/// `global` for the all-CPU scope, `cpuN` otherwise
fn scope_label(scope: &ScopeReport) -> String {
    match scope.cpu {
        Some(cpu) => format!("cpu{cpu}"),
        None => "global".to_string(),
    }
}

/// One row per printed aggregate, in display order
pub fn report_to_csv(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(REPORT_HEADER);
    out.push('\n');

    for class in &report.classes {
        for scope in std::iter::once(&class.global).chain(&class.cpus) {
            let label = scope_label(scope);
            for row in &scope.rows {
                let _ = writeln!(
                    out,
                    "{},{},{},{},{},{},{},{},{},{},{}",
                    class.class,
                    label,
                    row.key,
                    row.count,
                    row.total_runtime,
                    row.average,
                    row.min_run,
                    row.min_run_at,
                    row.max_run,
                    row.max_run_at,
                    row.lost_events
                );
            }
        }
    }

    out
}

/// Finished intervals of one key
pub fn samples_to_csv(report: &KeyReport) -> String {
    let mut out = String::new();
    out.push_str(SAMPLE_HEADER);
    out.push('\n');
    for sample in &report.samples {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            report.class, report.key, sample.entry_time, sample.runtime
        );
    }
    out
}
