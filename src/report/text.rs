//! Fixed-width text rendering of summary reports

use super::{ClassReport, Report, ScopeReport};
use crate::event::{format_usec, EventClass, NSEC_PER_MSEC};
use std::fmt::{self, Write as _};

const RULE: &str = " ---------------------------------------------------------------------------------------------------------------------";
const TOTAL_RULE: &str = " ---------------------------------------------------";

fn ms(nanos: u64) -> f64 {
    nanos as f64 / NSEC_PER_MSEC as f64
}

fn key_label(class: EventClass) -> &'static str {
    match class {
        EventClass::Irq => "IRQ",
        EventClass::Softirq => "VEC",
    }
}

fn write_scope(out: &mut String, class: EventClass, scope: &ScopeReport) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "  {:<6}|   count  | Total run ms  |  Avg run ms  | Minimum run ms  |   Min run at  | Maximum run ms  |   Max run at",
        key_label(class)
    )?;
    writeln!(out, "{RULE}")?;

    for row in &scope.rows {
        writeln!(
            out,
            "{:4}    |{:9} |{:11.3} ms | {:9.3} ms |min {:9.3} ms |{:>13}s|max {:9.3} ms |{:>13}s",
            row.key,
            row.count,
            ms(row.total_runtime),
            ms(row.average),
            ms(row.min_run),
            format_usec(row.min_run_at),
            ms(row.max_run),
            format_usec(row.max_run_at),
        )?;
    }

    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        " TOTAL: |{:9} |{:11.3} ms |",
        scope.total_count,
        ms(scope.total_runtime)
    )?;
    writeln!(out, "{TOTAL_RULE}")?;
    writeln!(out)
}

fn write_class(out: &mut String, report: &ClassReport) -> fmt::Result {
    write!(out, "{}:", report.class.title())?;
    write_scope(out, report.class, &report.global)?;
    for scope in &report.cpus {
        if let Some(cpu) = scope.cpu {
            write!(out, "CPU {cpu}:")?;
            write_scope(out, report.class, scope)?;
        }
    }
    Ok(())
}

fn write_footer(out: &mut String, report: &Report) -> fmt::Result {
    let counters = report.counters;
    if counters.nr_lost_events > 0 && counters.nr_events > 0 {
        writeln!(
            out,
            "  INFO: {:.3}% lost events ({} out of {}, in {} chunks)",
            counters.nr_lost_events as f64 / counters.nr_events as f64 * 100.0,
            counters.nr_lost_events,
            counters.nr_events,
            counters.nr_lost_chunks
        )?;
    }
    for class in &report.classes {
        let anomalies = class.anomalies;
        if anomalies.lost() > 0 {
            writeln!(
                out,
                "  INFO: {}: {} entries without exit, {} exits without entry, {} negative durations",
                class.class,
                anomalies.stale_enters,
                anomalies.orphan_exits,
                anomalies.negative_durations
            )?;
        }
    }
    Ok(())
}

impl Report {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        for class in &self.classes {
            write_class(out, class)?;
        }
        write_footer(out, self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_text())
    }
}
