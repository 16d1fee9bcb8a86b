// Interval matching tests
//
// Event sequences are written as (kind, key, cpu, timestamp) tuples in the
// order a trace would deliver them.

use super::*;
use crate::aggregate::Aggregate;
use crate::event::EventKind::{self, IrqEntry, IrqExit, SoftirqEntry, SoftirqExit};

fn run(events: &[(EventKind, u32, u32, u64)]) -> Tracker {
    let mut tracker = Tracker::new();
    for &(kind, key, cpu, ts) in events {
        tracker.process(&Event::new(kind, key, cpu, ts)).unwrap();
    }
    tracker
}

fn irq_global(tracker: &Tracker, key: u32) -> Aggregate {
    tracker
        .class(EventClass::Irq)
        .global()
        .find(key)
        .cloned()
        .expect("aggregate exists")
}

fn irq_cpu(tracker: &Tracker, cpu: u32, key: u32) -> Aggregate {
    tracker
        .class(EventClass::Irq)
        .cpu(cpu)
        .and_then(|scope| scope.find(key))
        .cloned()
        .expect("aggregate exists")
}

#[test]
fn test_well_formed_pairs_accumulate() {
    let tracker = run(&[
        (IrqEntry, 5, 0, 100),
        (IrqExit, 5, 0, 150),
        (IrqEntry, 5, 1, 300),
        (IrqExit, 5, 1, 320),
        (IrqEntry, 5, 0, 1_000),
        (IrqExit, 5, 0, 1_090),
    ]);

    let global = irq_global(&tracker, 5);
    assert_eq!(global.count, 3);
    assert_eq!(global.total_runtime, 50 + 20 + 90);
    assert_eq!(global.min_run, 20);
    assert_eq!(global.min_run_at, 300);
    assert_eq!(global.max_run, 90);
    assert_eq!(global.max_run_at, 1_000);
    assert_eq!(global.lost_events, 0);

    let cpu0 = irq_cpu(&tracker, 0, 5);
    assert_eq!(cpu0.count, 2);
    assert_eq!(cpu0.total_runtime, 140);
    let cpu1 = irq_cpu(&tracker, 1, 5);
    assert_eq!(cpu1.count, 1);
    assert_eq!(cpu1.total_runtime, 20);
}

#[test]
fn test_negative_duration_discards_interval() {
    let tracker = run(&[
        (IrqEntry, 5, 0, 100),
        (IrqExit, 5, 0, 150),
        (IrqEntry, 5, 0, 200),
        (IrqExit, 5, 0, 180),
    ]);

    for agg in [irq_global(&tracker, 5), irq_cpu(&tracker, 0, 5)] {
        assert_eq!(agg.count, 1);
        assert_eq!(agg.total_runtime, 50);
        assert_eq!(agg.lost_events, 1);
        assert_eq!(agg.min_run, 50);
        assert_eq!(agg.max_run, 50);
        assert_eq!(agg.intervals().len(), 1);
    }
    let class = tracker.class(EventClass::Irq);
    assert_eq!(class.anomalies().negative_durations, 1);
    assert_eq!(class.arena().len(), 1);
}

#[test]
fn test_exit_without_enter_is_noop() {
    let tracker = run(&[(IrqExit, 3, 2, 500)]);
    let global = irq_global(&tracker, 3);
    assert_eq!(global, Aggregate::new(3));
    assert_eq!(irq_cpu(&tracker, 2, 3), Aggregate::new(3));
    let class = tracker.class(EventClass::Irq);
    assert_eq!(class.anomalies().silent_exits, 1);
    assert_eq!(class.anomalies().lost(), 0);
    // the cpu scope is still created lazily
    assert!(class.cpu(2).is_some());
}

#[test]
fn test_stale_enter_drops_superseded_interval_only() {
    let tracker = run(&[
        (IrqEntry, 9, 0, 100),
        (IrqEntry, 9, 0, 200),
        (IrqEntry, 9, 0, 300),
        (IrqExit, 9, 0, 340),
    ]);

    for agg in [irq_global(&tracker, 9), irq_cpu(&tracker, 0, 9)] {
        assert_eq!(agg.lost_events, 2);
        assert_eq!(agg.count, 1);
        assert_eq!(agg.total_runtime, 40);
        assert_eq!(agg.min_run_at, 300);
    }
    let class = tracker.class(EventClass::Irq);
    assert_eq!(class.anomalies().stale_enters, 2);
    assert_eq!(class.arena().len(), 1);
}

#[test]
fn test_orphan_exit_counts_lost_and_keeps_interval() {
    let tracker = run(&[
        (IrqEntry, 4, 1, 100),
        (IrqExit, 4, 1, 130),
        (IrqExit, 4, 1, 160),
    ]);

    for agg in [irq_global(&tracker, 4), irq_cpu(&tracker, 1, 4)] {
        assert_eq!(agg.count, 1);
        assert_eq!(agg.total_runtime, 30);
        assert_eq!(agg.lost_events, 1);
    }
    let class = tracker.class(EventClass::Irq);
    let id = irq_cpu(&tracker, 1, 4).intervals()[0];
    assert_eq!(class.arena().get(id).unwrap().exit_time, 130);
    assert_eq!(class.anomalies().orphan_exits, 1);
}

#[test]
fn test_stale_enter_removes_from_global_amid_other_cpus() {
    // cpu 1 appends to the global sequence after cpu 0's open interval, so
    // the stale interval is not the global tail
    let tracker = run(&[
        (IrqEntry, 7, 0, 100),
        (IrqEntry, 7, 1, 110),
        (IrqExit, 7, 1, 150),
        (IrqEntry, 7, 0, 200),
        (IrqExit, 7, 0, 260),
    ]);

    let global = irq_global(&tracker, 7);
    assert_eq!(global.count, 2);
    assert_eq!(global.lost_events, 1);
    assert_eq!(global.total_runtime, 40 + 60);
    let class = tracker.class(EventClass::Irq);
    let entries: Vec<u64> = global
        .intervals()
        .iter()
        .map(|&id| class.arena().get(id).unwrap().entry_time)
        .collect();
    assert_eq!(entries, vec![110, 200]);

    assert_eq!(irq_cpu(&tracker, 1, 7).lost_events, 0);
    assert_eq!(irq_cpu(&tracker, 0, 7).lost_events, 1);
}

#[test]
fn test_interval_shared_by_both_sequences() {
    let tracker = run(&[(IrqEntry, 1, 3, 10), (IrqExit, 1, 3, 25)]);
    let global = irq_global(&tracker, 1);
    let local = irq_cpu(&tracker, 3, 1);
    assert_eq!(global.intervals(), local.intervals());
    assert_eq!(tracker.class(EventClass::Irq).arena().len(), 1);
}

#[test]
fn test_classes_are_independent() {
    let tracker = run(&[
        (IrqEntry, 1, 0, 10),
        (SoftirqEntry, 1, 0, 12),
        (SoftirqExit, 1, 0, 20),
        (IrqExit, 1, 0, 40),
    ]);
    assert_eq!(irq_global(&tracker, 1).total_runtime, 30);
    let softirq = tracker
        .class(EventClass::Softirq)
        .global()
        .find(1)
        .unwrap();
    assert_eq!(softirq.total_runtime, 8);
}

#[test]
fn test_in_flight_interval_is_counted() {
    let tracker = run(&[
        (IrqEntry, 2, 0, 10),
        (IrqExit, 2, 0, 30),
        (IrqEntry, 2, 0, 50),
    ]);
    let agg = irq_global(&tracker, 2);
    assert_eq!(agg.count, 2);
    assert_eq!(agg.total_runtime, 20);
    assert_eq!(agg.lost_events, 0);
}

#[test]
fn test_cpu_out_of_range_is_fatal() {
    let mut tracker = Tracker::new();
    let err = tracker
        .process(&Event::new(IrqEntry, 1, MAX_CPUS, 10))
        .unwrap_err();
    assert!(matches!(err, TrackError::CpuOutOfRange { cpu, .. } if cpu == MAX_CPUS));
    assert!(err.to_string().contains("4096"));
    assert!(tracker.class(EventClass::Irq).global().is_empty());

    tracker
        .process(&Event::new(IrqEntry, 1, MAX_CPUS - 1, 10))
        .unwrap();
    assert!(tracker.class(EventClass::Irq).cpu(MAX_CPUS - 1).is_some());
}

#[test]
fn test_process_all_stops_at_fatal_error() {
    let events = [
        Event::new(IrqEntry, 1, 0, 10),
        Event::new(IrqExit, 1, 99_999, 20),
        Event::new(IrqExit, 1, 0, 30),
    ];
    let mut tracker = Tracker::new();
    assert!(tracker.process_all(&events).is_err());
    let agg = irq_global(&tracker, 1);
    assert_eq!(agg.total_runtime, 0);
}

#[test]
fn test_cpu_scopes_iterate_in_order() {
    let tracker = run(&[
        (IrqEntry, 1, 7, 10),
        (IrqEntry, 1, 2, 10),
        (IrqEntry, 1, 4, 10),
    ]);
    let cpus: Vec<u32> = tracker
        .class(EventClass::Irq)
        .cpus()
        .map(|(c, _)| c)
        .collect();
    assert_eq!(cpus, vec![2, 4, 7]);
}

#[test]
fn test_zero_length_then_longer_interval_min() {
    let tracker = run(&[
        (IrqEntry, 1, 0, 10),
        (IrqExit, 1, 0, 10),
        (IrqEntry, 1, 0, 20),
        (IrqExit, 1, 0, 35),
    ]);
    let agg = irq_global(&tracker, 1);
    assert_eq!(agg.count, 2);
    assert_eq!(agg.min_run, 15);
    assert_eq!(agg.max_run, 15);
}

#[test]
fn test_total_runtime_saturates_instead_of_overflowing() {
    let half = 1u64 << 63;
    // the two intervals overlap on different CPUs, so the global aggregate
    // sums 2^63 + 2^63
    let tracker = run(&[
        (IrqEntry, 1, 0, 0),
        (IrqEntry, 1, 1, 0),
        (IrqExit, 1, 0, half),
        (IrqExit, 1, 1, half),
    ]);
    let agg = irq_global(&tracker, 1);
    assert_eq!(agg.count, 2);
    assert_eq!(agg.max_run, half);
    assert_eq!(agg.total_runtime, u64::MAX);
    assert!(agg.total_runtime >= agg.max_run);
    assert_eq!(irq_cpu(&tracker, 0, 1).total_runtime, half);
}
