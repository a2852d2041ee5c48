//! Integration tests for the Engine → DailyLog path.
//!
//! The clock is a `FixedClock`, so file names, row times and midnight
//! rotation are fully deterministic.

use std::fs;
use std::path::Path;

use healthmon::Engine;
use healthmon::app::events::EngineEvent;
use healthmon::config::EngineConfig;
use healthmon::persistence::CSV_HEADER;
use healthmon::sensors::Facility;

use crate::mock_link::{FixedClock, MockLink, NoDelay, RecordingSink, day, full_frame};

fn config(dir: &Path) -> EngineConfig {
    EngineConfig {
        data_dir: dir.to_path_buf(),
        ..EngineConfig::default()
    }
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Run one facility-1 and one facility-2 cycle.
fn poll_pair(engine: &mut Engine<MockLink, NoDelay, FixedClock>, link: &MockLink, sink: &mut RecordingSink, base: f64) {
    link.reply(&full_frame(Facility::One, base));
    link.reply(&full_frame(Facility::Two, base));
    engine.run_cycle(sink);
    engine.run_cycle(sink);
}

#[test]
fn first_row_follows_the_header() {
    let dir = tempfile::tempdir().unwrap();
    let link = MockLink::new();
    let clock = FixedClock::at(day(21), 14, 2, 3, 456);
    let mut engine = Engine::new(link.clone(), NoDelay, clock, &config(dir.path()));
    let mut sink = RecordingSink::new();

    poll_pair(&mut engine, &link, &mut sink, 0.0);

    let rows = lines(&dir.path().join("09-21-2023.csv"));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], CSV_HEADER);
    assert_eq!(
        rows[1],
        "14:02:03.45,70.00,71.00,0.00,0.00,0.00,12.00,70.00,71.00,0.00,0.00,0.00,12.00"
    );
    assert_eq!(
        sink.count(|e| matches!(e, EngineEvent::RowPersisted { .. })),
        1
    );
}

#[test]
fn no_row_until_both_facilities_reported() {
    let dir = tempfile::tempdir().unwrap();
    let link = MockLink::new();
    let clock = FixedClock::at(day(21), 8, 0, 0, 0);
    let mut engine = Engine::new(link.clone(), NoDelay, clock, &config(dir.path()));
    let mut sink = RecordingSink::new();

    link.reply(&full_frame(Facility::One, 0.0));
    link.silence(5);
    for _ in 0..6 {
        engine.run_cycle(&mut sink);
    }

    assert!(!dir.path().join("09-21-2023.csv").exists());
    assert_eq!(engine.handle().stats().rows_written, 0);
}

#[test]
fn header_is_written_once_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    for run in 0..2 {
        let link = MockLink::new();
        let clock = FixedClock::at(day(21), 10 + run, 0, 0, 0);
        let mut engine = Engine::new(link.clone(), NoDelay, clock, &config(dir.path()));
        let mut sink = RecordingSink::new();
        poll_pair(&mut engine, &link, &mut sink, run as f64);
    }

    let rows = lines(&dir.path().join("09-21-2023.csv"));
    assert_eq!(rows.iter().filter(|r| r.as_str() == CSV_HEADER).count(), 1);
    assert_eq!(rows[0], CSV_HEADER);
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("10:00:00.00,"));
    assert!(rows[2].starts_with("11:00:00.00,"));
}

#[test]
fn log_rotates_at_midnight() {
    let dir = tempfile::tempdir().unwrap();
    let link = MockLink::new();
    let clock = FixedClock::at(day(21), 23, 59, 59, 900);
    let mut engine = Engine::new(link.clone(), NoDelay, clock.clone(), &config(dir.path()));
    let mut sink = RecordingSink::new();

    poll_pair(&mut engine, &link, &mut sink, 0.0);
    clock.advance_ms(200);
    poll_pair(&mut engine, &link, &mut sink, 1.0);

    let before = lines(&dir.path().join("09-21-2023.csv"));
    let after = lines(&dir.path().join("09-22-2023.csv"));
    assert_eq!(before.len(), 2);
    assert_eq!(after.len(), 3);
    assert_eq!(after[0], CSV_HEADER);
    assert!(after[1].starts_with("00:00:00.10,71.00,"));
    assert!(sink.events.contains(&EngineEvent::RowPersisted { date: day(22) }));
}

#[test]
fn unwritable_log_does_not_stop_acquisition() {
    let dir = tempfile::tempdir().unwrap();
    let blocked = dir.path().join("data");
    fs::write(&blocked, "a file where the directory should be").unwrap();

    let link = MockLink::new();
    let clock = FixedClock::at(day(21), 12, 0, 0, 0);
    let mut engine = Engine::new(link.clone(), NoDelay, clock, &config(&blocked));
    let mut sink = RecordingSink::new();

    for i in 0..3 {
        poll_pair(&mut engine, &link, &mut sink, i as f64);
    }

    let stats = engine.handle().stats();
    assert_eq!(stats.frames_accepted, 6);
    assert_eq!(stats.rows_written, 0);
    assert_eq!(stats.persistence_failures, 5);
    assert_eq!(
        sink.count(|e| matches!(e, EngineEvent::PersistenceFailure(_))),
        5
    );
    assert_eq!(engine.handle().target(), Facility::One);
}
