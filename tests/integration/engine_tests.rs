//! Integration tests for the Engine → Scheduler → Store pipeline.
//!
//! Every test drives the real engine against `MockLink`, so the full
//! chain from request byte to window contents is exercised without a
//! serial port.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use healthmon::app::events::EngineEvent;
use healthmon::config::{EngineConfig, RowTrigger};
use healthmon::error::ParseError;
use healthmon::protocol::transport::Direction;
use healthmon::scheduler::CycleOutcome;
use healthmon::sensors::{Category, Channel, ChannelKind, Facility};
use healthmon::Engine;

use crate::mock_link::{FixedClock, LinkOp, MockLink, NoDelay, RecordingSink, day, full_frame};

type TestEngine = Engine<MockLink, NoDelay, FixedClock>;

fn make_engine(dir: &std::path::Path) -> (TestEngine, MockLink, FixedClock) {
    let config = EngineConfig {
        data_dir: dir.to_path_buf(),
        ..EngineConfig::default()
    };
    make_engine_with(config)
}

fn make_engine_with(config: EngineConfig) -> (TestEngine, MockLink, FixedClock) {
    let link = MockLink::new();
    let clock = FixedClock::at(day(21), 9, 15, 0, 0);
    let engine = Engine::new(link.clone(), NoDelay, clock.clone(), &config);
    (engine, link, clock)
}

fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|a| (a - expected).abs() < 1e-4)
}

// ── Reference frame ───────────────────────────────────────────

#[test]
fn facility_one_reference_frame_populates_windows_and_flips_target() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();
    link.reply("1A72.34 B71.10 K0.10,0.20,9.90 U12.00");

    let report = engine.run_cycle(&mut sink);

    assert_eq!(report.target, Facility::One);
    assert_eq!(
        report.outcome,
        CycleOutcome::Parsed {
            next_target: Facility::Two
        }
    );
    let handle = engine.handle();
    let latest = handle.latest(Facility::One);
    assert!(approx(latest.get(ChannelKind::TempA), 72.34));
    assert!(approx(latest.get(ChannelKind::TempB), 71.10));
    assert!(approx(latest.get(ChannelKind::AccelX), 0.10));
    assert!(approx(latest.get(ChannelKind::AccelY), 0.20));
    assert!(approx(latest.get(ChannelKind::AccelZ), 0.09));
    assert!(approx(latest.get(ChannelKind::Pressure), 12.00));
    assert_eq!(handle.target(), Facility::Two);
    assert_eq!(link.sent(), b"1".to_vec());
}

// ── Window capacity ───────────────────────────────────────────

#[test]
fn sixteen_mechanical_frames_keep_the_last_fifteen() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();

    for i in 1..=16 {
        link.reply(&format!("1K{i}.00,0.00,9.81 U{i}.50"));
        link.reply(&full_frame(Facility::Two, 0.0));
    }
    for _ in 0..32 {
        engine.run_cycle(&mut sink);
    }

    let handle = engine.handle();
    for kind in [
        ChannelKind::AccelX,
        ChannelKind::AccelY,
        ChannelKind::AccelZ,
        ChannelKind::Pressure,
    ] {
        let window = handle.window(Channel::new(Facility::One, kind));
        assert_eq!(window.len(), 15, "{kind:?}");
        assert_eq!(window.sequences(), (1..=15).collect::<Vec<u64>>(), "{kind:?}");
    }
    let x = handle.window(Channel::new(Facility::One, ChannelKind::AccelX));
    assert_eq!(x.values().first().copied(), Some(2.0));
    assert_eq!(x.values().last().copied(), Some(16.0));

    // No thermal tags from facility 1: its thermal windows never moved.
    assert!(handle.window(Channel::new(Facility::One, ChannelKind::TempA)).is_empty());
    assert_eq!(
        sink.count(|e| matches!(e, EngineEvent::IncompleteCategory { .. })),
        0
    );
}

// ── Timeouts ──────────────────────────────────────────────────

#[test]
fn silent_facility_two_is_retried_twenty_times_then_alternation_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();

    link.reply(&full_frame(Facility::One, 0.0));
    link.silence(20);
    link.reply(&full_frame(Facility::Two, 0.0));
    link.reply(&full_frame(Facility::One, 1.0));

    for _ in 0..23 {
        engine.run_cycle(&mut sink);
    }

    let mut expected = vec![b'1'];
    expected.extend([b'2'; 21]);
    expected.push(b'1');
    assert_eq!(link.sent(), expected);
    assert_eq!(sink.timeouts_for(Facility::Two), 20);
    assert_eq!(sink.timeouts_for(Facility::One), 0);
    assert_eq!(engine.handle().stats().timeouts, 20);
    assert_eq!(engine.handle().target(), Facility::Two);
}

#[test]
fn link_fault_retries_the_same_facility() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();
    link.fault();

    let report = engine.run_cycle(&mut sink);

    assert!(matches!(report.outcome, CycleOutcome::LinkFault(_)));
    assert_eq!(report.next_target, Facility::One);
    assert_eq!(engine.handle().stats().link_faults, 1);
    assert_eq!(link.direction(), Direction::Receive);
}

// ── Malformed input ───────────────────────────────────────────

#[test]
fn malformed_line_never_populates_any_window() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();
    link.reply("1A72.34 B71.10 K0.10,0.20,9.90 U1x.00");

    let report = engine.run_cycle(&mut sink);

    assert_eq!(
        report.outcome,
        CycleOutcome::Malformed(ParseError::MalformedValue { tag: 'U' })
    );
    assert_eq!(report.next_target, Facility::One);
    let handle = engine.handle();
    for kind in ChannelKind::ALL {
        assert!(handle.window(Channel::new(Facility::One, kind)).is_empty());
    }
    // A controller answering with garbage is still on the line.
    assert!(handle.is_live());
    assert_eq!(handle.stats().rejected, 1);
}

#[test]
fn unknown_facility_is_retried_wrong_facility_flips() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();
    link.reply("9A1.0");
    link.reply(&full_frame(Facility::Two, 0.0));

    let first = engine.run_cycle(&mut sink);
    assert_eq!(
        first.outcome,
        CycleOutcome::Malformed(ParseError::UnrecognizedFacility)
    );
    assert_eq!(first.next_target, Facility::One);

    let second = engine.run_cycle(&mut sink);
    assert_eq!(
        second.outcome,
        CycleOutcome::Malformed(ParseError::WrongFacility {
            expected: Facility::One,
            got: Facility::Two
        })
    );
    assert_eq!(second.next_target, Facility::Two);
    assert!(
        engine
            .handle()
            .window(Channel::new(Facility::Two, ChannelKind::TempA))
            .is_empty()
    );
}

#[test]
fn partial_category_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();
    link.reply("1A70.00 K0.00,0.00,9.81 U12.00 Z5");

    engine.run_cycle(&mut sink);

    assert!(sink.events.contains(&EngineEvent::IncompleteCategory {
        facility: Facility::One,
        category: Category::Thermal,
    }));
    assert!(sink.events.contains(&EngineEvent::UntaggedToken {
        facility: Facility::One,
        token: "Z5".to_string(),
    }));
    let handle = engine.handle();
    assert!(handle.window(Channel::new(Facility::One, ChannelKind::TempA)).is_empty());
    assert_eq!(handle.window(Channel::new(Facility::One, ChannelKind::Pressure)).len(), 1);
    assert_eq!(handle.target(), Facility::Two);
}

// ── Half-duplex discipline ────────────────────────────────────

#[test]
fn request_bytes_are_only_sent_while_transmitting() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();
    link.reply(&full_frame(Facility::One, 0.0));
    link.silence(1);

    engine.run_cycle(&mut sink);
    engine.run_cycle(&mut sink);

    let state = link.state();
    assert_eq!(state.violations, 0);
    assert_eq!(
        state.ops[..4],
        [
            LinkOp::Direction(Direction::Transmit),
            LinkOp::Byte(b'1'),
            LinkOp::Direction(Direction::Receive),
            LinkOp::Receive,
        ]
    );
}

#[test]
fn shutdown_leaves_the_line_in_receive() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let mut sink = RecordingSink::new();
    let shutdown = AtomicBool::new(false);

    link.reply(&full_frame(Facility::One, 0.0));
    engine.run_cycle(&mut sink);
    shutdown.store(true, Ordering::Relaxed);
    engine.run(&shutdown, &mut sink);

    assert_eq!(link.direction(), Direction::Receive);
    assert_eq!(sink.events.last(), Some(&EngineEvent::Stopped));
}

// ── Read API ──────────────────────────────────────────────────

#[test]
fn liveness_follows_the_last_received_line() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        data_dir: dir.path().to_path_buf(),
        liveness_window_ms: 30,
        ..EngineConfig::default()
    };
    let (mut engine, link, _clock) = make_engine_with(config);
    let mut sink = RecordingSink::new();
    let handle = engine.handle();
    assert!(!handle.is_live());

    link.reply(&full_frame(Facility::One, 0.0));
    engine.run_cycle(&mut sink);
    assert!(handle.is_live());

    thread::sleep(Duration::from_millis(60));
    assert!(!handle.is_live());

    link.reply("1A70.00 B71.00");
    engine.run_cycle(&mut sink);
    assert_eq!(handle.stats().rejected, 1);
    assert!(handle.is_live());

    thread::sleep(Duration::from_millis(60));
    link.silence(1);
    engine.run_cycle(&mut sink);
    assert!(!handle.is_live());
}

#[test]
fn concurrent_readers_never_see_torn_windows() {
    const BATCHES: u32 = 10;

    let dir = tempfile::tempdir().unwrap();
    let (mut engine, link, _clock) = make_engine(dir.path());
    let handle = engine.handle();
    let done = Arc::new(AtomicBool::new(false));
    let observed = Arc::new(AtomicU32::new(0));

    let reader = {
        let done = Arc::clone(&done);
        let observed = Arc::clone(&observed);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                for facility in Facility::ALL {
                    handle.store().with_facility(facility, |state| {
                        let thermal = state.thermal.sibling_lengths();
                        let mech = state.mechanical.sibling_lengths();
                        assert!(thermal.iter().all(|l| *l == state.thermal.len() && *l <= 10));
                        assert!(mech.iter().all(|l| *l == state.mechanical.len() && *l <= 15));
                    });
                    let x = handle.window(Channel::new(facility, ChannelKind::AccelX));
                    assert!(x.len() <= 15);
                    assert!(x.sequences().windows(2).all(|w| w[1] == w[0] + 1));
                }
                observed.fetch_add(1, Ordering::AcqRel);
            }
        })
    };

    // Block until the reader completes another pass.
    let wait_for_pass = |observed: &AtomicU32| {
        let seen = observed.load(Ordering::Acquire);
        while observed.load(Ordering::Acquire) == seen {
            thread::yield_now();
        }
    };

    let mut sink = RecordingSink::new();
    let mut i = 0u32;
    for _ in 0..BATCHES {
        wait_for_pass(&observed);
        for _ in 0..20 {
            link.reply(&full_frame(Facility::One, f64::from(i) / 10.0));
            link.reply(&full_frame(Facility::Two, f64::from(i) / 10.0));
            engine.run_cycle(&mut sink);
            engine.run_cycle(&mut sink);
            i += 1;
        }
    }
    wait_for_pass(&observed);
    done.store(true, Ordering::Release);

    reader.join().unwrap();
    assert!(observed.load(Ordering::Acquire) > BATCHES);
    assert_eq!(engine.handle().stats().frames_accepted, 400);
}

#[test]
fn fresh_pair_trigger_needs_a_frame_from_each_facility() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        data_dir: dir.path().to_path_buf(),
        row_trigger: RowTrigger::FreshPair,
        ..EngineConfig::default()
    };
    let (mut engine, link, _clock) = make_engine_with(config);
    let mut sink = RecordingSink::new();

    link.reply(&full_frame(Facility::One, 0.0));
    link.reply(&full_frame(Facility::Two, 0.0));
    link.reply(&full_frame(Facility::One, 1.0));
    link.silence(3);
    for _ in 0..6 {
        engine.run_cycle(&mut sink);
    }

    assert_eq!(engine.handle().stats().rows_written, 1);
}
