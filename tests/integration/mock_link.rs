//! Mock adapters for integration tests.
//!
//! The engine takes ownership of its transport and clock, so both mocks
//! keep their state behind an `Arc<Mutex<..>>`: the test holds a clone and
//! scripts replies or moves the clock while the engine owns the other.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use embedded_hal::delay::DelayNs;

use healthmon::app::events::EngineEvent;
use healthmon::app::ports::{Clock, EventSink};
use healthmon::error::TransportError;
use healthmon::protocol::transport::{Direction, Transport};
use healthmon::sensors::Facility;

// ── Link call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LinkOp {
    Direction(Direction),
    Byte(u8),
    Receive,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Line(String),
    Silence,
    Fault,
}

#[derive(Debug)]
pub struct LinkState {
    pub replies: VecDeque<Reply>,
    pub ops: Vec<LinkOp>,
    pub direction: Direction,
    /// Bytes sent while the line was not in transmit mode.
    pub violations: usize,
}

// ── MockLink ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockLink {
    state: Arc<Mutex<LinkState>>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LinkState {
                replies: VecDeque::new(),
                ops: Vec::new(),
                direction: Direction::Receive,
                violations: 0,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap()
    }

    pub fn reply(&self, line: &str) {
        self.state().replies.push_back(Reply::Line(line.to_string()));
    }

    pub fn silence(&self, cycles: usize) {
        let mut state = self.state();
        for _ in 0..cycles {
            state.replies.push_back(Reply::Silence);
        }
    }

    pub fn fault(&self) {
        self.state().replies.push_back(Reply::Fault);
    }

    /// Request bytes in send order.
    pub fn sent(&self) -> Vec<u8> {
        self.state()
            .ops
            .iter()
            .filter_map(|op| match op {
                LinkOp::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    pub fn direction(&self) -> Direction {
        self.state().direction
    }
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockLink {
    fn set_direction(&mut self, direction: Direction) -> Result<(), TransportError> {
        let mut state = self.state();
        state.direction = direction;
        state.ops.push(LinkOp::Direction(direction));
        Ok(())
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.direction != Direction::Transmit {
            state.violations += 1;
        }
        state.ops.push(LinkOp::Byte(byte));
        Ok(())
    }

    fn try_receive_line(&mut self, _timeout: Duration) -> Result<Option<String>, TransportError> {
        let mut state = self.state();
        state.ops.push(LinkOp::Receive);
        match state.replies.pop_front() {
            Some(Reply::Line(line)) => Ok(Some(line)),
            Some(Reply::Fault) => Err(TransportError::Io(std::io::ErrorKind::BrokenPipe)),
            Some(Reply::Silence) | None => Ok(None),
        }
    }
}

// ── FixedClock ────────────────────────────────────────────────

#[derive(Clone)]
pub struct FixedClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

#[allow(dead_code)]
impl FixedClock {
    pub fn at(date: NaiveDate, h: u32, m: u32, s: u32, milli: u32) -> Self {
        let now = date.and_hms_milli_opt(h, m, s, milli).unwrap();
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance_ms(&self, ms: i64) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::milliseconds(ms);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

// ── NoDelay ───────────────────────────────────────────────────

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<EngineEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeouts_for(&self, facility: Facility) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, EngineEvent::TransportTimeout { facility: f } if *f == facility))
            .count()
    }

    pub fn count(&self, pred: impl Fn(&EngineEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

#[allow(dead_code)]
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 9, d).unwrap()
}

/// Complete frame for `facility` with every value offset by `base`.
#[allow(dead_code)]
pub fn full_frame(facility: Facility, base: f64) -> String {
    let z = if facility == Facility::One { base + 9.81 } else { base };
    format!(
        "{}A{:.2} B{:.2} K{:.2},{:.2},{:.2} U{:.2}",
        facility.id() as char,
        70.0 + base,
        71.0 + base,
        base,
        base,
        z,
        12.0 + base
    )
}
