//! Port traits: the hexagonal boundary between the engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Engine (domain)
//! ```
//!
//! Driven adapters (serial line, clocks, event sinks) implement these
//! traits. The [`Engine`](super::engine::Engine) consumes them via
//! generics, so the polling core never touches hardware directly and runs
//! unchanged against the mocks in `tests/integration`.
//!
//! The byte-level link port lives next to its wire format in
//! [`crate::protocol::transport::Transport`]; delays use
//! [`embedded_hal::delay::DelayNs`].

use chrono::NaiveDateTime;

use crate::error::{ParseError, TransportError};
use crate::sensors::Facility;

use super::events::EngineEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`EngineEvent`]s through this port.
/// Adapters decide where they go (log output, a test recorder, a
/// display status line).
pub trait EventSink {
    fn emit(&mut self, event: &EngineEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &EngineEvent) {
        (**self).emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: wall clock → domain)
// ───────────────────────────────────────────────────────────────

/// Process-local wall clock.
///
/// Frame timestamps and the daily-log date both come from here, so tests
/// can pin the date to exercise rotation.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

// ───────────────────────────────────────────────────────────────
// Cycle delegate (decouples scheduler from parsing and storage)
// ───────────────────────────────────────────────────────────────

/// Callback trait the [`PollScheduler`](crate::scheduler::PollScheduler)
/// invokes at the end of each receive window.
///
/// The scheduler only moves bytes and decides the next target; the
/// engine implements this to parse, store and persist.
pub trait CycleDelegate {
    /// A line was received while `target` was addressed.
    fn on_line(&mut self, target: Facility, line: &str) -> LineVerdict;

    /// Nothing arrived within the receive window.
    fn on_timeout(&mut self, target: Facility);

    /// The transport failed during the cycle.
    fn on_link_fault(&mut self, target: Facility, error: TransportError);
}

/// Delegate's judgement on a received line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineVerdict {
    /// The frame was committed; address `next_target` next.
    Accepted { next_target: Facility },
    /// The line was discarded.
    Rejected(ParseError),
}
