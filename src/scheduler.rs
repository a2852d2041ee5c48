//! Poll scheduler: the request/response cycle on the shared line.
//!
//! One cycle addresses one facility:
//!
//! ```text
//!  ┌──────┐   ┌──────────────┐   ┌───────────┐   ┌───────────┐
//!  │ Idle │──▶│ Transmitting │──▶│ Receiving │──▶│ Parsed    │──┐
//!  └──────┘   │ DIR=TX       │   │ DIR=RX    │   │ TimedOut  │  │
//!     ▲       │ settle · byte│   │ ≤ budget  │   │ Malformed │  │
//!     │       │ settle       │   └───────────┘   └───────────┘  │
//!     │       └──────────────┘                                   │
//!     └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The scheduler knows nothing about parsing, windows or CSV files. It
//! hands each received line to a [`CycleDelegate`] and only decides,
//! from the delegate's verdict, which facility to address next:
//!
//! | Outcome                 | Next target                    |
//! |-------------------------|--------------------------------|
//! | Parsed                  | complement of the responder    |
//! | Malformed, wrong sender | flipped                        |
//! | Malformed, other        | same facility (retry)          |
//! | TimedOut / link fault   | same facility (retry)          |
//!
//! There is no sleep between cycles: the cadence is set by the bounded
//! receive window alone.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use log::trace;

use crate::app::ports::{CycleDelegate, LineVerdict};
use crate::config::EngineConfig;
use crate::error::{ParseError, TransportError};
use crate::protocol::transport::{Direction, Transport};
use crate::sensors::Facility;

// ═══════════════════════════════════════════════════════════════
//  Cycle types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Transmitting,
    Receiving,
    Parsed,
    TimedOut,
    Malformed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A frame was accepted.
    Parsed { next_target: Facility },
    /// Nothing arrived within the receive window.
    TimedOut,
    /// A line arrived but was rejected.
    Malformed(ParseError),
    /// The transport itself failed; handled like a timeout.
    LinkFault(TransportError),
}

impl CycleOutcome {
    fn terminal_phase(self) -> CyclePhase {
        match self {
            Self::Parsed { .. } => CyclePhase::Parsed,
            Self::TimedOut | Self::LinkFault(_) => CyclePhase::TimedOut,
            Self::Malformed(_) => CyclePhase::Malformed,
        }
    }
}

/// What happened in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub target: Facility,
    pub outcome: CycleOutcome,
    pub next_target: Facility,
}

/// Timing of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Hold before and after the request byte.
    pub settle: Duration,
    /// Ceiling for transmit + receive.
    pub budget: Duration,
}

impl PollTiming {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            settle: Duration::from_millis(u64::from(config.settle_ms)),
            budget: Duration::from_millis(u64::from(config.cycle_budget_ms)),
        }
    }

    fn settle_us(&self) -> u32 {
        u32::try_from(self.settle.as_micros()).unwrap_or(u32::MAX)
    }
}

impl Default for PollTiming {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Alternating facility poller.
pub struct PollScheduler {
    target: Facility,
    phase: CyclePhase,
    timing: PollTiming,
    cycles: u64,
}

impl PollScheduler {
    /// Starts addressing facility 1.
    pub fn new(timing: PollTiming) -> Self {
        Self {
            target: Facility::One,
            phase: CyclePhase::Idle,
            timing,
            cycles: 0,
        }
    }

    pub fn target(&self) -> Facility {
        self.target
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn timing(&self) -> PollTiming {
        self.timing
    }

    /// Run one full cycle against the current target.
    ///
    /// Whatever happens, the direction line is left in receive mode.
    pub fn run_cycle<T, D>(
        &mut self,
        link: &mut T,
        delay: &mut D,
        delegate: &mut dyn CycleDelegate,
    ) -> CycleReport
    where
        T: Transport + ?Sized,
        D: DelayNs,
    {
        let target = self.target;
        let started = Instant::now();
        self.cycles += 1;

        self.enter(CyclePhase::Transmitting);
        if let Err(e) = self.transmit(link, delay, target) {
            // Best effort: never leave the line driven.
            let _ = link.set_direction(Direction::Receive);
            delegate.on_link_fault(target, e);
            return self.finish(target, CycleOutcome::LinkFault(e));
        }

        self.enter(CyclePhase::Receiving);
        let window = self.timing.budget.saturating_sub(started.elapsed());
        let outcome = match link.try_receive_line(window) {
            Ok(Some(line)) => match delegate.on_line(target, &line) {
                LineVerdict::Accepted { next_target } => CycleOutcome::Parsed { next_target },
                LineVerdict::Rejected(reason) => CycleOutcome::Malformed(reason),
            },
            Ok(None) => {
                delegate.on_timeout(target);
                CycleOutcome::TimedOut
            }
            Err(e) => {
                delegate.on_link_fault(target, e);
                CycleOutcome::LinkFault(e)
            }
        };

        self.finish(target, outcome)
    }

    fn transmit<T, D>(&self, link: &mut T, delay: &mut D, target: Facility) -> Result<(), TransportError>
    where
        T: Transport + ?Sized,
        D: DelayNs,
    {
        link.set_direction(Direction::Transmit)?;
        delay.delay_us(self.timing.settle_us());
        let sent = link.send_byte(target.id());
        delay.delay_us(self.timing.settle_us());
        let released = link.set_direction(Direction::Receive);
        sent.and(released)
    }

    fn finish(&mut self, target: Facility, outcome: CycleOutcome) -> CycleReport {
        self.enter(outcome.terminal_phase());

        self.target = match outcome {
            CycleOutcome::Parsed { next_target } => next_target,
            // Someone valid answered out of turn; move on.
            CycleOutcome::Malformed(ParseError::WrongFacility { .. }) => target.other(),
            _ => target,
        };

        self.enter(CyclePhase::Idle);
        CycleReport {
            target,
            outcome,
            next_target: self.target,
        }
    }

    fn enter(&mut self, phase: CyclePhase) {
        trace!("Poll: {:?} -> {:?} (target {})", self.phase, phase, self.target);
        self.phase = phase;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
