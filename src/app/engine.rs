//! Acquisition engine: the polling core.
//!
//! [`Engine`] owns the transport, the scheduler, both facilities' windows
//! and the daily log. It is the only writer of any of them. Everything
//! else sees the engine through an [`EngineHandle`]: a cheap, cloneable,
//! read-only view over the shared store and counters.
//!
//! ```text
//!  Transport ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                │           Engine             │
//!      Clock ──▶ │ Scheduler · Parser · Store   │ ──▶ DailyLog (CSV)
//!                └──────────────┬───────────────┘
//!                               │ Arc<SampleStore>, Arc<EngineStats>
//!                               ▼
//!                         EngineHandle (readers)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::{EngineConfig, RowTrigger};
use crate::diagnostics::{EngineStats, StatsSnapshot};
use crate::error::TransportError;
use crate::persistence::{DailyLog, LogRow};
use crate::protocol::frame::parse_frame;
use crate::protocol::transport::{Direction, Transport};
use crate::scheduler::{CycleReport, PollScheduler, PollTiming};
use crate::sensors::store::{FrameCommit, LatestValues, SampleStore, WindowSnapshot};
use crate::sensors::{Channel, Facility};

use super::events::EngineEvent;
use super::ports::{Clock, CycleDelegate, EventSink, LineVerdict};

// ───────────────────────────────────────────────────────────────
// Engine
// ───────────────────────────────────────────────────────────────

/// Single-threaded polling loop over one half-duplex line.
pub struct Engine<T, D, C> {
    link: T,
    delay: D,
    clock: C,
    scheduler: PollScheduler,
    store: Arc<SampleStore>,
    stats: Arc<EngineStats>,
    /// Facility index of the next cycle's target, mirrored for readers.
    target: Arc<AtomicU8>,
    log: DailyLog,
    row_trigger: RowTrigger,
    liveness_window: Duration,
    /// Facilities that committed a frame since the last row (`FreshPair`).
    fresh: [bool; 2],
}

impl<T, D, C> Engine<T, D, C>
where
    T: Transport,
    D: DelayNs,
    C: Clock,
{
    /// Build the engine. Nothing touches the line until the first cycle.
    pub fn new(link: T, delay: D, clock: C, config: &EngineConfig) -> Self {
        let scheduler = PollScheduler::new(PollTiming::from_config(config));
        let target = Arc::new(AtomicU8::new(scheduler.target().index() as u8));
        Self {
            link,
            delay,
            clock,
            scheduler,
            store: Arc::new(SampleStore::new()),
            stats: Arc::new(EngineStats::new()),
            target,
            log: DailyLog::new(config.data_dir.clone()),
            row_trigger: config.row_trigger,
            liveness_window: Duration::from_millis(u64::from(config.liveness_window_ms)),
            fresh: [false; 2],
        }
    }

    /// Read-only view for display and reporting consumers.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            target: Arc::clone(&self.target),
            liveness_window: self.liveness_window,
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn link(&self) -> &T {
        &self.link
    }

    pub fn daily_log(&self) -> &DailyLog {
        &self.log
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one transmit/receive cycle and everything it triggers.
    pub fn run_cycle(&mut self, sink: &mut impl EventSink) -> CycleReport {
        self.stats.record_cycle();

        let mut acquisition = Acquisition {
            clock: &self.clock,
            store: &self.store,
            stats: &self.stats,
            log: &mut self.log,
            row_trigger: self.row_trigger,
            fresh: &mut self.fresh,
            sink,
        };
        let report = self
            .scheduler
            .run_cycle(&mut self.link, &mut self.delay, &mut acquisition);

        self.target
            .store(report.next_target.index() as u8, Ordering::Relaxed);
        report
    }

    /// Poll until `shutdown` is raised, then release the line.
    ///
    /// The flag is checked between cycles, so shutdown waits for at most
    /// one bounded receive window.
    pub fn run(&mut self, shutdown: &AtomicBool, sink: &mut impl EventSink) {
        info!(
            "Engine: polling started (target {}, budget {:?})",
            self.scheduler.target(),
            self.scheduler.timing().budget
        );
        sink.emit(&EngineEvent::Started {
            target: self.scheduler.target(),
        });

        while !shutdown.load(Ordering::Relaxed) {
            self.run_cycle(sink);
        }

        self.shutdown(sink);
    }

    /// Settle the line to receive and close the daily log.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) {
        if let Err(e) = self.link.set_direction(Direction::Receive) {
            warn!("Engine: could not release the line on shutdown: {}", e);
        }
        self.log.close();
        info!(
            "Engine: stopped after {} cycles",
            self.scheduler.cycles()
        );
        sink.emit(&EngineEvent::Stopped);
    }
}

// ───────────────────────────────────────────────────────────────
// Cycle delegate: parse → store → persist
// ───────────────────────────────────────────────────────────────

/// Borrowed engine state handed to the scheduler for one cycle.
struct Acquisition<'a, C: ?Sized, S: ?Sized> {
    clock: &'a C,
    store: &'a SampleStore,
    stats: &'a EngineStats,
    log: &'a mut DailyLog,
    row_trigger: RowTrigger,
    fresh: &'a mut [bool; 2],
    sink: &'a mut S,
}

impl<C, S> Acquisition<'_, C, S>
where
    C: Clock + ?Sized,
    S: EventSink + ?Sized,
{
    fn row_due(&mut self, facility: Facility, commit: &FrameCommit) -> bool {
        match self.row_trigger {
            RowTrigger::EveryFrame => {
                Facility::ALL.iter().all(|f| self.store.has_thermal(*f))
            }
            RowTrigger::FreshPair => {
                if commit.committed_anything() {
                    self.fresh[facility.index()] = true;
                }
                self.fresh.iter().all(|fresh| *fresh)
            }
        }
    }

    fn persist(&mut self, at: NaiveDateTime) {
        let Some(values) = self.store.joined_latest() else {
            debug!("CSV: row skipped, some channels have no value yet");
            return;
        };
        self.fresh.fill(false);

        match self.log.append_row(&LogRow { at, values }) {
            Ok(()) => {
                self.stats.record_row();
                self.sink.emit(&EngineEvent::RowPersisted { date: at.date() });
            }
            Err(e) => {
                self.stats.record_persistence_failure();
                self.sink.emit(&EngineEvent::PersistenceFailure(e));
            }
        }
    }
}

impl<C, S> CycleDelegate for Acquisition<'_, C, S>
where
    C: Clock + ?Sized,
    S: EventSink + ?Sized,
{
    fn on_line(&mut self, target: Facility, line: &str) -> LineVerdict {
        let at = self.clock.now();
        self.store.mark_heard();
        let frame = match parse_frame(line, target, at) {
            Ok(frame) => frame,
            Err(error) => {
                self.stats.record_rejected();
                self.sink.emit(&EngineEvent::FrameRejected {
                    facility: target,
                    error,
                });
                return LineVerdict::Rejected(error);
            }
        };

        let commit = self.store.record(&frame);
        self.stats.record_accepted();

        if !frame.untagged.is_empty() {
            self.stats.record_untagged(frame.untagged.len());
            for token in &frame.untagged {
                self.sink.emit(&EngineEvent::UntaggedToken {
                    facility: frame.facility,
                    token: token.clone(),
                });
            }
        }
        for category in &commit.incomplete {
            self.sink.emit(&EngineEvent::IncompleteCategory {
                facility: frame.facility,
                category: *category,
            });
        }
        self.sink.emit(&EngineEvent::FrameAccepted {
            facility: frame.facility,
            thermal: commit.thermal,
            mechanical: commit.mechanical,
        });

        if self.row_due(frame.facility, &commit) {
            self.persist(at);
        }

        LineVerdict::Accepted {
            next_target: frame.next_target(),
        }
    }

    fn on_timeout(&mut self, target: Facility) {
        self.stats.record_timeout();
        self.sink
            .emit(&EngineEvent::TransportTimeout { facility: target });
    }

    fn on_link_fault(&mut self, target: Facility, error: TransportError) {
        self.stats.record_link_fault();
        self.sink.emit(&EngineEvent::LinkFault {
            facility: target,
            error,
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Read-only handle
// ───────────────────────────────────────────────────────────────

/// Read API for consumers on other threads. Never mutates engine state.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    store: Arc<SampleStore>,
    stats: Arc<EngineStats>,
    target: Arc<AtomicU8>,
    liveness_window: Duration,
}

impl EngineHandle {
    /// Latest value of every channel of `facility`.
    pub fn latest(&self, facility: Facility) -> LatestValues {
        self.store.latest(facility)
    }

    /// Full window of one channel, oldest → newest, with its sequence series.
    pub fn window(&self, channel: Channel) -> WindowSnapshot {
        self.store.window(channel)
    }

    /// Whether any line was received within the liveness window, even one
    /// that was rejected.
    pub fn is_live(&self) -> bool {
        self.store
            .last_frame_age()
            .is_some_and(|age| age <= self.liveness_window)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Facility the next cycle will address.
    pub fn target(&self) -> Facility {
        match self.target.load(Ordering::Relaxed) {
            0 => Facility::One,
            _ => Facility::Two,
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
