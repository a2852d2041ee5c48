//! Runtime diagnostics.
//!
//! [`EngineStats`] holds lock-free counters the polling loop bumps on every
//! cycle outcome. Readers (the status reporter, a display) take a
//! [`StatsSnapshot`] copy on their own cadence without touching the
//! engine's locks.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared between the polling loop and readers.
#[derive(Debug, Default)]
pub struct EngineStats {
    cycles: AtomicU64,
    frames_accepted: AtomicU64,
    timeouts: AtomicU64,
    rejected: AtomicU64,
    untagged: AtomicU64,
    rows_written: AtomicU64,
    persistence_failures: AtomicU64,
    link_faults: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub frames_accepted: u64,
    pub timeouts: u64,
    pub rejected: u64,
    pub untagged: u64,
    pub rows_written: u64,
    pub persistence_failures: u64,
    pub link_faults: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.frames_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_untagged(&self, count: usize) {
        self.untagged.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_row(&self) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_link_fault(&self) {
        self.link_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            frames_accepted: self.frames_accepted.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            untagged: self.untagged.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            link_faults: self.link_faults.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Fraction of cycles that produced an accepted frame.
    pub fn response_rate(&self) -> f32 {
        if self.cycles == 0 {
            return 0.0;
        }
        self.frames_accepted as f32 / self.cycles as f32
    }
}
