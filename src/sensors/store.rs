//! Sliding-window store.
//!
//! Each facility owns two [`CategoryWindows`] groups. A group holds one
//! value window per sibling channel plus a single stamp window, and every
//! insert pushes into *all* of them at once, so index `i` across siblings
//! always refers to the same acquisition event.
//!
//! ```text
//!            idx:   0     1     2   …  (oldest → newest)
//!  stamps        [s=7] [s=8] [s=9]
//!  AccelX        [0.1] [0.2] [0.1]
//!  AccelY        [0.0] [0.1] [0.0]
//!  AccelZ        [0.1] [0.1] [0.2]
//!  Pressure      [12.] [12.] [13.]
//! ```
//!
//! [`SampleStore`] wraps both facilities in per-facility `RwLock`s: the
//! polling loop is the only writer, display readers take read locks and
//! copy what they need out, so no reader ever observes a half-applied
//! insert.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;

use super::window::Window;
use super::{
    Category, Channel, ChannelKind, Facility, MECHANICAL_CAPACITY, Sample, Stamp,
    THERMAL_CAPACITY,
};
use crate::protocol::frame::ParsedFrame;

// ═══════════════════════════════════════════════════════════════
//  Category group
// ═══════════════════════════════════════════════════════════════

/// Length-synchronised windows for the `C` sibling channels of one
/// category, each holding at most `N` entries.
#[derive(Debug, Clone)]
pub struct CategoryWindows<const N: usize, const C: usize> {
    stamps: Window<Stamp, N>,
    values: [Window<f64, N>; C],
    /// Sequence number handed to the next insert.
    next_sequence: u64,
}

impl<const N: usize, const C: usize> CategoryWindows<N, C> {
    pub fn new() -> Self {
        Self {
            stamps: Window::new(),
            values: core::array::from_fn(|_| Window::new()),
            next_sequence: 0,
        }
    }

    /// Append one value to every sibling window under a fresh sequence
    /// number. Returns that sequence number.
    pub fn insert(&mut self, values: [f64; C], at: NaiveDateTime) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.stamps.push(Stamp { sequence, at });
        for (window, value) in self.values.iter_mut().zip(values) {
            window.push(value);
        }
        sequence
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    /// Number of inserts since startup (never reset).
    pub fn inserted(&self) -> u64 {
        self.next_sequence
    }

    /// Length of every sibling value window, in slot order.
    pub fn sibling_lengths(&self) -> [usize; C] {
        core::array::from_fn(|slot| self.values[slot].len())
    }

    pub fn latest(&self, slot: usize) -> Option<f64> {
        self.values.get(slot)?.latest().copied()
    }

    pub fn latest_stamp(&self) -> Option<Stamp> {
        self.stamps.latest().copied()
    }

    pub fn stamps(&self) -> impl Iterator<Item = &Stamp> {
        self.stamps.iter()
    }

    /// Oldest → newest points of one sibling, paired with their stamps.
    pub fn points(&self, slot: usize) -> Vec<WindowPoint> {
        let Some(values) = self.values.get(slot) else {
            return Vec::new();
        };
        self.stamps
            .iter()
            .zip(values.iter())
            .map(|(stamp, value)| WindowPoint {
                sequence: stamp.sequence,
                at: stamp.at,
                value: *value,
            })
            .collect()
    }
}

impl<const N: usize, const C: usize> Default for CategoryWindows<N, C> {
    fn default() -> Self {
        Self::new()
    }
}

pub type ThermalWindows = CategoryWindows<THERMAL_CAPACITY, 2>;
pub type MechanicalWindows = CategoryWindows<MECHANICAL_CAPACITY, 4>;

// ═══════════════════════════════════════════════════════════════
//  Facility state
// ═══════════════════════════════════════════════════════════════

/// Result of committing one parsed frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameCommit {
    /// Sequence assigned to the thermal insert, if one happened.
    pub thermal: Option<u64>,
    /// Sequence assigned to the accel/pressure insert, if one happened.
    pub mechanical: Option<u64>,
    /// Categories the frame carried only some channels of (skipped).
    pub incomplete: heapless::Vec<Category, 2>,
}

impl FrameCommit {
    pub fn committed_anything(&self) -> bool {
        self.thermal.is_some() || self.mechanical.is_some()
    }
}

enum Gathered<const C: usize> {
    Absent,
    Partial,
    Complete([f64; C]),
}

fn gather<const C: usize>(frame: &ParsedFrame, category: Category) -> Gathered<C> {
    let channels = category.channels();
    debug_assert_eq!(channels.len(), C);

    let mut out = [0.0; C];
    let mut present = 0;
    for kind in channels {
        if let Some(value) = frame.get(*kind) {
            out[kind.slot()] = value;
            present += 1;
        }
    }
    match present {
        0 => Gathered::Absent,
        n if n == C => Gathered::Complete(out),
        _ => Gathered::Partial,
    }
}

/// All windows and counters of one facility.
#[derive(Debug, Clone)]
pub struct FacilityState {
    facility: Facility,
    pub thermal: ThermalWindows,
    pub mechanical: MechanicalWindows,
}

impl FacilityState {
    pub fn new(facility: Facility) -> Self {
        Self {
            facility,
            thermal: CategoryWindows::new(),
            mechanical: CategoryWindows::new(),
        }
    }

    pub fn facility(&self) -> Facility {
        self.facility
    }

    /// Commit every complete category of `frame`.
    ///
    /// A category is inserted only when the frame carries all of its
    /// channels; partially present categories are reported back in
    /// [`FrameCommit::incomplete`] and leave the windows untouched.
    pub fn record(&mut self, frame: &ParsedFrame) -> FrameCommit {
        debug_assert_eq!(frame.facility, self.facility);
        let mut commit = FrameCommit::default();

        match gather::<2>(frame, Category::Thermal) {
            Gathered::Complete(values) => {
                commit.thermal = Some(self.thermal.insert(values, frame.at));
            }
            Gathered::Partial => {
                let _ = commit.incomplete.push(Category::Thermal);
            }
            Gathered::Absent => {}
        }

        match gather::<4>(frame, Category::Mechanical) {
            Gathered::Complete(values) => {
                commit.mechanical = Some(self.mechanical.insert(values, frame.at));
            }
            Gathered::Partial => {
                let _ = commit.incomplete.push(Category::Mechanical);
            }
            Gathered::Absent => {}
        }

        commit
    }

    /// Whether a thermal sample was ever recorded.
    pub fn has_thermal(&self) -> bool {
        self.thermal.inserted() > 0
    }

    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::Thermal => self.thermal.len(),
            Category::Mechanical => self.mechanical.len(),
        }
    }

    pub fn latest(&self) -> LatestValues {
        let values = ChannelKind::ALL.map(|kind| match kind.category() {
            Category::Thermal => self.thermal.latest(kind.slot()),
            Category::Mechanical => self.mechanical.latest(kind.slot()),
        });
        LatestValues {
            facility: self.facility,
            values,
            thermal_at: self.thermal.latest_stamp().map(|s| s.at),
            mechanical_at: self.mechanical.latest_stamp().map(|s| s.at),
        }
    }

    pub fn window(&self, kind: ChannelKind) -> WindowSnapshot {
        let points = match kind.category() {
            Category::Thermal => self.thermal.points(kind.slot()),
            Category::Mechanical => self.mechanical.points(kind.slot()),
        };
        WindowSnapshot {
            channel: Channel::new(self.facility, kind),
            points,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Snapshots handed to readers
// ═══════════════════════════════════════════════════════════════

/// Latest value of every channel of one facility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestValues {
    pub facility: Facility,
    /// Indexed by [`ChannelKind::index`].
    pub values: [Option<f64>; ChannelKind::COUNT],
    pub thermal_at: Option<NaiveDateTime>,
    pub mechanical_at: Option<NaiveDateTime>,
}

impl LatestValues {
    pub fn get(&self, kind: ChannelKind) -> Option<f64> {
        self.values[kind.index()]
    }

    /// All six values, or `None` while any channel is still empty.
    pub fn complete(&self) -> Option<[f64; ChannelKind::COUNT]> {
        let mut out = [0.0; ChannelKind::COUNT];
        for (slot, value) in out.iter_mut().zip(self.values) {
            *slot = value?;
        }
        Some(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPoint {
    pub sequence: u64,
    pub at: NaiveDateTime,
    pub value: f64,
}

/// Copy of one channel's window, oldest → newest.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    pub channel: Channel,
    pub points: Vec<WindowPoint>,
}

impl WindowSnapshot {
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// X-axis series for graphing.
    pub fn sequences(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.sequence).collect()
    }

    /// The window as owned samples of its channel.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.points.iter().map(|p| Sample {
            channel: self.channel,
            value: p.value,
            sequence: p.sequence,
            at: p.at,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared store
// ═══════════════════════════════════════════════════════════════

/// Both facilities behind single-writer / multi-reader locks.
#[derive(Debug)]
pub struct SampleStore {
    facilities: [RwLock<FacilityState>; 2],
    last_frame: RwLock<Option<Instant>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self {
            facilities: Facility::ALL.map(|f| RwLock::new(FacilityState::new(f))),
            last_frame: RwLock::new(None),
        }
    }

    /// Commit a parsed frame to its facility and refresh liveness.
    pub(crate) fn record(&self, frame: &ParsedFrame) -> FrameCommit {
        let commit = self.write(frame.facility).record(frame);
        self.mark_heard();
        commit
    }

    /// Refresh liveness for a received line, whether or not it parsed.
    pub(crate) fn mark_heard(&self) {
        *self
            .last_frame
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }

    /// Run `f` with read access to one facility.
    pub fn with_facility<R>(&self, facility: Facility, f: impl FnOnce(&FacilityState) -> R) -> R {
        f(&self.read(facility))
    }

    pub fn latest(&self, facility: Facility) -> LatestValues {
        self.read(facility).latest()
    }

    pub fn window(&self, channel: Channel) -> WindowSnapshot {
        self.read(channel.facility).window(channel.kind)
    }

    pub fn has_thermal(&self, facility: Facility) -> bool {
        self.read(facility).has_thermal()
    }

    /// Latest value of all twelve channels, facility 1 first, or `None`
    /// while any channel is still empty.
    pub fn joined_latest(&self) -> Option<[[f64; ChannelKind::COUNT]; 2]> {
        let one = self.latest(Facility::One).complete()?;
        let two = self.latest(Facility::Two).complete()?;
        Some([one, two])
    }

    /// Time since any line was last received.
    pub fn last_frame_age(&self) -> Option<Duration> {
        self.last_frame
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|at| at.elapsed())
    }

    fn read(&self, facility: Facility) -> RwLockReadGuard<'_, FacilityState> {
        self.facilities[facility.index()]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, facility: Facility) -> RwLockWriteGuard<'_, FacilityState> {
        self.facilities[facility.index()]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
