//! Sensor domain types: facilities, channels and samples.
//!
//! Each facility carries six channels split into two categories. Channels
//! of one category share a capacity and a sequence counter:
//!
//! ```text
//!  Facility ─┬─ Thermal     (cap 10) ── TempA · TempB
//!            └─ Mechanical  (cap 15) ── AccelX · AccelY · AccelZ · Pressure
//! ```

pub mod store;
pub mod window;

use core::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Standard gravity removed from facility 1's Z axis.
pub const GRAVITY_MS2: f64 = 9.81;

/// Window capacity of thermal channels.
pub const THERMAL_CAPACITY: usize = 10;

/// Window capacity of acceleration/pressure channels.
pub const MECHANICAL_CAPACITY: usize = 15;

// ---------------------------------------------------------------------------
// Facility
// ---------------------------------------------------------------------------

/// One of the two monitored facilities sharing the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facility {
    One,
    Two,
}

impl Facility {
    pub const ALL: [Self; 2] = [Self::One, Self::Two];

    /// ASCII id used both as the request byte and the frame prefix.
    pub const fn id(self) -> u8 {
        match self {
            Self::One => b'1',
            Self::Two => b'2',
        }
    }

    pub fn from_id(id: char) -> Option<Self> {
        match id {
            '1' => Some(Self::One),
            '2' => Some(Self::Two),
            _ => None,
        }
    }

    /// The facility polled after this one.
    pub const fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// Calibration added to the raw Z acceleration.
    ///
    /// Only facility 1's accelerometer is gravity-compensated; facility 2
    /// reports Z as-is.
    pub const fn z_offset(self) -> f64 {
        match self {
            Self::One => -GRAVITY_MS2,
            Self::Two => 0.0,
        }
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id() as char)
    }
}

// ---------------------------------------------------------------------------
// Category / channel
// ---------------------------------------------------------------------------

/// Channels sharing one window capacity and one sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Thermocouples A and B.
    Thermal,
    /// Triaxial acceleration and pressure.
    Mechanical,
}

impl Category {
    pub const fn capacity(self) -> usize {
        match self {
            Self::Thermal => THERMAL_CAPACITY,
            Self::Mechanical => MECHANICAL_CAPACITY,
        }
    }

    pub const fn channels(self) -> &'static [ChannelKind] {
        match self {
            Self::Thermal => &[ChannelKind::TempA, ChannelKind::TempB],
            Self::Mechanical => &[
                ChannelKind::AccelX,
                ChannelKind::AccelY,
                ChannelKind::AccelZ,
                ChannelKind::Pressure,
            ],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thermal => write!(f, "thermal"),
            Self::Mechanical => write!(f, "accel/pressure"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Physical feed within a facility, in CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelKind {
    TempA = 0,
    TempB = 1,
    AccelX = 2,
    AccelY = 3,
    AccelZ = 4,
    Pressure = 5,
}

impl ChannelKind {
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::TempA,
        Self::TempB,
        Self::AccelX,
        Self::AccelY,
        Self::AccelZ,
        Self::Pressure,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn category(self) -> Category {
        match self {
            Self::TempA | Self::TempB => Category::Thermal,
            Self::AccelX | Self::AccelY | Self::AccelZ | Self::Pressure => Category::Mechanical,
        }
    }

    /// Position among the sibling channels of the same category.
    pub const fn slot(self) -> usize {
        match self {
            Self::TempA | Self::AccelX => 0,
            Self::TempB | Self::AccelY => 1,
            Self::AccelZ => 2,
            Self::Pressure => 3,
        }
    }

    pub const fn axis(self) -> Option<Axis> {
        match self {
            Self::AccelX => Some(Axis::X),
            Self::AccelY => Some(Axis::Y),
            Self::AccelZ => Some(Axis::Z),
            _ => None,
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::TempA | Self::TempB => "F",
            Self::AccelX | Self::AccelY | Self::AccelZ => "m/s^2",
            Self::Pressure => "psi",
        }
    }

    /// Short label, e.g. `1A`, `1K_X`, `2U`.
    pub fn label(self, facility: Facility) -> String {
        let id = facility.id() as char;
        match self {
            Self::TempA => format!("{id}A"),
            Self::TempB => format!("{id}B"),
            Self::AccelX => format!("{id}K_X"),
            Self::AccelY => format!("{id}K_Y"),
            Self::AccelZ => format!("{id}K_Z"),
            Self::Pressure => format!("{id}U"),
        }
    }
}

/// A physical sensor feed: `(facility, kind)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel {
    pub facility: Facility,
    pub kind: ChannelKind,
}

impl Channel {
    pub const fn new(facility: Facility, kind: ChannelKind) -> Self {
        Self { facility, kind }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.label(self.facility))
    }
}

/// Acquisition stamp shared by every sibling sample of one insert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    /// Per-facility, per-category monotonic counter (graph x-axis).
    pub sequence: u64,
    pub at: NaiveDateTime,
}

/// One value of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub channel: Channel,
    pub value: f64,
    pub sequence: u64,
    pub at: NaiveDateTime,
}
