//! Simulated facility bus.
//!
//! [`SimulatedBus`] stands in for the serial line and both facility
//! controllers. It answers each request byte with a synthetic frame built
//! by [`encode_frame`], so the whole engine (parser, windows, CSV) runs on
//! a desk without hardware.
//!
//! The simulation keeps the half-duplex rules of the real line:
//! - a request byte is only heard while the line is in transmit mode;
//! - a reply is only received while the line is back in receive mode;
//! - a silenced facility never answers, so the engine times out on it.

use std::thread;
use std::time::Duration;

use log::debug;

use crate::error::TransportError;
use crate::protocol::frame::{FrameValues, encode_frame};
use crate::protocol::transport::{Direction, Transport};
use crate::sensors::Facility;

/// Controller turnaround before a reply starts arriving.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(10);

/// Synthetic two-facility bus.
#[derive(Debug)]
pub struct SimulatedBus {
    direction: Direction,
    pending: Option<Facility>,
    silenced: [bool; 2],
    latency: Duration,
    replies: [u64; 2],
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            direction: Direction::Receive,
            pending: None,
            silenced: [false; 2],
            latency,
            replies: [0; 2],
        }
    }

    /// Stop (or resume) answering requests addressed to `facility`.
    pub fn silence(&mut self, facility: Facility, silenced: bool) {
        self.silenced[facility.index()] = silenced;
    }

    /// Frames sent by `facility` so far.
    pub fn replies(&self, facility: Facility) -> u64 {
        self.replies[facility.index()]
    }

    /// Slowly drifting readings; facility 2 runs a little warmer.
    fn values(facility: Facility, tick: u64) -> FrameValues {
        let phase = tick as f64 * 0.2;
        let offset = facility.index() as f64 * 3.0;
        FrameValues {
            temp_a: 72.0 + offset + 1.5 * phase.sin(),
            temp_b: 71.0 + offset + 1.5 * (phase + 0.7).sin(),
            accel: [
                0.05 * (phase * 3.1).sin(),
                0.05 * (phase * 2.3).cos(),
                0.02 * (phase * 5.0).sin(),
            ],
            pressure: 12.0 + offset * 0.5 + 0.4 * (phase * 0.5).cos(),
        }
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimulatedBus {
    fn set_direction(&mut self, direction: Direction) -> Result<(), TransportError> {
        self.direction = direction;
        Ok(())
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.pending = None;
        if self.direction != Direction::Transmit {
            debug!("Sim: byte {:#04x} sent while receiving, not heard", byte);
            return Ok(());
        }
        self.pending = Facility::from_id(char::from(byte))
            .filter(|facility| !self.silenced[facility.index()]);
        Ok(())
    }

    fn try_receive_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let reply = match self.pending.take() {
            Some(facility) if self.direction == Direction::Receive && self.latency <= timeout => {
                facility
            }
            _ => {
                thread::sleep(timeout);
                return Ok(None);
            }
        };

        thread::sleep(self.latency);
        let tick = self.replies[reply.index()];
        self.replies[reply.index()] += 1;
        Ok(Some(encode_frame(reply, &Self::values(reply, tick))))
    }
}
