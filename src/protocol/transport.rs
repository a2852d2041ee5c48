//! Transport abstraction: the shared half-duplex line.
//!
//! Concrete implementations:
//! - RS-485 serial port with a GPIO direction line (`adapters::serial`)
//! - Simulated bus with two synthetic controllers (`adapters::sim`)
//! - [`OfflineTransport`] when the link could not be opened
//!
//! The scheduler is generic over `Transport`, so swapping the physical
//! link requires zero changes to the polling logic.

use std::time::Duration;

use crate::error::TransportError;

/// State of the direction-control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Line driven by the engine (control signal high).
    Transmit,
    /// Line released to the facilities (control signal low, safe default).
    Receive,
}

/// Byte-level access to the shared line.
///
/// Callers own the half-duplex discipline: only one participant may hold
/// [`Direction::Transmit`] at a time, and the line must be returned to
/// [`Direction::Receive`] before listening.
pub trait Transport {
    /// Drive the direction-control line.
    fn set_direction(&mut self, direction: Direction) -> Result<(), TransportError>;

    /// Send one request byte.
    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Wait at most `timeout` for one complete line.
    ///
    /// Returns `Ok(None)` when nothing arrived in time; silence is a normal
    /// outcome, not an error.
    fn try_receive_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn set_direction(&mut self, direction: Direction) -> Result<(), TransportError> {
        (**self).set_direction(direction)
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        (**self).send_byte(byte)
    }

    fn try_receive_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        (**self).try_receive_line(timeout)
    }
}

/// A transport with nothing attached: requests go nowhere, nothing is
/// ever received. Used when the serial link is unavailable so the engine
/// still runs and reports every cycle as timed out.
#[derive(Debug, Default)]
pub struct OfflineTransport {
    direction: Option<Direction>,
}

impl OfflineTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }
}

impl Transport for OfflineTransport {
    fn set_direction(&mut self, direction: Direction) -> Result<(), TransportError> {
        self.direction = Some(direction);
        Ok(())
    }

    fn send_byte(&mut self, _byte: u8) -> Result<(), TransportError> {
        Ok(())
    }

    fn try_receive_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        // Hold for the window so the loop keeps its cadence instead of spinning.
        std::thread::sleep(timeout);
        Ok(None)
    }
}
