//! Serial-port transport adapter.
//!
//! Implements [`Transport`] over a `serialport` device shared with both
//! facility controllers, plus an [`OutputPin`] that drives the RS-485
//! transceiver's direction input (high = transmit).
//!
//! Receive semantics:
//! - the input buffer is cleared before every request byte, so a late
//!   reply to an earlier cycle can never be attributed to this one;
//! - a line ends at `\n` (a trailing `\r` is stripped);
//! - bytes of an unterminated line still pending when the window closes
//!   are discarded;
//! - blank lines are skipped;
//! - a line longer than [`MAX_LINE`] is noise and is dropped whole, up to
//!   and including its `\n`.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};
use serialport::{ClearBuffer, SerialPort};

use crate::config::EngineConfig;
use crate::error::TransportError;
use crate::protocol::transport::{Direction, Transport};

/// Longest line accepted before the buffer is considered noise.
const MAX_LINE: usize = 256;

/// Shortest read timeout handed to the driver.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

fn open_error(e: serialport::Error) -> TransportError {
    TransportError::Open(io::Error::from(e).kind())
}

// ───────────────────────────────────────────────────────────────
// Line assembly
// ───────────────────────────────────────────────────────────────

/// Reassembles `\n`-terminated lines from arbitrary read chunks.
#[derive(Debug, Default)]
struct LineAssembler {
    line: Vec<u8>,
    /// Set on overflow; everything up to the next `\n` is dropped.
    discarding: bool,
    /// Lines completed by an earlier chunk, oldest first.
    ready: VecDeque<String>,
}

impl LineAssembler {
    fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                if self.discarding {
                    self.discarding = false;
                    self.line.clear();
                } else if let Some(line) = self.take_line() {
                    self.ready.push_back(line);
                }
            } else if self.discarding {
                // Rest of an oversized line.
            } else if self.line.len() < MAX_LINE {
                self.line.push(byte);
            } else {
                warn!("Serial: line exceeds {} bytes, dropping it", MAX_LINE);
                self.line.clear();
                self.discarding = true;
            }
        }
    }

    fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// Drop the unterminated tail when the receive window closes.
    fn expire(&mut self) {
        if !self.line.is_empty() {
            debug!("Serial: discarding {} bytes of partial line", self.line.len());
        }
        self.line.clear();
        self.discarding = false;
    }

    fn reset(&mut self) {
        self.expire();
        self.ready.clear();
    }

    /// Take the completed line out of the buffer, if it is not blank.
    fn take_line(&mut self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.line).trim().to_string();
        self.line.clear();
        (!text.is_empty()).then_some(text)
    }
}

// ───────────────────────────────────────────────────────────────
// Transport
// ───────────────────────────────────────────────────────────────

/// Half-duplex serial line with an explicit direction pin.
pub struct SerialTransport<P: OutputPin> {
    port: Box<dyn SerialPort>,
    direction: P,
    lines: LineAssembler,
}

impl<P: OutputPin> SerialTransport<P> {
    /// Open `config.serial_port` (8N1) and park the line in receive mode.
    pub fn open(config: &EngineConfig, direction: P) -> Result<Self, TransportError> {
        let port = serialport::new(&config.serial_port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(Duration::from_millis(u64::from(config.cycle_budget_ms)))
            .open()
            .map_err(open_error)?;

        let mut transport = Self {
            port,
            direction,
            lines: LineAssembler::default(),
        };
        transport.set_direction(Direction::Receive)?;
        info!(
            "Serial: opened {} at {} baud",
            config.serial_port, config.baud_rate
        );
        Ok(transport)
    }
}

impl<P: OutputPin> Transport for SerialTransport<P> {
    fn set_direction(&mut self, direction: Direction) -> Result<(), TransportError> {
        let result = match direction {
            Direction::Transmit => self.direction.set_high(),
            Direction::Receive => self.direction.set_low(),
        };
        result.map_err(|_| TransportError::DirectionPin)
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        if let Err(e) = self.port.clear(ClearBuffer::Input) {
            debug!("Serial: input clear failed: {}", e);
        }
        self.lines.reset();
        self.port.write_all(&[byte])?;
        self.port.flush()?;
        Ok(())
    }

    fn try_receive_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 64];

        loop {
            if let Some(line) = self.lines.next_line() {
                return Ok(Some(line));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.lines.expire();
                return Ok(None);
            }

            self.port
                .set_timeout(remaining.max(MIN_READ_TIMEOUT))
                .map_err(|e| TransportError::Io(io::Error::from(e).kind()))?;

            match self.port.read(&mut chunk) {
                Ok(n) => self.lines.feed(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<P: OutputPin> Drop for SerialTransport<P> {
    fn drop(&mut self) {
        // Never leave the transceiver driving the bus.
        let _ = self.direction.set_low();
    }
}
