//! Unified error types for the acquisition engine.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! polling loop's error handling uniform. All variants are `Copy` so they
//! can be passed through the scheduler, the event sink and the counters
//! without allocation.
//!
//! | Failure               | Recovery                                        |
//! |-----------------------|-------------------------------------------------|
//! | `TransportTimeout`    | retry the same facility next cycle              |
//! | `Parse(..)`           | discard the line, emit a diagnostic             |
//! | `Persistence(..)`     | drop the row, keep acquiring                    |
//! | `LinkUnavailable(..)` | run on the offline transport (always timed out) |
//! | `Transport(..)`       | treat the cycle as timed out                    |

use core::fmt;
use std::io;

use crate::config::ConfigError;
use crate::sensors::Facility;

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible operation in the engine funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No response from the addressed facility within the cycle budget.
    TransportTimeout { facility: Facility },
    /// A received line could not be decoded.
    Parse(ParseError),
    /// The daily log could not be opened or written.
    Persistence(PersistenceError),
    /// The serial link could not be opened at startup.
    LinkUnavailable(TransportError),
    /// The serial link failed mid-cycle.
    Transport(TransportError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportTimeout { facility } => {
                write!(f, "no response from facility {facility}")
            }
            Self::Parse(e) => write!(f, "parse: {e}"),
            Self::Persistence(e) => write!(f, "persistence: {e}"),
            Self::LinkUnavailable(e) => write!(f, "link unavailable: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Frame parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The first token does not start with a known facility id.
    UnrecognizedFacility,
    /// A known facility answered, but not the one that was addressed.
    WrongFacility { expected: Facility, got: Facility },
    /// A tagged value did not parse as a finite number.
    MalformedValue { tag: char },
    /// The same tag appeared twice in one line.
    DuplicateTag { tag: char },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedFacility => write!(f, "unrecognized facility id"),
            Self::WrongFacility { expected, got } => {
                write!(f, "addressed facility {expected} but facility {got} answered")
            }
            Self::MalformedValue { tag } => write!(f, "malformed value for tag '{tag}'"),
            Self::DuplicateTag { tag } => write!(f, "tag '{tag}' repeated in one line"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The serial device could not be opened or configured.
    Open(io::ErrorKind),
    /// A read or write on the open device failed.
    Io(io::ErrorKind),
    /// The direction-control line could not be driven.
    DirectionPin,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(kind) => write!(f, "open failed ({kind})"),
            Self::Io(kind) => write!(f, "I/O failed ({kind})"),
            Self::DirectionPin => write!(f, "direction pin write failed"),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e.kind())
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceError {
    /// The data directory or daily file could not be created/opened.
    Open(io::ErrorKind),
    /// The header or a row could not be written.
    Write(io::ErrorKind),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(kind) => write!(f, "cannot open daily log ({kind})"),
            Self::Write(kind) => write!(f, "cannot write daily log ({kind})"),
        }
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(e: csv::Error) -> Self {
        match e.kind() {
            csv::ErrorKind::Io(io) => Self::Write(io.kind()),
            _ => Self::Write(io::ErrorKind::InvalidData),
        }
    }
}

impl From<PersistenceError> for Error {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
