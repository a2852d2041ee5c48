//! Outbound engine events.
//!
//! The [`Engine`](super::engine::Engine) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log them, count them in a test, or
//! surface them on a display status line.

use chrono::NaiveDate;

use crate::error::{ParseError, PersistenceError, TransportError};
use crate::sensors::{Category, Facility};

/// Structured diagnostics emitted by the polling loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The polling loop is starting; carries the first target.
    Started { target: Facility },

    /// A frame was parsed and committed. The sequence numbers are those
    /// assigned to each category insert, if the frame carried it.
    FrameAccepted {
        facility: Facility,
        thermal: Option<u64>,
        mechanical: Option<u64>,
    },

    /// No response within the receive window.
    TransportTimeout { facility: Facility },

    /// A received line was discarded.
    FrameRejected { facility: Facility, error: ParseError },

    /// A token without a valid tag was dropped from an accepted frame.
    UntaggedToken { facility: Facility, token: String },

    /// A frame carried only some channels of a category; that category
    /// was skipped.
    IncompleteCategory { facility: Facility, category: Category },

    /// A joined row was appended to the daily log for `date`.
    RowPersisted { date: NaiveDate },

    /// The daily log could not be opened or written; the row was dropped.
    PersistenceFailure(PersistenceError),

    /// The transport failed mid-cycle.
    LinkFault { facility: Facility, error: TransportError },

    /// The serial link could not be opened; running offline.
    LinkUnavailable(TransportError),

    /// The polling loop has exited and the line is released.
    Stopped,
}
