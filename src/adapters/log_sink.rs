//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured engine events through
//! the `log` facade (stderr via `env_logger` in the binary). Routine
//! per-cycle outcomes go to `debug`, anything an operator should see
//! goes to `info` or `warn`.

use log::{debug, info, warn};

use crate::app::events::EngineEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`EngineEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Started { target } => {
                info!("START | first target=facility {}", target);
            }
            EngineEvent::FrameAccepted {
                facility,
                thermal,
                mechanical,
            } => {
                debug!(
                    "FRAME | facility {} accepted | thermal seq={:?} mech seq={:?}",
                    facility, thermal, mechanical
                );
            }
            EngineEvent::TransportTimeout { facility } => {
                debug!("CYCLE | facility {} timed out", facility);
            }
            EngineEvent::FrameRejected { facility, error } => {
                warn!("FRAME | facility {} rejected: {}", facility, error);
            }
            EngineEvent::UntaggedToken { facility, token } => {
                warn!("FRAME | facility {} no valid tag: {:?}", facility, token);
            }
            EngineEvent::IncompleteCategory { facility, category } => {
                warn!(
                    "FRAME | facility {} partial {:?} category skipped",
                    facility, category
                );
            }
            EngineEvent::RowPersisted { date } => {
                debug!("CSV | row appended ({})", date);
            }
            EngineEvent::PersistenceFailure(e) => {
                warn!("CSV | row dropped: {}", e);
            }
            EngineEvent::LinkFault { facility, error } => {
                warn!("CYCLE | facility {} link fault: {}", facility, error);
            }
            EngineEvent::LinkUnavailable(e) => {
                warn!("LINK | serial link unavailable ({}), running offline", e);
            }
            EngineEvent::Stopped => {
                info!("STOP | line released");
            }
        }
    }
}
