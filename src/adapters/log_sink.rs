//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing node events to the ESP-IDF logger
//! (UART / USB-CDC).  One line per event, prefixed by a fixed tag.

use log::Level;

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;
use crate::radio::transport::Mac;

/// Adapter that logs every [`NodeEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        let (level, line) = render(event);
        log::log!(level, "{}", line);
    }
}

/// Log level and console line for one event.
pub fn render(event: &NodeEvent) -> (Level, String) {
    match event {
        NodeEvent::Woke {
            cause,
            phase,
            pulse_count,
        } => (
            Level::Info,
            format!("WAKE  | cause={cause:?} phase={phase:?} pulses={pulse_count}"),
        ),
        NodeEvent::IntegrityReset => (
            Level::Warn,
            "WAKE  | retained state invalid, reset to InitialRead".into(),
        ),
        NodeEvent::BeamRead(level) => (Level::Info, format!("BEAM  | {level:?}")),
        NodeEvent::Sent {
            peer,
            kind,
            attempt,
        } => (
            Level::Info,
            format!("SEND  | {} to {} (attempt {})", kind.label(), Mac(peer), attempt),
        ),
        NodeEvent::AttemptRejected { attempt, error } => (
            Level::Warn,
            format!("SEND  | attempt {attempt} rejected: {error}"),
        ),
        NodeEvent::SendFailed(failure) => {
            (Level::Warn, format!("SEND  | {failure}, broadcasting error"))
        }
        NodeEvent::BroadcastFailed(error) => (
            Level::Warn,
            format!("SEND  | error broadcast rejected: {error}"),
        ),
        NodeEvent::PhaseChanged { from, to, sleep } => (
            Level::Info,
            format!("PHASE | {from:?} -> {to:?} (sleep {})", sleep.name()),
        ),
        NodeEvent::PulseCount { count, max } => (Level::Info, format!("PULSE | {count}/{max}")),
    }
}
