//! Outbound node events.
//!
//! The phase machine and the reliable sender emit these through the
//! [`EventSink`](super::ports::EventSink) port.  The log adapter renders
//! them to the serial console; tests record them.

use crate::error::{HandoffError, SendFailure};
use crate::fsm::Phase;
use crate::power::{SleepMode, WakeCause};
use crate::radio::codec::MessageKind;
use crate::radio::transport::MacAddress;
use crate::sensors::Level;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// Woke up; carries the wake cause and the phase about to run.
    Woke { cause: WakeCause, phase: Phase, pulse_count: u8 },

    /// Retained state failed the integrity check and was reset.
    IntegrityReset,

    /// Beam sampled.
    BeamRead(Level),

    /// A status frame was accepted by the radio.
    Sent { peer: MacAddress, kind: MessageKind, attempt: u8 },

    /// One hand-off attempt was rejected.
    AttemptRejected { attempt: u8, error: HandoffError },

    /// All unicast attempts failed; error broadcast issued.
    SendFailed(SendFailure),

    /// The error broadcast itself was rejected.
    BroadcastFailed(HandoffError),

    /// Phase transition decided for the next wake.
    PhaseChanged { from: Phase, to: Phase, sleep: SleepMode },

    /// Beam-pulse debounce progress.
    PulseCount { count: u8, max: u8 },
}
