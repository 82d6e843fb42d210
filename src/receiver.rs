//! Master-side handling of sensor-node frames.
//!
//! The receiver has no phases and never sleeps: it greets the sensor node
//! once, then decodes every datagram the receive callback posts into the
//! inbox and mirrors the last beam reading on two LEDs.
//!
//! ```text
//!   recv callback ──▶ INBOX ──▶ handle_datagram ──▶ log line
//!                                      │
//!                                      ▼
//!                           MailboxIndicator::apply ──▶ LEDs
//! ```

use core::fmt::Write;

use log::{info, warn};

use crate::app::ports::EventSink;
use crate::error::{InitError, SendFailure};
use crate::radio::codec::{FrameFields, LEVEL_NOT_APPLICABLE, MessageKind, StatusMessage, decode_fields};
use crate::radio::reliable;
use crate::radio::transport::{Datagram, Mac, Peer, Transport};
use crate::sensors::Level;

/// First message sent to the sensor node after bring-up.
pub const HELLO_TEXT: &str = "Message #1: Hello from master.";

/// Label for the kind byte: the known name, or `UNKNOWN(n)`.
pub type KindLabel = heapless::String<16>;

pub fn kind_label(raw_kind: u8) -> KindLabel {
    let mut label = KindLabel::new();
    match MessageKind::from_u8(raw_kind) {
        Some(kind) => {
            let _ = label.push_str(kind.label());
        }
        None => {
            let _ = write!(label, "UNKNOWN({raw_kind})");
        }
    }
    label
}

// ---------------------------------------------------------------------------
// Indicator LEDs
// ---------------------------------------------------------------------------

/// Desired state of the red / green LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub red: Level,
    pub green: Level,
}

impl Indicator {
    /// Beam unbroken: box empty.
    pub const EMPTY: Self = Self {
        red: Level::Low,
        green: Level::High,
    };

    /// Beam broken: mail waiting.
    pub const MAIL: Self = Self {
        red: Level::High,
        green: Level::Low,
    };

    /// Both off, before the first reading arrives.
    pub const OFF: Self = Self {
        red: Level::Low,
        green: Level::Low,
    };
}

/// Tracks what the LEDs currently show.
#[derive(Debug)]
pub struct MailboxIndicator {
    current: Indicator,
}

impl MailboxIndicator {
    pub const fn new() -> Self {
        Self {
            current: Indicator::OFF,
        }
    }

    pub const fn current(&self) -> Indicator {
        self.current
    }

    /// New LED state for `frame`, or `None` when the frame carries no beam
    /// reading.
    pub fn apply(&mut self, frame: &FrameFields<'_>) -> Option<Indicator> {
        if frame.kind() != Ok(MessageKind::SensorReading) {
            return None;
        }
        let next = if frame.beam_level == Level::High.as_u8() {
            Indicator::EMPTY
        } else {
            Indicator::MAIL
        };
        self.current = next;
        Some(next)
    }
}

impl Default for MailboxIndicator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Frame handling
// ---------------------------------------------------------------------------

/// Log one received frame and return the LED change it causes, if any.
///
/// Malformed or unknown frames are logged and otherwise ignored.
pub fn handle_datagram(indicator: &mut MailboxIndicator, datagram: &Datagram) -> Option<Indicator> {
    let sender = Mac(&datagram.source);
    let fields = match decode_fields(&datagram.bytes) {
        Ok(fields) => fields,
        Err(e) => {
            warn!("RECV  | {} from {} ({} bytes)", e, sender, datagram.bytes.len());
            return None;
        }
    };

    let label = kind_label(fields.raw_kind);
    match fields.kind() {
        Ok(MessageKind::SensorReading) => {
            let beam = if fields.beam_level == Level::High.as_u8() {
                "unbroken"
            } else {
                "broken"
            };
            info!("RECV  | {} from {}: beam {} \"{}\"", label, sender, beam, fields.text);
        }
        Ok(_) => info!("RECV  | {} from {}: \"{}\"", label, sender, fields.text),
        Err(e) => warn!("RECV  | {} from {}: {} \"{}\"", label, sender, e, fields.text),
    }

    indicator.apply(&fields)
}

/// Bring the radio up, register the sensor node and send the hello.
///
/// Bring-up errors are returned; a hello nobody hears is only logged.
pub fn greet(
    transport: &mut (impl Transport + ?Sized),
    sink: &mut (impl EventSink + ?Sized),
    node: &Peer,
    max_attempts: u8,
) -> Result<Result<(), SendFailure>, InitError> {
    transport.init()?;
    transport.register_peer(node).map_err(InitError::Peer)?;
    info!("RECV  | listening for {} on channel {}", Mac(&node.address), node.channel);

    let hello = StatusMessage::new(MessageKind::Normal, LEVEL_NOT_APPLICABLE, HELLO_TEXT);
    Ok(reliable::try_send(transport, sink, &node.address, &hello, max_attempts))
}
