//! Best-effort reliable send.
//!
//! Encode once, hand the frame to the radio up to `max_attempts` times in a
//! row, and stop at the first accepted hand-off.  When every attempt is
//! rejected, broadcast a single error frame so that any listener on the
//! channel learns the link is misconfigured.

use log::warn;

use super::codec::{self, LEVEL_NOT_APPLICABLE, MessageKind, StatusMessage};
use super::transport::{BROADCAST, MacAddress, Mac, Peer, Transport};
use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;
use crate::error::SendFailure;

/// Text carried by the fallback broadcast.
pub const ERROR_BROADCAST_TEXT: &str =
    "Error Broadcasted! Unicast failed. Check system configuration.";

/// Channel used for the broadcast peer when the intended peer is unknown.
const HOME_CHANNEL: u8 = 0;

/// Send `message` to `peer` with bounded immediate retry and broadcast
/// fallback.
///
/// `max_attempts == 0` skips unicast entirely.
pub fn try_send(
    transport: &mut (impl Transport + ?Sized),
    sink: &mut (impl EventSink + ?Sized),
    peer: &MacAddress,
    message: &StatusMessage,
    max_attempts: u8,
) -> Result<(), SendFailure> {
    let frame = codec::encode(message);

    for attempt in 1..=max_attempts {
        match transport.send(peer, &frame) {
            Ok(()) => {
                sink.emit(&NodeEvent::Sent {
                    peer: *peer,
                    kind: message.kind,
                    attempt,
                });
                return Ok(());
            }
            Err(error) => sink.emit(&NodeEvent::AttemptRejected { attempt, error }),
        }
    }

    let failure = SendFailure::AllAttemptsFailed {
        attempts: max_attempts,
    };
    sink.emit(&NodeEvent::SendFailed(failure));
    broadcast_error(transport, sink, peer);
    Err(failure)
}

fn broadcast_error(
    transport: &mut (impl Transport + ?Sized),
    sink: &mut (impl EventSink + ?Sized),
    intended: &MacAddress,
) {
    if transport.peer_channel(&BROADCAST).is_none() {
        let channel = transport.peer_channel(intended).unwrap_or(HOME_CHANNEL);
        if let Err(e) = transport.register_peer(&Peer::new(BROADCAST, channel)) {
            warn!("SEND: broadcast peer registration failed: {e}");
        }
    }

    let msg = StatusMessage::new(
        MessageKind::ErrorBroadcast,
        LEVEL_NOT_APPLICABLE,
        ERROR_BROADCAST_TEXT,
    );
    let frame = codec::encode(&msg);
    match transport.send(&BROADCAST, &frame) {
        Ok(()) => sink.emit(&NodeEvent::Sent {
            peer: BROADCAST,
            kind: MessageKind::ErrorBroadcast,
            attempt: 1,
        }),
        Err(e) => {
            warn!("SEND: error broadcast to {} rejected", Mac(&BROADCAST));
            sink.emit(&NodeEvent::BroadcastFailed(e));
        }
    }
}
