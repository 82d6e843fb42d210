//! Connectionless datagram transport (ESP-NOW) as a port.
//!
//! The domain only ever hands a frame to the radio; whether it was
//! acknowledged over the air arrives later through
//! [`completion`](super::completion).

use core::fmt;

use heapless::Vec;

use crate::error::{HandoffError, InitError, TransportError};

/// 6-byte hardware address.
pub type MacAddress = [u8; 6];

/// Link-layer broadcast address.
pub const BROADCAST: MacAddress = [0xFF; 6];

/// ESP-NOW payload limit.
pub const MAX_DATAGRAM_LEN: usize = 250;

/// Peer-table entry.  Channel 0 means "the radio's current channel".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub address: MacAddress,
    pub channel: u8,
}

impl Peer {
    pub const fn new(address: MacAddress, channel: u8) -> Self {
        Self { address, channel }
    }
}

/// A frame received from `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub source: MacAddress,
    pub bytes: Vec<u8, MAX_DATAGRAM_LEN>,
}

impl Datagram {
    /// Copy `bytes` into a datagram, dropping anything past
    /// [`MAX_DATAGRAM_LEN`].
    pub fn new(source: MacAddress, bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_DATAGRAM_LEN);
        let mut buf = Vec::new();
        let _ = buf.extend_from_slice(&bytes[..len]);
        Self { source, bytes: buf }
    }
}

/// Radio capability used by the sensor node and the receiver.
pub trait Transport {
    /// Bring the radio up.  Idempotent.
    fn init(&mut self) -> Result<(), InitError>;

    /// Add `peer` to the peer table.  Re-registering an existing address
    /// is not an error.
    fn register_peer(&mut self, peer: &Peer) -> Result<(), TransportError>;

    /// Channel of a registered peer.
    fn peer_channel(&self, address: &MacAddress) -> Option<u8>;

    /// Hand one frame to the radio.  `Ok` means the driver accepted it,
    /// not that it was delivered.
    fn send(&mut self, dest: &MacAddress, frame: &[u8]) -> Result<(), HandoffError>;

    /// Tear the radio down before sleeping.
    fn shutdown(&mut self);
}

/// `AA:BB:CC:DD:EE:FF` formatter for log lines.
pub struct Mac<'a>(pub &'a MacAddress);

impl fmt::Display for Mac<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_formats_uppercase_colon_separated() {
        let mac = [0x88, 0x13, 0xbf, 0x0b, 0xe1, 0x50];
        assert_eq!(Mac(&mac).to_string(), "88:13:BF:0B:E1:50");
        assert_eq!(Mac(&BROADCAST).to_string(), "FF:FF:FF:FF:FF:FF");
    }

    #[test]
    fn datagram_caps_payload() {
        let big = [7u8; 300];
        let d = Datagram::new(BROADCAST, &big);
        assert_eq!(d.bytes.len(), MAX_DATAGRAM_LEN);
    }
}
