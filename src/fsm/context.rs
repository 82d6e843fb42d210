//! Per-wake context threaded through every phase handler.
//!
//! `WakeContext` borrows the ports for the duration of one wake cycle and
//! carries the pulse counter in and out.  It also tracks two facts the
//! service needs afterwards: whether the radio was brought up, and how many
//! frames were handed to it (the hand-off gate waits for that many
//! completions before the radio is torn down).

use embedded_hal::delay::DelayNs;

use crate::app::events::NodeEvent;
use crate::app::ports::{EventSink, SensorPort};
use crate::config::NodeConfig;
use crate::error::{HandoffError, InitError, SendFailure, TransportError};
use crate::radio::codec::StatusMessage;
use crate::radio::reliable;
use crate::radio::transport::{MacAddress, Peer, Transport};
use crate::sensors::{self, Level};

pub struct WakeContext<'a> {
    pub sensors: &'a mut dyn SensorPort,
    pub transport: &'a mut dyn Transport,
    pub delay: &'a mut dyn DelayNs,
    pub sink: &'a mut dyn EventSink,
    pub config: &'a NodeConfig,

    /// Consecutive "still blocked" beam reads since motion was detected.
    pub pulse_counter: u8,

    radio_up: bool,
    handoffs: u8,
}

impl<'a> WakeContext<'a> {
    pub fn new(
        sensors: &'a mut dyn SensorPort,
        transport: &'a mut dyn Transport,
        delay: &'a mut dyn DelayNs,
        sink: &'a mut dyn EventSink,
        config: &'a NodeConfig,
        pulse_counter: u8,
    ) -> Self {
        Self {
            sensors,
            transport,
            delay,
            sink,
            config,
            pulse_counter,
            radio_up: false,
            handoffs: 0,
        }
    }

    /// Power the beam, sample it and power it back down.
    pub fn read_beam(&mut self) -> Level {
        let level = sensors::read_beam(
            &mut *self.sensors,
            &mut *self.delay,
            self.config.beam_settle_ms,
        );
        self.sink.emit(&NodeEvent::BeamRead(level));
        level
    }

    /// Bring the radio up and register the configured peer.  Only cycles
    /// that actually send pay for WiFi start-up.
    pub fn bring_radio_up(&mut self) -> Result<(), InitError> {
        if self.radio_up {
            return Ok(());
        }
        self.transport.init()?;
        self.transport
            .register_peer(&Peer::new(self.config.peer_mac, self.config.channel))
            .map_err(InitError::Peer)?;
        self.radio_up = true;
        Ok(())
    }

    /// Reliable send to the configured peer.
    pub fn send_reliably(&mut self, message: &StatusMessage) -> Result<(), SendFailure> {
        let mut counted = CountingTransport {
            inner: &mut *self.transport,
            accepted: 0,
        };
        let result = reliable::try_send(
            &mut counted,
            &mut *self.sink,
            &self.config.peer_mac,
            message,
            self.config.send_attempts,
        );
        self.handoffs = self.handoffs.saturating_add(counted.accepted);
        result
    }

    pub fn radio_up(&self) -> bool {
        self.radio_up
    }

    /// Frames accepted by the radio this cycle.
    pub fn handoffs(&self) -> u8 {
        self.handoffs
    }
}

/// Counts accepted hand-offs so the wake cycle knows how many completions
/// to wait for.
struct CountingTransport<'t> {
    inner: &'t mut dyn Transport,
    accepted: u8,
}

impl Transport for CountingTransport<'_> {
    fn init(&mut self) -> Result<(), InitError> {
        self.inner.init()
    }

    fn register_peer(&mut self, peer: &Peer) -> Result<(), TransportError> {
        self.inner.register_peer(peer)
    }

    fn peer_channel(&self, address: &MacAddress) -> Option<u8> {
        self.inner.peer_channel(address)
    }

    fn send(&mut self, dest: &MacAddress, frame: &[u8]) -> Result<(), HandoffError> {
        self.inner.send(dest, frame)?;
        self.accepted = self.accepted.saturating_add(1);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.inner.shutdown();
    }
}
