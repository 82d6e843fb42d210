//! ESP-NOW adapter: implements [`Transport`].
//!
//! Bring-up is lazy: constructing the adapter costs nothing, [`init`]
//! starts NVS, WiFi (station mode, fixed channel) and ESP-NOW.  Wake
//! cycles that do not send never pay for the radio.
//!
//! Driver callbacks run on the WiFi task.  They only ever `try_send` into
//! the static channels in [`radio::completion`](crate::radio::completion):
//! send results into the completion channel, received frames into the
//! inbox (receiver only).
//!
//! [`init`]: Transport::init

use heapless::Vec;
use log::{debug, info, warn};

use crate::error::{HandoffError, InitError, TransportError};
use crate::radio::completion::{CompletionChannel, InboxChannel, SendCompletion, post_completion};
use crate::radio::transport::{Datagram, MAX_DATAGRAM_LEN, Mac, MacAddress, Peer, Transport};

#[cfg(target_os = "espidf")]
use esp_idf_hal::modem::Modem;
#[cfg(target_os = "espidf")]
use esp_idf_svc::espnow::{EspNow, PeerInfo, SendStatus};
#[cfg(target_os = "espidf")]
use esp_idf_svc::eventloop::EspSystemEventLoop;
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    esp, esp_wifi_set_channel, wifi_interface_t_WIFI_IF_STA, wifi_second_chan_t_WIFI_SECOND_CHAN_NONE,
};
#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};

/// ESP-NOW allows 20 unencrypted peers; we need the configured peer plus
/// the broadcast entry.
const MAX_PEERS: usize = 4;

#[cfg(any(target_os = "espidf", test))]
fn copy_mac(raw: &[u8]) -> MacAddress {
    let mut mac = [0u8; 6];
    let n = raw.len().min(6);
    mac[..n].copy_from_slice(&raw[..n]);
    mac
}

fn remember(peers: &mut Vec<Peer, MAX_PEERS>, peer: &Peer) -> Result<(), TransportError> {
    if peers.iter().any(|p| p.address == peer.address) {
        return Ok(());
    }
    peers.push(*peer).map_err(|_| TransportError::PeerTableFull)
}

fn post_datagram(inbox: Option<&InboxChannel>, source: MacAddress, data: &[u8]) {
    match inbox {
        Some(inbox) => {
            if inbox.try_send(Datagram::new(source, data)).is_err() {
                warn!("ESPNOW: inbox full, dropping frame from {}", Mac(&source));
            }
        }
        None => debug!("ESPNOW: {} bytes from {} ignored", data.len(), Mac(&source)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ESP-IDF backend
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
pub struct EspNowTransport {
    modem: Option<Modem>,
    channel: u8,
    completions: &'static CompletionChannel,
    inbox: Option<&'static InboxChannel>,
    wifi: Option<EspWifi<'static>>,
    espnow: Option<EspNow<'static>>,
    peers: Vec<Peer, MAX_PEERS>,
}

#[cfg(target_os = "espidf")]
impl EspNowTransport {
    pub fn new(
        modem: Modem,
        channel: u8,
        completions: &'static CompletionChannel,
        inbox: Option<&'static InboxChannel>,
    ) -> Self {
        Self {
            modem: Some(modem),
            channel,
            completions,
            inbox,
            wifi: None,
            espnow: None,
            peers: Vec::new(),
        }
    }

    fn start_wifi(&mut self) -> Result<EspWifi<'static>, InitError> {
        let nvs = EspDefaultNvsPartition::take().map_err(|e| InitError::Storage(e.code()))?;
        let sysloop = EspSystemEventLoop::take().map_err(|e| InitError::Wifi(e.code()))?;
        // Shutdown drops the driver but the modem is gone for this boot.
        let modem = self.modem.take().ok_or(InitError::Wifi(-1))?;

        let mut wifi =
            EspWifi::new(modem, sysloop, Some(nvs)).map_err(|e| InitError::Wifi(e.code()))?;
        wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .map_err(|e| InitError::Wifi(e.code()))?;
        wifi.start().map_err(|e| InitError::Wifi(e.code()))?;

        // SAFETY: WiFi driver is started; plain channel select.
        esp!(unsafe { esp_wifi_set_channel(self.channel, wifi_second_chan_t_WIFI_SECOND_CHAN_NONE) })
            .map_err(|e| InitError::Wifi(e.code()))?;
        info!("ESPNOW: WiFi STA up on channel {}", self.channel);
        Ok(wifi)
    }
}

#[cfg(target_os = "espidf")]
impl Transport for EspNowTransport {
    fn init(&mut self) -> Result<(), InitError> {
        if self.espnow.is_some() {
            return Ok(());
        }
        let wifi = self.start_wifi()?;
        let espnow = EspNow::take().map_err(|e| InitError::EspNow(e.code()))?;

        let completions = self.completions;
        espnow
            .register_send_cb(move |mac: &[u8], status: SendStatus| {
                post_completion(
                    completions,
                    SendCompletion {
                        peer: copy_mac(mac),
                        delivered: matches!(status, SendStatus::SUCCESS),
                    },
                );
            })
            .map_err(|e| InitError::Callback(e.code()))?;

        let inbox = self.inbox;
        espnow
            .register_recv_cb(move |info, data: &[u8]| {
                post_datagram(inbox, copy_mac(&info.src_addr[..]), data);
            })
            .map_err(|e| InitError::Callback(e.code()))?;

        self.wifi = Some(wifi);
        self.espnow = Some(espnow);
        info!("ESPNOW: initialised");
        Ok(())
    }

    fn register_peer(&mut self, peer: &Peer) -> Result<(), TransportError> {
        let espnow = self.espnow.as_ref().ok_or(TransportError::NotInitialized)?;
        if self.peers.iter().any(|p| p.address == peer.address) {
            return Ok(());
        }
        if peer.channel > 14 {
            return Err(TransportError::InvalidChannel(peer.channel));
        }
        if self.peers.is_full() {
            return Err(TransportError::PeerTableFull);
        }
        espnow
            .add_peer(PeerInfo {
                peer_addr: peer.address,
                channel: peer.channel,
                ifidx: wifi_interface_t_WIFI_IF_STA,
                encrypt: false,
                ..Default::default()
            })
            .map_err(|e| TransportError::Radio(e.code()))?;
        remember(&mut self.peers, peer)?;
        info!("ESPNOW: peer {} on channel {}", Mac(&peer.address), peer.channel);
        Ok(())
    }

    fn peer_channel(&self, address: &MacAddress) -> Option<u8> {
        self.peers.iter().find(|p| p.address == *address).map(|p| p.channel)
    }

    fn send(&mut self, dest: &MacAddress, frame: &[u8]) -> Result<(), HandoffError> {
        let espnow = self.espnow.as_ref().ok_or(HandoffError::NotInitialized)?;
        if frame.len() > MAX_DATAGRAM_LEN {
            return Err(HandoffError::FrameTooLarge);
        }
        if self.peer_channel(dest).is_none() {
            return Err(HandoffError::UnknownPeer);
        }
        espnow
            .send(*dest, frame)
            .map_err(|e| HandoffError::Radio(e.code()))
    }

    fn shutdown(&mut self) {
        // EspNow deinitialises on drop; it must go before the WiFi driver.
        self.espnow = None;
        if let Some(mut wifi) = self.wifi.take() {
            if let Err(e) = wifi.stop() {
                warn!("ESPNOW: wifi stop failed: {}", e);
            }
        }
        self.peers.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Simulation backend
// ═══════════════════════════════════════════════════════════════════════════

/// Host stand-in.  Accepted frames are recorded and, like the real driver,
/// produce a completion report; rejections can be scripted.
#[cfg(not(target_os = "espidf"))]
pub struct EspNowTransport {
    channel: u8,
    completions: &'static CompletionChannel,
    inbox: Option<&'static InboxChannel>,
    up: bool,
    peers: Vec<Peer, MAX_PEERS>,
    reject_next: usize,
    delivered: bool,
    sent: std::vec::Vec<(MacAddress, std::vec::Vec<u8>)>,
}

#[cfg(not(target_os = "espidf"))]
impl EspNowTransport {
    pub fn new(
        channel: u8,
        completions: &'static CompletionChannel,
        inbox: Option<&'static InboxChannel>,
    ) -> Self {
        Self {
            channel,
            completions,
            inbox,
            up: false,
            peers: Vec::new(),
            reject_next: 0,
            delivered: true,
            sent: std::vec::Vec::new(),
        }
    }

    /// Reject the next `n` hand-offs.
    pub fn reject_next(&mut self, n: usize) {
        self.reject_next = n;
    }

    /// Whether accepted frames report over-the-air success.
    pub fn set_delivered(&mut self, delivered: bool) {
        self.delivered = delivered;
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn sent(&self) -> &[(MacAddress, std::vec::Vec<u8>)] {
        &self.sent
    }

    /// Feed a frame as if it had arrived over the air.
    pub fn inject(&self, source: MacAddress, data: &[u8]) {
        post_datagram(self.inbox, source, data);
    }
}

#[cfg(not(target_os = "espidf"))]
impl Transport for EspNowTransport {
    fn init(&mut self) -> Result<(), InitError> {
        if !self.up {
            info!("ESPNOW(sim): up on channel {}", self.channel);
        }
        self.up = true;
        Ok(())
    }

    fn register_peer(&mut self, peer: &Peer) -> Result<(), TransportError> {
        if !self.up {
            return Err(TransportError::NotInitialized);
        }
        if peer.channel > 14 {
            return Err(TransportError::InvalidChannel(peer.channel));
        }
        remember(&mut self.peers, peer)
    }

    fn peer_channel(&self, address: &MacAddress) -> Option<u8> {
        self.peers.iter().find(|p| p.address == *address).map(|p| p.channel)
    }

    fn send(&mut self, dest: &MacAddress, frame: &[u8]) -> Result<(), HandoffError> {
        if !self.up {
            return Err(HandoffError::NotInitialized);
        }
        if frame.len() > MAX_DATAGRAM_LEN {
            return Err(HandoffError::FrameTooLarge);
        }
        if self.peer_channel(dest).is_none() {
            return Err(HandoffError::UnknownPeer);
        }
        if self.reject_next > 0 {
            self.reject_next -= 1;
            return Err(HandoffError::Radio(0x306A));
        }
        self.sent.push((*dest, frame.to_vec()));
        post_completion(
            self.completions,
            SendCompletion {
                peer: *dest,
                delivered: self.delivered,
            },
        );
        Ok(())
    }

    fn shutdown(&mut self) {
        self.up = false;
        self.peers.clear();
    }
}
