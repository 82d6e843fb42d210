//! Mailwatch receiver: the always-on master device.
//!
//! Greets the sensor node once, then blocks on the inbox and mirrors each
//! beam reading on the red / green indicator LEDs.

use anyhow::Result;
use embedded_hal::digital::{OutputPin, PinState};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use mailwatch::adapters::device_id;
use mailwatch::adapters::espnow::EspNowTransport;
use mailwatch::adapters::log_sink::LogEventSink;
use mailwatch::config::{NodeConfig, SENSOR_MAC};
use mailwatch::radio::completion::{INBOX, SEND_COMPLETIONS};
use mailwatch::radio::transport::Peer;
use mailwatch::receiver::{self, Indicator, MailboxIndicator};

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    let mac = device_id::read_mac();
    info!("Mailwatch receiver v{} ({})", env!("CARGO_PKG_VERSION"), device_id::device_id(&mac));

    let config = NodeConfig::for_build();
    let peripherals = Peripherals::take()?;

    // Pin numbers match pins::RECEIVER_RED_LED_GPIO / RECEIVER_GREEN_LED_GPIO.
    let mut red = PinDriver::output(peripherals.pins.gpio25)?;
    let mut green = PinDriver::output(peripherals.pins.gpio26)?;
    red.set_state(PinState::Low)?;
    green.set_state(PinState::Low)?;

    let mut transport =
        EspNowTransport::new(peripherals.modem, config.channel, &SEND_COMPLETIONS, Some(&INBOX));
    let mut sink = LogEventSink::new();
    let node = Peer::new(SENSOR_MAC, config.channel);

    if let Err(e) = receiver::greet(&mut transport, &mut sink, &node, config.send_attempts)? {
        warn!("Hello not handed off: {}", e);
    }

    let mut indicator = MailboxIndicator::new();
    loop {
        let datagram = futures_lite::future::block_on(INBOX.receive());
        // Delivery reports for the hello are not needed past this point.
        while SEND_COMPLETIONS.try_receive().is_ok() {}

        if let Some(Indicator { red: r, green: g }) = receiver::handle_datagram(&mut indicator, &datagram) {
            red.set_state(r.into())?;
            green.set_state(g.into())?;
        }
    }
}
