//! Mailwatch sensor node: main entry point.
//!
//! One boot is one wake cycle.  Nothing loops here: the node restores its
//! phase from RTC memory, runs that phase's handler, stores the next phase
//! and goes back to deep sleep.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioSensorAdapter  RtcRetainedStore  EspNowTransport          │
//! │  (SensorPort)       (PhaseStore)      (Transport)              │
//! │  LogEventSink       DeepSleep         FreeRtos delay           │
//! │  (EventSink)        (SleepPlatform)   (DelayNs)                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              SensorNode (pure logic)                   │    │
//! │  │  PhaseMachine · reliable send · hand-off gate          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SleepScheduler (one wakeup source, then deep sleep)           │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use log::info;

use mailwatch::adapters::deep_sleep::DeepSleep;
use mailwatch::adapters::device_id;
use mailwatch::adapters::espnow::EspNowTransport;
use mailwatch::adapters::gpio::GpioSensorAdapter;
use mailwatch::adapters::log_sink::LogEventSink;
use mailwatch::adapters::retained::RtcRetainedStore;
use mailwatch::app::service::{NodePorts, SensorNode};
use mailwatch::config::NodeConfig;
use mailwatch::power::SleepScheduler;
use mailwatch::radio::completion::SEND_COMPLETIONS;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    let mac = device_id::read_mac();
    info!("╔══════════════════════════════════════╗");
    info!("║  Mailwatch node v{}               ║", env!("CARGO_PKG_VERSION"));
    info!("║  {}                           ║", device_id::device_id(&mac));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = NodeConfig::for_build();
    config.validate()?;

    // ── 3. Adapters ───────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let mut store = RtcRetainedStore::new();
    let mut sensors = GpioSensorAdapter::new();
    let mut transport =
        EspNowTransport::new(peripherals.modem, config.channel, &SEND_COMPLETIONS, None);
    let mut delay = FreeRtos;
    let mut sink = LogEventSink::new();
    let mut scheduler = SleepScheduler::new(DeepSleep::new());

    let mut ports = NodePorts {
        store: &mut store,
        sensors: &mut sensors,
        transport: &mut transport,
        delay: &mut delay,
        sink: &mut sink,
    };

    // ── 4. One wake cycle, then deep sleep ────────────────────
    let node = SensorNode::new(config);
    let Err(e) = node.run_to_sleep(&mut scheduler, &mut ports, &SEND_COMPLETIONS);
    node.sleep_after_bring_up_failure(&mut scheduler, e)
}
