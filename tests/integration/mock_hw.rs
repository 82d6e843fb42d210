//! Test rig built from the crate's simulation adapters.
//!
//! The GPIO, retained-memory and ESP-NOW adapters all have host backends;
//! the rig wires them into `NodePorts` and records every event the node
//! emits.

use embedded_hal::delay::DelayNs;

use mailwatch::adapters::espnow::EspNowTransport;
use mailwatch::adapters::gpio::GpioSensorAdapter;
use mailwatch::adapters::retained::RtcRetainedStore;
use mailwatch::app::events::NodeEvent;
use mailwatch::app::ports::EventSink;
use mailwatch::app::service::{NodePorts, SensorNode, WakeOutcome};
use mailwatch::config::NodeConfig;
use mailwatch::fsm::RetainedState;
use mailwatch::power::WakeCause;
use mailwatch::radio::codec::{self, StatusMessage};
use mailwatch::radio::completion::CompletionChannel;
use mailwatch::radio::transport::MacAddress;

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<NodeEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&NodeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.events.push(event.clone());
    }
}

// ── Delay ─────────────────────────────────────────────────────

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Rig ───────────────────────────────────────────────────────

pub fn test_config() -> NodeConfig {
    NodeConfig {
        handoff_wait_ms: 50,
        ..NodeConfig::bench()
    }
}

pub struct Rig {
    pub store: RtcRetainedStore,
    pub gpio: GpioSensorAdapter,
    pub radio: EspNowTransport,
    pub delay: NoDelay,
    pub sink: RecordingSink,
    pub completions: &'static CompletionChannel,
}

#[allow(dead_code)]
impl Rig {
    /// Fresh board with garbage in RTC memory.
    pub fn cold_boot() -> Self {
        Self::with_store(RtcRetainedStore::new())
    }

    /// Board waking from deep sleep with `state` retained.
    pub fn resumed(state: RetainedState) -> Self {
        Self::with_store(RtcRetainedStore::with_state(state))
    }

    fn with_store(store: RtcRetainedStore) -> Self {
        let completions: &'static CompletionChannel = Box::leak(Box::new(CompletionChannel::new()));
        Self {
            store,
            gpio: GpioSensorAdapter::new(),
            radio: EspNowTransport::new(test_config().channel, completions, None),
            delay: NoDelay,
            sink: RecordingSink::default(),
            completions,
        }
    }

    pub fn ports(&mut self) -> NodePorts<'_> {
        NodePorts {
            store: &mut self.store,
            sensors: &mut self.gpio,
            transport: &mut self.radio,
            delay: &mut self.delay,
            sink: &mut self.sink,
        }
    }

    /// One wake cycle up to (not including) the suspend.
    pub fn cycle(&mut self, node: &SensorNode, cause: WakeCause) -> WakeOutcome {
        let completions = self.completions;
        let mut ports = self.ports();
        let outcome = node
            .run_wake_cycle(cause, &mut ports)
            .expect("simulated radio never fails bring-up");
        node.settle_radio(&outcome, &mut *ports.transport, completions);
        outcome
    }

    /// Frames the radio accepted, decoded.
    pub fn sent_messages(&self) -> Vec<(MacAddress, StatusMessage)> {
        self.radio
            .sent()
            .iter()
            .map(|(dest, bytes)| (*dest, codec::decode(bytes).expect("node sends valid frames")))
            .collect()
    }
}
