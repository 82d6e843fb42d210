//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PhaseMachine / SensorNode (domain)
//! ```
//!
//! Driven adapters (GPIO, retained memory, log output) implement these
//! traits.  The radio boundary lives next to its codec in
//! [`radio::transport`](crate::radio::transport) and the sleep boundary in
//! [`power`](crate::power).

use crate::fsm::RetainedState;
use crate::sensors::{Level, Pin};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: GPIO ↔ domain)
// ───────────────────────────────────────────────────────────────

/// GPIO-level access to the beam and PIR hardware.
///
/// Implementations configure pins lazily: nothing is driven until the
/// domain asks for it, and [`release`](Self::release) returns a pin to its
/// disabled, low-leakage configuration.
pub trait SensorPort {
    /// Sample a digital input.
    fn read_digital(&mut self, pin: Pin) -> Level;

    /// Switch a power-gating transistor.  RTC-domain pins are latched so the
    /// level survives deep sleep.
    fn set_power(&mut self, pin: Pin, on: bool);

    /// Prepare `pin` as an input that can wake the chip at `level`.
    /// The wakeup source itself is armed by the sleep scheduler.
    fn configure_edge_wake(&mut self, pin: Pin, level: Level);

    /// Unlatch and disable a pin.
    fn release(&mut self, pin: Pin);
}

// ───────────────────────────────────────────────────────────────
// Retained-state port (driven adapter: RTC memory ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Memory that keeps its value across deep sleep and soft reset, but not
/// across a full power loss.
///
/// `load` returns whatever bytes are there; validation is the state
/// machine's job.  `store` must be complete when it returns.
pub trait PhaseStore {
    fn load(&mut self) -> RetainedState;
    fn store(&mut self, state: &RetainedState);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::NodeEvent);
}
