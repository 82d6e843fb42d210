//! Sensor vocabulary and the transient beam read.
//!
//! The IR break-beam and its emitter are power-gated and only energised for
//! the few milliseconds of a read; continuous IR emission would dominate the
//! power budget.  The PIR module is the opposite: powered once and then held
//! through deep sleep so it can act as the edge-wake trigger.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use log::info;

use crate::app::ports::SensorPort;
use crate::pins;

// ---------------------------------------------------------------------------
// Logical pins
// ---------------------------------------------------------------------------

/// Logical sensor-node pins.  Adapters translate these into GPIO numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    IrSensorRead,
    IrSensorPower,
    IrEmitterPower,
    PirPower,
    PirRead,
}

impl Pin {
    /// Physical GPIO number from [`pins`].
    pub const fn gpio(self) -> i32 {
        match self {
            Self::IrSensorRead => pins::IR_SENSOR_READ_GPIO,
            Self::IrSensorPower => pins::IR_SENSOR_POWER_GPIO,
            Self::IrEmitterPower => pins::IR_EMITTER_POWER_GPIO,
            Self::PirPower => pins::PIR_POWER_GPIO,
            Self::PirRead => pins::PIR_READ_GPIO,
        }
    }

    /// Pins that live in the RTC domain and need rtc_gpio handling.
    pub const fn is_rtc(self) -> bool {
        matches!(self, Self::PirPower | Self::PirRead)
    }
}

// ---------------------------------------------------------------------------
// Digital level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Wire representation used in status messages (0 / 1).
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl From<Level> for PinState {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => PinState::Low,
            Level::High => PinState::High,
        }
    }
}

impl From<PinState> for Level {
    fn from(state: PinState) -> Self {
        match state {
            PinState::Low => Self::Low,
            PinState::High => Self::High,
        }
    }
}

// ---------------------------------------------------------------------------
// Beam read
// ---------------------------------------------------------------------------

/// Power the IR pair, let the receiver settle, sample, and power it down.
///
/// HIGH means the beam reaches the receiver (mailbox empty); LOW means
/// something is blocking it (mail present).
pub fn read_beam(
    ports: &mut (impl SensorPort + ?Sized),
    delay: &mut (impl DelayNs + ?Sized),
    settle_ms: u32,
) -> Level {
    ports.set_power(Pin::IrSensorPower, true);
    ports.set_power(Pin::IrEmitterPower, true);
    delay.delay_ms(settle_ms);

    let level = ports.read_digital(Pin::IrSensorRead);

    ports.set_power(Pin::IrEmitterPower, false);
    ports.set_power(Pin::IrSensorPower, false);
    info!("Beam read: {:?}", level);
    level
}
