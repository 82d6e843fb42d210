//! Node configuration
//!
//! Every tunable of the sensor node.  Two schedules are provided: the field
//! schedule ([`NodeConfig::release`]) and a bench schedule with short
//! sleeps for testing on the desk ([`NodeConfig::bench`]).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;
use crate::power::{SleepMode, SleepRequest};
use crate::radio::transport::MacAddress;
use crate::sensors::Level;

/// Receiver (master) station MAC.
pub const MASTER_MAC: MacAddress = [0x88, 0x13, 0xbf, 0x0b, 0xe1, 0x50];

/// Sensor node station MAC, registered as the receiver's only peer.
pub const SENSOR_MAC: MacAddress = [0x88, 0x13, 0xbf, 0x0d, 0x82, 0xec];

/// WiFi channel shared by both devices.
pub const WIFI_CHANNEL: u8 = 6;

const SECOND_US: u64 = 1_000_000;

/// Sensor node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Link ---
    /// Where status reports go.
    pub peer_mac: MacAddress,
    /// WiFi channel (1-13).
    pub channel: u8,
    /// Unicast hand-off attempts before the error broadcast.
    pub send_attempts: u8,
    /// Upper bound on waiting for send completions before sleeping (ms).
    pub handoff_wait_ms: u32,

    // --- Beam ---
    /// IR receiver settle time after power-up (ms).
    pub beam_settle_ms: u32,
    /// Consecutive "still blocked" pulses before giving up on a retrieval.
    pub pulse_count_max: u8,

    // --- Sleep durations (us) ---
    pub idle_sleep_us: u64,
    pub pir_startup_us: u64,
    pub pir_calibration_us: u64,
    pub beam_pulse_us: u64,
}

impl NodeConfig {
    /// Field schedule: beam polled twice a day.
    pub const fn release() -> Self {
        Self {
            peer_mac: MASTER_MAC,
            channel: WIFI_CHANNEL,
            send_attempts: 4,
            handoff_wait_ms: 200,

            beam_settle_ms: 5,
            pulse_count_max: 3,

            idle_sleep_us: 12 * 60 * 60 * SECOND_US, // 12 h
            pir_startup_us: 60 * SECOND_US,
            pir_calibration_us: 60 * SECOND_US,
            beam_pulse_us: 30 * SECOND_US,
        }
    }

    /// Bench schedule.  PIR start-up stays at 60 s; the module needs it.
    pub const fn bench() -> Self {
        Self {
            idle_sleep_us: 5 * SECOND_US,
            pir_calibration_us: 5 * SECOND_US,
            beam_pulse_us: 5 * SECOND_US,
            ..Self::release()
        }
    }

    /// Schedule chosen at build time by the `bench-timings` feature.
    pub const fn for_build() -> Self {
        if cfg!(feature = "bench-timings") {
            Self::bench()
        } else {
            Self::release()
        }
    }

    /// Wakeup source for `mode`.
    pub const fn sleep_request(&self, mode: SleepMode) -> SleepRequest {
        match mode {
            SleepMode::Idle => SleepRequest::Timer {
                micros: self.idle_sleep_us,
            },
            SleepMode::PirStartUp => SleepRequest::Timer {
                micros: self.pir_startup_us,
            },
            SleepMode::PirCalibration => SleepRequest::Timer {
                micros: self.pir_calibration_us,
            },
            SleepMode::AwaitMotion => SleepRequest::EdgeOnPin {
                gpio: pins::PIR_READ_GPIO,
                level: Level::High,
            },
            SleepMode::BeamPulse => SleepRequest::Timer {
                micros: self.beam_pulse_us,
            },
        }
    }

    /// Wakeup source after a failed radio bring-up: the short beam-pulse
    /// interval, so the kept phase is retried soon.
    pub const fn bring_up_retry_request(&self) -> SleepRequest {
        SleepRequest::Timer {
            micros: self.beam_pulse_us,
        }
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=13).contains(&self.channel) {
            return Err(ConfigError::ValidationFailed("channel must be 1–13"));
        }
        if self.peer_mac == [0xFF; 6] || self.peer_mac == [0; 6] {
            return Err(ConfigError::ValidationFailed(
                "peer_mac must be a unicast address",
            ));
        }
        if self.send_attempts > 16 {
            return Err(ConfigError::ValidationFailed("send_attempts must be 0–16"));
        }
        if !(10..=5000).contains(&self.handoff_wait_ms) {
            return Err(ConfigError::ValidationFailed(
                "handoff_wait_ms must be 10–5000",
            ));
        }
        if !(1..=100).contains(&self.beam_settle_ms) {
            return Err(ConfigError::ValidationFailed("beam_settle_ms must be 1–100"));
        }
        if self.pulse_count_max == 0 {
            return Err(ConfigError::ValidationFailed("pulse_count_max must be ≥ 1"));
        }
        for us in [
            self.idle_sleep_us,
            self.pir_startup_us,
            self.pir_calibration_us,
            self.beam_pulse_us,
        ] {
            if us < SECOND_US {
                return Err(ConfigError::ValidationFailed(
                    "sleep durations must be at least 1 s",
                ));
            }
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::release()
    }
}
