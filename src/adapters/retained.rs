//! Retained-memory adapter: implements [`PhaseStore`].
//!
//! On the ESP32 the record lives in RTC slow memory in the `.rtc_noinit`
//! section: the bootloader neither zeroes nor initialises it, so it keeps
//! its value through deep sleep and soft resets and holds garbage after a
//! power loss.  `RetainedState` is plain integers, so any bit pattern is a
//! valid value and the integrity check decides whether to trust it.
//!
//! The simulation backend starts from a garbage record, like a cold boot.

use crate::app::ports::PhaseStore;
use crate::fsm::RetainedState;

#[cfg(not(target_os = "espidf"))]
use crate::fsm::PersistedPhase;

// ═══════════════════════════════════════════════════════════════════════════
//  ESP-IDF backend
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc_noinit")]
static mut RETAINED: RetainedState = RetainedState::initial();

#[cfg(target_os = "espidf")]
pub struct RtcRetainedStore;

#[cfg(target_os = "espidf")]
impl RtcRetainedStore {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
impl PhaseStore for RtcRetainedStore {
    fn load(&mut self) -> RetainedState {
        // SAFETY: single-threaded wake cycle; volatile so the read is not
        // folded into the (never applied) static initialiser.
        unsafe { core::ptr::read_volatile(&raw const RETAINED) }
    }

    fn store(&mut self, state: &RetainedState) {
        // SAFETY: as above.
        unsafe { core::ptr::write_volatile(&raw mut RETAINED, *state) }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Simulation backend
// ═══════════════════════════════════════════════════════════════════════════

/// What uninitialised RTC memory looks like to the integrity check.
#[cfg(not(target_os = "espidf"))]
const COLD_BOOT_GARBAGE: RetainedState = RetainedState {
    phase: PersistedPhase {
        phase: 0xA5,
        integrity_tag: 0x5A5A_5A5A,
    },
    pulse_counter: 0xA5,
};

#[cfg(not(target_os = "espidf"))]
pub struct RtcRetainedStore {
    slot: RetainedState,
    writes: usize,
}

#[cfg(not(target_os = "espidf"))]
impl RtcRetainedStore {
    pub fn new() -> Self {
        Self {
            slot: COLD_BOOT_GARBAGE,
            writes: 0,
        }
    }

    /// Start from a known record, as after a deep-sleep wake.
    pub fn with_state(state: RetainedState) -> Self {
        Self {
            slot: state,
            writes: 0,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Simulate a power loss.
    pub fn power_loss(&mut self) {
        self.slot = COLD_BOOT_GARBAGE;
    }
}

#[cfg(not(target_os = "espidf"))]
impl PhaseStore for RtcRetainedStore {
    fn load(&mut self) -> RetainedState {
        self.slot
    }

    fn store(&mut self, state: &RetainedState) {
        self.slot = *state;
        self.writes += 1;
    }
}

impl Default for RtcRetainedStore {
    fn default() -> Self {
        Self::new()
    }
}
