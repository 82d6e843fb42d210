//! Deep-sleep adapter: implements [`SleepPlatform`].
//!
//! The ESP backend maps straight onto `esp_sleep_*`.  The simulation
//! backend records what was armed and panics in `suspend`, which is how
//! host tests observe "the cycle ended here".

use crate::error::SleepError;
use crate::power::{SleepPlatform, WakeCause};
use crate::sensors::Level;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ═══════════════════════════════════════════════════════════════════════════
//  ESP-IDF backend
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
pub struct DeepSleep;

#[cfg(target_os = "espidf")]
impl DeepSleep {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t) -> Result<(), SleepError> {
    if ret != ESP_OK as i32 {
        return Err(SleepError::Platform(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
impl SleepPlatform for DeepSleep {
    #[allow(non_upper_case_globals)]
    fn wake_cause(&self) -> WakeCause {
        // SAFETY: read-only query of the reset reason.
        match unsafe { esp_sleep_get_wakeup_cause() } {
            esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeCause::PowerOn,
            esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeCause::Timer,
            esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0 => WakeCause::Pin,
            other => WakeCause::Other(other as u32),
        }
    }

    fn disable_all_wakeup_sources(&mut self) -> Result<(), SleepError> {
        // SAFETY: plain configuration call, no pointers involved.
        check(unsafe { esp_sleep_disable_wakeup_source(esp_sleep_source_t_ESP_SLEEP_WAKEUP_ALL) })
    }

    fn enable_timer_wakeup(&mut self, micros: u64) -> Result<(), SleepError> {
        // SAFETY: as above.
        check(unsafe { esp_sleep_enable_timer_wakeup(micros) })
    }

    fn enable_pin_wakeup(&mut self, gpio: i32, level: Level) -> Result<(), SleepError> {
        // SAFETY: as above; the pin was validated as RTC-capable by the
        // scheduler.
        check(unsafe { esp_sleep_enable_ext0_wakeup(gpio, i32::from(level.as_u8())) })
    }

    fn suspend(&mut self) -> ! {
        // SAFETY: never returns; RTC retained memory survives.
        unsafe { esp_deep_sleep_start() }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Simulation backend
// ═══════════════════════════════════════════════════════════════════════════

/// Panic payload raised by the simulated `suspend`.
#[cfg(not(target_os = "espidf"))]
pub const SUSPEND_PANIC: &str = "deep sleep entered";

/// What the simulated chip was told to wake on.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmedSource {
    Timer(u64),
    Pin(i32, Level),
}

#[cfg(not(target_os = "espidf"))]
pub struct DeepSleep {
    cause: WakeCause,
    armed: Vec<ArmedSource>,
}

#[cfg(not(target_os = "espidf"))]
impl DeepSleep {
    pub fn new() -> Self {
        Self::woken_by(WakeCause::PowerOn)
    }

    pub fn woken_by(cause: WakeCause) -> Self {
        Self {
            cause,
            armed: Vec::new(),
        }
    }

    pub fn armed(&self) -> &[ArmedSource] {
        &self.armed
    }
}

#[cfg(not(target_os = "espidf"))]
impl SleepPlatform for DeepSleep {
    fn wake_cause(&self) -> WakeCause {
        self.cause
    }

    fn disable_all_wakeup_sources(&mut self) -> Result<(), SleepError> {
        self.armed.clear();
        Ok(())
    }

    fn enable_timer_wakeup(&mut self, micros: u64) -> Result<(), SleepError> {
        self.armed.push(ArmedSource::Timer(micros));
        Ok(())
    }

    fn enable_pin_wakeup(&mut self, gpio: i32, level: Level) -> Result<(), SleepError> {
        self.armed.push(ArmedSource::Pin(gpio, level));
        Ok(())
    }

    fn suspend(&mut self) -> ! {
        log::info!("SLEEP(sim): armed {:?}", self.armed);
        panic!("{}", SUSPEND_PANIC)
    }
}

impl Default for DeepSleep {
    fn default() -> Self {
        Self::new()
    }
}
