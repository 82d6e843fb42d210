//! GPIO adapter: implements [`SensorPort`] for the sensor node.
//!
//! Pins are configured lazily from the domain's calls; nothing is driven at
//! boot.  The PIR pins sit in the RTC domain and go through `rtc_gpio_*` so
//! that their state (power latch, wake input) survives deep sleep.  The IR
//! pins are plain GPIO and are returned to `GPIO_MODE_DISABLE` after every
//! read.
//!
//! On non-espidf targets a simulation backend stands in, with inputs that
//! tests can set directly.

use crate::app::ports::SensorPort;
use crate::sensors::{Level, Pin};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use log::debug;

// ═══════════════════════════════════════════════════════════════════════════
//  ESP-IDF backend
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(target_os = "espidf")]
pub struct GpioSensorAdapter;

#[cfg(target_os = "espidf")]
impl GpioSensorAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t, what: &str, gpio: i32) {
    if ret != ESP_OK as i32 {
        warn!("GPIO: {} on {} failed (rc={})", what, gpio, ret);
    }
}

/// Reconfigure one plain GPIO.
#[cfg(target_os = "espidf")]
fn configure(gpio: i32, mode: gpio_mode_t, pull_up: bool) {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the pin in the mask; single-threaded
    // wake cycle.
    check(unsafe { gpio_config(&cfg) }, "gpio_config", gpio);
}

#[cfg(target_os = "espidf")]
impl SensorPort for GpioSensorAdapter {
    fn read_digital(&mut self, pin: Pin) -> Level {
        let gpio = pin.gpio();
        // SAFETY: plain register reads on a pin this adapter owns.
        let raw = unsafe {
            if pin.is_rtc() {
                rtc_gpio_get_level(gpio)
            } else {
                configure(gpio, gpio_mode_t_GPIO_MODE_INPUT, true);
                gpio_get_level(gpio) as u32
            }
        };
        Level::from(raw != 0)
    }

    fn set_power(&mut self, pin: Pin, on: bool) {
        let gpio = pin.gpio();
        // SAFETY: see `configure`; the rtc_gpio calls act on one RTC pad.
        unsafe {
            if pin.is_rtc() {
                if on {
                    check(rtc_gpio_init(gpio), "rtc_gpio_init", gpio);
                    check(
                        rtc_gpio_set_direction(gpio, rtc_gpio_mode_t_RTC_GPIO_MODE_OUTPUT_ONLY),
                        "rtc_gpio_set_direction",
                        gpio,
                    );
                    check(rtc_gpio_set_level(gpio, 1), "rtc_gpio_set_level", gpio);
                    check(rtc_gpio_hold_en(gpio), "rtc_gpio_hold_en", gpio);
                } else {
                    check(rtc_gpio_hold_dis(gpio), "rtc_gpio_hold_dis", gpio);
                    check(rtc_gpio_set_level(gpio, 0), "rtc_gpio_set_level", gpio);
                }
            } else if on {
                configure(gpio, gpio_mode_t_GPIO_MODE_OUTPUT, false);
                check(gpio_set_level(gpio, 1), "gpio_set_level", gpio);
            } else {
                check(gpio_set_level(gpio, 0), "gpio_set_level", gpio);
                configure(gpio, gpio_mode_t_GPIO_MODE_DISABLE, false);
            }
        }
    }

    fn configure_edge_wake(&mut self, pin: Pin, _level: Level) {
        debug_assert!(pin.is_rtc(), "{pin:?} cannot wake from deep sleep");
        let gpio = pin.gpio();
        // Failures are only logged: ext0 arming in `SleepScheduler` checks
        // the same pin and that error is fatal.
        // SAFETY: see `set_power`.
        unsafe {
            check(rtc_gpio_init(gpio), "rtc_gpio_init", gpio);
            check(
                rtc_gpio_set_direction(gpio, rtc_gpio_mode_t_RTC_GPIO_MODE_INPUT_ONLY),
                "rtc_gpio_set_direction",
                gpio,
            );
        }
    }

    fn release(&mut self, pin: Pin) {
        let gpio = pin.gpio();
        // SAFETY: see `set_power`.
        unsafe {
            if pin.is_rtc() {
                check(rtc_gpio_hold_dis(gpio), "rtc_gpio_hold_dis", gpio);
                check(
                    rtc_gpio_set_direction(gpio, rtc_gpio_mode_t_RTC_GPIO_MODE_DISABLED),
                    "rtc_gpio_set_direction",
                    gpio,
                );
                check(rtc_gpio_deinit(gpio), "rtc_gpio_deinit", gpio);
            } else {
                configure(gpio, gpio_mode_t_GPIO_MODE_DISABLE, false);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Simulation backend
// ═══════════════════════════════════════════════════════════════════════════

/// Host stand-in.  The IR receiver only reports the beam while both it and
/// the emitter are powered; unpowered it reads LOW.
#[cfg(not(target_os = "espidf"))]
pub struct GpioSensorAdapter {
    beam: Level,
    pir: Level,
    powered: Vec<Pin>,
    wake_armed: Option<(Pin, Level)>,
}

#[cfg(not(target_os = "espidf"))]
impl GpioSensorAdapter {
    pub fn new() -> Self {
        Self {
            beam: Level::High,
            pir: Level::Low,
            powered: Vec::new(),
            wake_armed: None,
        }
    }

    /// HIGH = beam reaches the receiver (box empty).
    pub fn set_beam(&mut self, level: Level) {
        self.beam = level;
    }

    pub fn set_pir(&mut self, level: Level) {
        self.pir = level;
    }

    pub fn is_powered(&self, pin: Pin) -> bool {
        self.powered.contains(&pin)
    }

    pub fn wake_armed(&self) -> Option<(Pin, Level)> {
        self.wake_armed
    }
}

#[cfg(not(target_os = "espidf"))]
impl SensorPort for GpioSensorAdapter {
    fn read_digital(&mut self, pin: Pin) -> Level {
        match pin {
            Pin::IrSensorRead
                if self.is_powered(Pin::IrSensorPower) && self.is_powered(Pin::IrEmitterPower) =>
            {
                self.beam
            }
            Pin::PirRead if self.is_powered(Pin::PirPower) => self.pir,
            _ => Level::Low,
        }
    }

    fn set_power(&mut self, pin: Pin, on: bool) {
        debug!("GPIO(sim): {:?} power {}", pin, if on { "on" } else { "off" });
        self.powered.retain(|p| *p != pin);
        if on {
            self.powered.push(pin);
        }
    }

    fn configure_edge_wake(&mut self, pin: Pin, level: Level) {
        debug_assert!(pin.is_rtc(), "{pin:?} cannot wake from deep sleep");
        self.wake_armed = Some((pin, level));
    }

    fn release(&mut self, pin: Pin) {
        self.powered.retain(|p| *p != pin);
        if matches!(self.wake_armed, Some((p, _)) if p == pin) {
            self.wake_armed = None;
        }
    }
}

impl Default for GpioSensorAdapter {
    fn default() -> Self {
        Self::new()
    }
}
