//! GPIO pin assignments for the mailbox sensor node and the receiver.
//!
//! Single source of truth: adapters map the logical [`Pin`](crate::sensors::Pin)
//! names onto these numbers.  Everything that must stay configured through
//! deep sleep (PIR power, PIR wake input) sits on an RTC-capable pad.

// ---------------------------------------------------------------------------
// IR break-beam (emitter + receiver, both power-gated through transistors)
// ---------------------------------------------------------------------------

/// Digital input from the IR receiver.  HIGH = beam unbroken (box empty).
pub const IR_SENSOR_READ_GPIO: i32 = 25;
/// Transistor gate powering the IR receiver.
pub const IR_SENSOR_POWER_GPIO: i32 = 26;
/// Transistor gate powering the IR emitter.
pub const IR_EMITTER_POWER_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// PIR motion sensor (RTC domain, must survive deep sleep)
// ---------------------------------------------------------------------------

/// Transistor gate powering the PIR module.  Held HIGH through sleep.
pub const PIR_POWER_GPIO: i32 = 32;
/// PIR output, used as the ext0 wake source.
pub const PIR_READ_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// Receiver indicator LEDs
// ---------------------------------------------------------------------------

pub const RECEIVER_RED_LED_GPIO: i32 = 25;
pub const RECEIVER_GREEN_LED_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// RTC capability
// ---------------------------------------------------------------------------

/// GPIOs routed to the RTC IO mux on the ESP32 (usable for ext0 wake).
pub const RTC_CAPABLE_GPIOS: [i32; 18] = [
    0, 2, 4, 12, 13, 14, 15, 25, 26, 27, 32, 33, 34, 35, 36, 37, 38, 39,
];

/// Whether `gpio` can be used as a deep-sleep wake source.
pub fn is_rtc_capable(gpio: i32) -> bool {
    RTC_CAPABLE_GPIOS.contains(&gpio)
}
