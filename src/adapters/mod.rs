//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements     | Connects to                     |
//! |--------------|----------------|---------------------------------|
//! | `gpio`       | SensorPort     | ESP32 GPIO / RTC GPIO           |
//! | `retained`   | PhaseStore     | RTC slow memory (.rtc_noinit)   |
//! | `espnow`     | Transport      | ESP-NOW over WiFi STA           |
//! | `deep_sleep` | SleepPlatform  | esp_sleep_* wakeup sources      |
//! | `log_sink`   | EventSink      | Serial log output               |
//! | `device_id`  | (none)         | Station MAC, boot banner ID     |
//!
//! Every adapter has a simulation backend on non-espidf targets so the
//! whole wake cycle runs in host tests.

pub mod deep_sleep;
pub mod device_id;
pub mod espnow;
pub mod gpio;
pub mod log_sink;
pub mod retained;
