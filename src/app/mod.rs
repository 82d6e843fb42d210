//! Application core: pure domain logic, zero I/O.
//!
//! The sensor node's wake cycle lives in [`service`].  All interaction
//! with hardware happens through the **port traits** in [`ports`] (plus
//! [`Transport`](crate::radio::transport::Transport) and
//! [`SleepPlatform`](crate::power::SleepPlatform)), keeping this layer
//! fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
