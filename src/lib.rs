//! Mailwatch firmware library.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; on the host every adapter has a simulation backend.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod power;
pub mod radio;
pub mod receiver;
pub mod sensors;

mod link_shims;
