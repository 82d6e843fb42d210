//! Send-completion notifications and the hand-off gate.
//!
//! The ESP-NOW driver reports the over-the-air result of every frame from
//! its own task.  Those reports are posted into a bounded channel and the
//! wake cycle drains them before tearing the radio down:
//!
//! ```text
//! ┌──────────────┐ SendCompletion ┌──────────────────────┐
//! │ send callback│───────────────▶│ await_handoffs (gate)│
//! │ (wifi task)  │  try_send only │ main task, bounded   │
//! └──────────────┘                └──────────────────────┘
//! ```
//!
//! Completions are diagnostic.  They never alter a phase transition.

use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use futures_lite::FutureExt;
use log::{info, warn};

use super::transport::{Datagram, MacAddress};

/// Over-the-air outcome of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendCompletion {
    pub peer: MacAddress,
    pub delivered: bool,
}

const COMPLETION_DEPTH: usize = 8;
const INBOX_DEPTH: usize = 4;

pub type CompletionChannel = Channel<CriticalSectionRawMutex, SendCompletion, COMPLETION_DEPTH>;
pub type InboxChannel = Channel<CriticalSectionRawMutex, Datagram, INBOX_DEPTH>;

/// Send callback → main task.
pub static SEND_COMPLETIONS: CompletionChannel = Channel::new();

/// Receive callback → receiver loop.
pub static INBOX: InboxChannel = Channel::new();

/// Post from callback context.  Never blocks; drops when full.
pub fn post_completion(channel: &CompletionChannel, completion: SendCompletion) {
    if channel.try_send(completion).is_err() {
        warn!("RADIO: completion channel full, dropping report");
    }
}

// ---------------------------------------------------------------------------
// Hand-off gate
// ---------------------------------------------------------------------------

/// Counts completions for the frames handed off this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandoffGate {
    expected: u8,
    observed: u8,
    delivered: u8,
}

impl HandoffGate {
    pub const fn new(expected: u8) -> Self {
        Self {
            expected,
            observed: 0,
            delivered: 0,
        }
    }

    pub fn record(&mut self, completion: &SendCompletion) {
        self.observed = self.observed.saturating_add(1);
        if completion.delivered {
            self.delivered = self.delivered.saturating_add(1);
        }
    }

    pub const fn is_open(&self) -> bool {
        self.observed >= self.expected
    }

    pub const fn expected(&self) -> u8 {
        self.expected
    }

    pub const fn observed(&self) -> u8 {
        self.observed
    }

    pub const fn delivered(&self) -> u8 {
        self.delivered
    }
}

/// Block until `gate` opens or `timeout` elapses.  Returns whether the gate
/// opened.
pub fn await_handoffs(channel: &CompletionChannel, gate: &mut HandoffGate, timeout: Duration) -> bool {
    if gate.is_open() {
        return true;
    }

    let opened = futures_lite::future::block_on(
        async {
            while !gate.is_open() {
                let completion = channel.receive().await;
                gate.record(&completion);
            }
            true
        }
        .or(async {
            async_io_mini::Timer::after(timeout).await;
            false
        }),
    );

    if opened {
        info!(
            "RADIO: {}/{} frames delivered",
            gate.delivered(),
            gate.expected()
        );
    } else {
        warn!(
            "RADIO: hand-off wait timed out ({}/{} completions)",
            gate.observed(),
            gate.expected()
        );
    }
    opened
}
