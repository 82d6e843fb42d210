//! Unified error types for the mailwatch firmware.
//!
//! Each subsystem has its own small `Copy` enum so it can be matched on
//! exhaustively at the call site.  The binaries report the fatal ones
//! through `anyhow`.
//!
//! Severity is decided by the caller, not the type:
//!
//! | Type             | Handling                                          |
//! |------------------|---------------------------------------------------|
//! | [`InitError`]    | fatal, radio/storage bring-up aborts the cycle   |
//! | [`HandoffError`] | retried by `radio::reliable::try_send`            |
//! | [`SendFailure`]  | logged, broadcast fallback, never a crash         |
//! | [`DecodeError`]  | logged by the receiver, frame shown as placeholder|
//! | [`SleepError`]   | fatal, an un-wakeable device is unrecoverable     |
//! | [`ConfigError`]  | fatal at boot                                     |

use core::fmt;

// ---------------------------------------------------------------------------
// Radio / storage bring-up
// ---------------------------------------------------------------------------

/// Bring-up failures.  The `i32` carries the raw `esp_err_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// NVS flash could not be initialised (WiFi driver needs it).
    Storage(i32),
    /// WiFi driver init / start / channel selection failed.
    Wifi(i32),
    /// `esp_now_init` failed.
    EspNow(i32),
    /// Send/receive callback registration failed.
    Callback(i32),
    /// The configured peer could not be added to the peer table.
    Peer(TransportError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(rc) => write!(f, "NVS init failed (rc={rc})"),
            Self::Wifi(rc) => write!(f, "WiFi bring-up failed (rc={rc})"),
            Self::EspNow(rc) => write!(f, "ESP-NOW init failed (rc={rc})"),
            Self::Callback(rc) => write!(f, "callback registration failed (rc={rc})"),
            Self::Peer(e) => write!(f, "peer registration failed: {e}"),
        }
    }
}

impl std::error::Error for InitError {}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A single send attempt was rejected before the frame reached the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    /// The transport has not been brought up.
    NotInitialized,
    /// Destination is not in the peer table.
    UnknownPeer,
    /// Frame exceeds the transport's datagram size.
    FrameTooLarge,
    /// Driver-level rejection (raw `esp_err_t`).
    Radio(i32),
}

impl fmt::Display for HandoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "transport not initialised"),
            Self::UnknownPeer => write!(f, "peer not registered"),
            Self::FrameTooLarge => write!(f, "frame too large"),
            Self::Radio(rc) => write!(f, "radio rejected frame (rc={rc})"),
        }
    }
}

/// Peer-table failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    NotInitialized,
    PeerTableFull,
    InvalidChannel(u8),
    Radio(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "transport not initialised"),
            Self::PeerTableFull => write!(f, "peer table full"),
            Self::InvalidChannel(ch) => write!(f, "invalid channel {ch}"),
            Self::Radio(rc) => write!(f, "driver error (rc={rc})"),
        }
    }
}

/// Every unicast attempt of a reliable send was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    AllAttemptsFailed { attempts: u8 },
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllAttemptsFailed { attempts } => {
                write!(f, "all {attempts} attempts rejected at hand-off")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame shorter than the fixed kind + level header.
    Truncated,
    /// Kind byte outside the known range.
    UnknownKind(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "frame truncated"),
            Self::UnknownKind(k) => write!(f, "unknown message kind {k}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sleep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepError {
    /// Timer wakeup with a zero duration would never let the device rest.
    InvalidDuration(u64),
    /// Pin cannot wake the chip from deep sleep (not RTC-capable).
    InvalidWakePin(i32),
    /// Platform rejected the wakeup configuration (raw `esp_err_t`).
    Platform(i32),
}

impl fmt::Display for SleepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDuration(us) => write!(f, "invalid timer duration {us} us"),
            Self::InvalidWakePin(pin) => write!(f, "GPIO {pin} cannot wake from deep sleep"),
            Self::Platform(rc) => write!(f, "wakeup source rejected (rc={rc})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is out of its accepted range.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
