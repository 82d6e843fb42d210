//! Persisted phase state machine.
//!
//! Table-driven, one handler per phase, one handler call per wake:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  PhaseTable                                              │
//! │  ┌─────────────────┬──────────────────────────────────┐  │
//! │  │ Phase           │ on_wake                          │  │
//! │  ├─────────────────┼──────────────────────────────────┤  │
//! │  │ InitialRead     │ fn(ctx) -> Result<Transition, _> │  │
//! │  │ PirWarmup       │ fn(ctx) -> Result<Transition, _> │  │
//! │  │ RetrievalWindow │ fn(ctx) -> Result<Transition, _> │  │
//! │  │ BeamPulseCheck  │ fn(ctx) -> Result<Transition, _> │  │
//! │  └─────────────────┴──────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no loop: the machine's "tick" is a deep-sleep cycle.  The
//! current phase comes out of retained memory at boot ([`PhaseMachine::restore`]),
//! the handler for it runs exactly once, and the returned [`Transition`]
//! is written back before the chip sleeps.

pub mod context;
pub mod states;

use context::WakeContext;
use log::{info, warn};

use crate::app::events::NodeEvent;
use crate::error::InitError;
use crate::power::{SleepMode, WakeCause};

/// Marker that distinguishes a record this firmware wrote from
/// uninitialised RTC memory.
pub const INTEGRITY_TAG: u32 = 0xDEAD_BEEF;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// What the next wake should do.
/// Must stay in sync with the table built in [`states::build_phase_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    InitialRead = 0,
    PirWarmup = 1,
    RetrievalWindow = 2,
    BeamPulseCheck = 3,
}

impl Phase {
    pub const COUNT: usize = 4;

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::InitialRead),
            1 => Some(Self::PirWarmup),
            2 => Some(Self::RetrievalWindow),
            3 => Some(Self::BeamPulseCheck),
            _ => None,
        }
    }

    /// The wake cause a healthy cycle expects for this phase.
    ///
    /// `BeamPulseCheck` is entered on PIR motion the first time and on the
    /// pulse timer afterwards.
    pub const fn expected_wake(self, pulse_counter: u8) -> WakeCause {
        match self {
            Self::BeamPulseCheck if pulse_counter == 0 => WakeCause::Pin,
            _ => WakeCause::Timer,
        }
    }
}

// ---------------------------------------------------------------------------
// Retained record
// ---------------------------------------------------------------------------

/// Phase as stored in retained memory.  The raw byte is kept as-is so that
/// garbage can be detected rather than transmuted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PersistedPhase {
    pub phase: u8,
    pub integrity_tag: u32,
}

impl PersistedPhase {
    pub const fn new(phase: Phase) -> Self {
        Self {
            phase: phase as u8,
            integrity_tag: INTEGRITY_TAG,
        }
    }

    /// The stored phase, or `None` when the record is corrupt.
    pub const fn validate(&self) -> Option<Phase> {
        if self.integrity_tag != INTEGRITY_TAG {
            return None;
        }
        Phase::from_raw(self.phase)
    }
}

/// Everything that survives deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct RetainedState {
    pub phase: PersistedPhase,
    pub pulse_counter: u8,
}

impl RetainedState {
    pub const fn new(phase: Phase, pulse_counter: u8) -> Self {
        Self {
            phase: PersistedPhase::new(phase),
            pulse_counter,
        }
    }

    pub const fn initial() -> Self {
        Self::new(Phase::InitialRead, 0)
    }
}

/// Result of the boot-time integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restored {
    pub phase: Phase,
    pub pulse_counter: u8,
    /// The retained record was corrupt and has been reset.
    pub integrity_reset: bool,
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Pure output of one phase handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Phase,
    pub sleep: SleepMode,
}

impl Transition {
    pub const fn new(next: Phase, sleep: SleepMode) -> Self {
        Self { next, sleep }
    }
}

// ---------------------------------------------------------------------------
// Phase descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Handler run once per wake for the current phase.
pub type PhaseWakeFn = fn(&mut WakeContext<'_>) -> Result<Transition, InitError>;

pub struct PhaseDescriptor {
    pub id: Phase,
    pub name: &'static str,
    pub on_wake: PhaseWakeFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct PhaseMachine {
    /// Fixed-size table indexed by `Phase as usize`.
    table: [PhaseDescriptor; Phase::COUNT],
}

impl PhaseMachine {
    pub fn new(table: [PhaseDescriptor; Phase::COUNT]) -> Self {
        Self { table }
    }

    /// Integrity-check a retained record.  A corrupt record restarts the
    /// machine at `InitialRead` with the pulse counter cleared.
    pub fn restore(state: RetainedState) -> Restored {
        match state.phase.validate() {
            Some(phase) => Restored {
                phase,
                pulse_counter: state.pulse_counter,
                integrity_reset: false,
            },
            None => {
                warn!(
                    "FSM: retained state invalid (tag={:#010x}, phase={}), resetting",
                    state.phase.integrity_tag, state.phase.phase
                );
                Restored {
                    phase: Phase::InitialRead,
                    pulse_counter: 0,
                    integrity_reset: true,
                }
            }
        }
    }

    pub fn name(&self, phase: Phase) -> &'static str {
        self.table[phase as usize].name
    }

    /// Run the handler for `phase` once.
    pub fn step(&self, phase: Phase, ctx: &mut WakeContext<'_>) -> Result<Transition, InitError> {
        let row = &self.table[phase as usize];
        debug_assert_eq!(row.id, phase);
        info!("FSM: running {}", row.name);

        let transition = (row.on_wake)(ctx)?;

        info!(
            "FSM transition: {} -> {} (sleep {})",
            row.name,
            self.table[transition.next as usize].name,
            transition.sleep.name()
        );
        ctx.sink.emit(&NodeEvent::PhaseChanged {
            from: phase,
            to: transition.next,
            sleep: transition.sleep,
        });
        Ok(transition)
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(states::build_phase_table())
    }
}
