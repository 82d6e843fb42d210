//! Concrete phase handlers and table builder.
//!
//! ```text
//!  INITIAL_READ ──[beam LOW, both sends OK]──▶ PIR_WARMUP
//!    ▲  │ [HIGH or send failed]                    │
//!    │  └──────▶ (self, Idle)                      ▼
//!    │                                      RETRIEVAL_WINDOW
//!    │                                             │ [sleep until PIR HIGH]
//!    │                                             ▼
//!    └──[HIGH: emptied │ pulses exhausted]── BEAM_PULSE_CHECK ◀─┐
//!                                                  │ [LOW]       │
//!                                                  └─────────────┘
//! ```

use log::{info, warn};

use super::context::WakeContext;
use super::{Phase, PhaseDescriptor, Transition};
use crate::app::events::NodeEvent;
use crate::app::ports::SensorPort;
use crate::error::InitError;
use crate::power::SleepMode;
use crate::radio::codec::{MessageKind, StatusMessage};
use crate::sensors::{Level, Pin};

pub const GREETING_TEXT: &str = "Greetings from mailbox sensor!";
pub const MAIL_PRESENT_TEXT: &str = "Beam broken. There is mail in the mailbox.";
pub const MAILBOX_EMPTIED_TEXT: &str = "Beam unbroken. Mailbox now empty.";

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_phase_table() -> [PhaseDescriptor; Phase::COUNT] {
    [
        // Index 0
        PhaseDescriptor {
            id: Phase::InitialRead,
            name: "InitialRead",
            on_wake: initial_read,
        },
        // Index 1
        PhaseDescriptor {
            id: Phase::PirWarmup,
            name: "PirWarmup",
            on_wake: pir_warmup,
        },
        // Index 2
        PhaseDescriptor {
            id: Phase::RetrievalWindow,
            name: "RetrievalWindow",
            on_wake: retrieval_window,
        },
        // Index 3
        PhaseDescriptor {
            id: Phase::BeamPulseCheck,
            name: "BeamPulseCheck",
            on_wake: beam_pulse_check,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  INITIAL_READ
// ═══════════════════════════════════════════════════════════════════════════

fn initial_read(ctx: &mut WakeContext<'_>) -> Result<Transition, InitError> {
    let level = ctx.read_beam();
    if level == Level::High {
        return Ok(Transition::new(Phase::InitialRead, SleepMode::Idle));
    }

    ctx.bring_radio_up()?;

    // The greeting doubles as a link check; the reading only goes out if
    // the link looks usable.
    let greeting = StatusMessage::new(MessageKind::Normal, 0, GREETING_TEXT);
    if ctx.send_reliably(&greeting).is_err() {
        warn!("FSM: greeting not handed off, staying in InitialRead");
        return Ok(Transition::new(Phase::InitialRead, SleepMode::Idle));
    }

    let reading = StatusMessage::new(MessageKind::SensorReading, level.as_u8(), MAIL_PRESENT_TEXT);
    if ctx.send_reliably(&reading).is_err() {
        warn!("FSM: mail report not handed off, staying in InitialRead");
        return Ok(Transition::new(Phase::InitialRead, SleepMode::Idle));
    }

    Ok(Transition::new(Phase::PirWarmup, SleepMode::PirStartUp))
}

// ═══════════════════════════════════════════════════════════════════════════
//  PIR_WARMUP
// ═══════════════════════════════════════════════════════════════════════════

fn pir_warmup(ctx: &mut WakeContext<'_>) -> Result<Transition, InitError> {
    // Latched; stays on through every sleep until BeamPulseCheck.
    ctx.sensors.set_power(Pin::PirPower, true);
    info!("FSM: PIR powered, waiting for calibration");
    Ok(Transition::new(Phase::RetrievalWindow, SleepMode::PirCalibration))
}

// ═══════════════════════════════════════════════════════════════════════════
//  RETRIEVAL_WINDOW
// ═══════════════════════════════════════════════════════════════════════════

fn retrieval_window(ctx: &mut WakeContext<'_>) -> Result<Transition, InitError> {
    ctx.sensors.configure_edge_wake(Pin::PirRead, Level::High);
    info!("FSM: awaiting motion");
    Ok(Transition::new(Phase::BeamPulseCheck, SleepMode::AwaitMotion))
}

// ═══════════════════════════════════════════════════════════════════════════
//  BEAM_PULSE_CHECK
// ═══════════════════════════════════════════════════════════════════════════

fn beam_pulse_check(ctx: &mut WakeContext<'_>) -> Result<Transition, InitError> {
    pir_off(&mut *ctx.sensors);

    let max = ctx.config.pulse_count_max;
    if ctx.pulse_counter >= max {
        ctx.pulse_counter = 0;
        return Ok(Transition::new(Phase::InitialRead, SleepMode::Idle));
    }

    if ctx.read_beam() == Level::High {
        ctx.pulse_counter = 0;
        ctx.bring_radio_up()?;
        let emptied = StatusMessage::new(
            MessageKind::SensorReading,
            Level::High.as_u8(),
            MAILBOX_EMPTIED_TEXT,
        );
        // Best effort; the box is empty whether or not the report lands.
        let _ = ctx.send_reliably(&emptied);
        return Ok(Transition::new(Phase::InitialRead, SleepMode::Idle));
    }

    ctx.pulse_counter += 1;
    ctx.sink.emit(&NodeEvent::PulseCount {
        count: ctx.pulse_counter,
        max,
    });
    if ctx.pulse_counter == max {
        info!("FSM: max pulse count reached, back to InitialRead");
        ctx.pulse_counter = 0;
        return Ok(Transition::new(Phase::InitialRead, SleepMode::Idle));
    }
    Ok(Transition::new(Phase::BeamPulseCheck, SleepMode::BeamPulse))
}

fn pir_off(sensors: &mut dyn SensorPort) {
    sensors.set_power(Pin::PirPower, false);
    sensors.release(Pin::PirPower);
    sensors.release(Pin::PirRead);
}
