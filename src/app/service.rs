//! Sensor node service: the hexagonal core.
//!
//! [`SensorNode`] owns the phase machine and the configuration and runs
//! exactly one wake cycle per boot.  All I/O flows through the ports in
//! [`NodePorts`], so the whole cycle runs against mocks on the host.
//!
//! ```text
//!  PhaseStore ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!  SensorPort ◀──▶│       SensorNode        │
//!   Transport ◀───│ restore · step · store  │ ──▶ SleepScheduler (→ !)
//!                 └─────────────────────────┘
//! ```

use core::convert::Infallible;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use crate::config::NodeConfig;
use crate::error::InitError;
use crate::fsm::context::WakeContext;
use crate::fsm::{Phase, PhaseMachine, RetainedState, Transition};
use crate::power::{SleepPlatform, SleepRequest, SleepScheduler, WakeCause};
use crate::radio::completion::{self, CompletionChannel, HandoffGate};
use crate::radio::transport::Transport;

use super::events::NodeEvent;
use super::ports::{EventSink, PhaseStore, SensorPort};

/// Every port one wake cycle touches.
pub struct NodePorts<'a> {
    pub store: &'a mut dyn PhaseStore,
    pub sensors: &'a mut dyn SensorPort,
    pub transport: &'a mut dyn Transport,
    pub delay: &'a mut dyn DelayNs,
    pub sink: &'a mut dyn EventSink,
}

/// What one wake cycle decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeOutcome {
    pub cause: WakeCause,
    /// Phase that ran this cycle.
    pub ran: Phase,
    pub transition: Transition,
    /// Record written to retained memory.
    pub stored: RetainedState,
    pub sleep: SleepRequest,
    pub radio_up: bool,
    /// Frames accepted by the radio; the gate waits for this many completions.
    pub handoffs: u8,
}

pub struct SensorNode {
    machine: PhaseMachine,
    config: NodeConfig,
}

impl SensorNode {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            machine: PhaseMachine::default(),
            config,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Load → integrity check → one handler → store.
    ///
    /// Retained state is written before this returns; nothing after it may
    /// touch the record.  An `InitError` leaves the record untouched so the
    /// same phase runs again on the next boot.
    pub fn run_wake_cycle(
        &self,
        cause: WakeCause,
        ports: &mut NodePorts<'_>,
    ) -> Result<WakeOutcome, InitError> {
        let restored = PhaseMachine::restore(ports.store.load());
        if restored.integrity_reset {
            ports.sink.emit(&NodeEvent::IntegrityReset);
        }
        ports.sink.emit(&NodeEvent::Woke {
            cause,
            phase: restored.phase,
            pulse_count: restored.pulse_counter,
        });

        let expected = restored.phase.expected_wake(restored.pulse_counter);
        if cause != WakeCause::PowerOn && cause != expected {
            warn!(
                "NODE: woke by {:?} in {}, expected {:?}",
                cause,
                self.machine.name(restored.phase),
                expected
            );
        }

        let mut ctx = WakeContext::new(
            &mut *ports.sensors,
            &mut *ports.transport,
            &mut *ports.delay,
            &mut *ports.sink,
            &self.config,
            restored.pulse_counter,
        );
        let transition = self.machine.step(restored.phase, &mut ctx)?;
        let (pulse_counter, radio_up, handoffs) =
            (ctx.pulse_counter, ctx.radio_up(), ctx.handoffs());

        let stored = RetainedState::new(transition.next, pulse_counter);
        ports.store.store(&stored);

        Ok(WakeOutcome {
            cause,
            ran: restored.phase,
            transition,
            stored,
            sleep: self.config.sleep_request(transition.sleep),
            radio_up,
            handoffs,
        })
    }

    /// Wait (bounded) for this cycle's hand-offs to complete, then tear the
    /// radio down.
    pub fn settle_radio(
        &self,
        outcome: &WakeOutcome,
        transport: &mut dyn Transport,
        completions: &CompletionChannel,
    ) -> HandoffGate {
        let mut gate = HandoffGate::new(outcome.handoffs);
        if outcome.handoffs > 0 {
            let timeout = Duration::from_millis(u64::from(self.config.handoff_wait_ms));
            completion::await_handoffs(completions, &mut gate, timeout);
        }
        if outcome.radio_up {
            transport.shutdown();
            info!("NODE: radio down");
        }
        gate
    }

    /// A full boot: wake cycle, radio settle, deep sleep.  Only returns on
    /// a radio bring-up failure.
    pub fn run_to_sleep<P: SleepPlatform>(
        &self,
        scheduler: &mut SleepScheduler<P>,
        ports: &mut NodePorts<'_>,
        completions: &CompletionChannel,
    ) -> Result<Infallible, InitError> {
        let cause = scheduler.wake_cause();
        let outcome = self.run_wake_cycle(cause, ports)?;
        self.settle_radio(&outcome, &mut *ports.transport, completions);
        scheduler.request_sleep(outcome.sleep)
    }

    /// Sleep after `run_to_sleep` failed to bring the radio up.  The
    /// retained phase was not advanced, so the next boot retries it.
    pub fn sleep_after_bring_up_failure<P: SleepPlatform>(
        &self,
        scheduler: &mut SleepScheduler<P>,
        failure: InitError,
    ) -> ! {
        error!("NODE: radio bring-up failed ({}), phase kept", failure);
        scheduler.request_sleep(self.config.bring_up_retry_request())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HandoffError, TransportError};
    use crate::power::SleepMode;
    use crate::radio::completion::SendCompletion;
    use crate::radio::transport::{MacAddress, Peer};
    use crate::sensors::{Level, Pin};

    struct Ram(RetainedState);
    impl PhaseStore for Ram {
        fn load(&mut self) -> RetainedState {
            self.0
        }
        fn store(&mut self, state: &RetainedState) {
            self.0 = *state;
        }
    }

    struct Beam(Level);
    impl SensorPort for Beam {
        fn read_digital(&mut self, _pin: Pin) -> Level {
            self.0
        }
        fn set_power(&mut self, _pin: Pin, _on: bool) {}
        fn configure_edge_wake(&mut self, _pin: Pin, _level: Level) {}
        fn release(&mut self, _pin: Pin) {}
    }

    #[derive(Default)]
    struct Radio {
        init_fails: bool,
        shutdowns: usize,
        peers: Vec<Peer>,
    }
    impl Transport for Radio {
        fn init(&mut self) -> Result<(), InitError> {
            if self.init_fails {
                Err(InitError::Wifi(-1))
            } else {
                Ok(())
            }
        }
        fn register_peer(&mut self, peer: &Peer) -> Result<(), TransportError> {
            self.peers.push(*peer);
            Ok(())
        }
        fn peer_channel(&self, address: &MacAddress) -> Option<u8> {
            self.peers.iter().find(|p| p.address == *address).map(|p| p.channel)
        }
        fn send(&mut self, _dest: &MacAddress, _frame: &[u8]) -> Result<(), HandoffError> {
            Ok(())
        }
        fn shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[derive(Default)]
    struct Events(Vec<NodeEvent>);
    impl EventSink for Events {
        fn emit(&mut self, event: &NodeEvent) {
            self.0.push(event.clone());
        }
    }

    #[test]
    fn corrupt_record_runs_initial_read() {
        let mut ram = Ram(RetainedState {
            phase: crate::fsm::PersistedPhase {
                phase: 2,
                integrity_tag: 0,
            },
            pulse_counter: 9,
        });
        let (mut beam, mut radio, mut delay, mut events) =
            (Beam(Level::High), Radio::default(), NoDelay, Events::default());
        let mut ports = NodePorts {
            store: &mut ram,
            sensors: &mut beam,
            transport: &mut radio,
            delay: &mut delay,
            sink: &mut events,
        };

        let node = SensorNode::new(NodeConfig::default());
        let out = node.run_wake_cycle(WakeCause::PowerOn, &mut ports).unwrap();
        assert_eq!(out.ran, Phase::InitialRead);
        assert_eq!(out.stored, RetainedState::new(Phase::InitialRead, 0));
        assert_eq!(out.sleep, SleepRequest::Timer { micros: 43_200_000_000 });
        drop(ports);

        assert_eq!(ram.0, RetainedState::initial());
        assert_eq!(events.0[0], NodeEvent::IntegrityReset);
    }

    #[test]
    fn init_failure_leaves_record_untouched() {
        let before = RetainedState::initial();
        let mut ram = Ram(before);
        let mut radio = Radio {
            init_fails: true,
            ..Default::default()
        };
        let (mut beam, mut delay, mut events) = (Beam(Level::Low), NoDelay, Events::default());
        let mut ports = NodePorts {
            store: &mut ram,
            sensors: &mut beam,
            transport: &mut radio,
            delay: &mut delay,
            sink: &mut events,
        };

        let node = SensorNode::new(NodeConfig::default());
        let err = node.run_wake_cycle(WakeCause::Timer, &mut ports).unwrap_err();
        assert_eq!(err, InitError::Wifi(-1));
        drop(ports);
        assert_eq!(ram.0, before);
    }

    #[test]
    fn settle_waits_for_handoffs_then_shuts_radio() {
        let mut ram = Ram(RetainedState::initial());
        let (mut beam, mut radio, mut delay, mut events) =
            (Beam(Level::Low), Radio::default(), NoDelay, Events::default());
        let node = SensorNode::new(NodeConfig::default());

        let out = {
            let mut ports = NodePorts {
                store: &mut ram,
                sensors: &mut beam,
                transport: &mut radio,
                delay: &mut delay,
                sink: &mut events,
            };
            node.run_wake_cycle(WakeCause::Timer, &mut ports).unwrap()
        };
        assert_eq!(out.transition.sleep, SleepMode::PirStartUp);
        assert_eq!(out.handoffs, 2);

        let channel = CompletionChannel::new();
        for _ in 0..2 {
            completion::post_completion(
                &channel,
                SendCompletion {
                    peer: crate::config::MASTER_MAC,
                    delivered: true,
                },
            );
        }
        let gate = node.settle_radio(&out, &mut radio, &channel);
        assert!(gate.is_open());
        assert_eq!(gate.delivered(), 2);
        assert_eq!(radio.shutdowns, 1);
    }

    #[test]
    fn quiet_cycle_never_touches_radio() {
        let mut ram = Ram(RetainedState::new(Phase::PirWarmup, 0));
        let (mut beam, mut radio, mut delay, mut events) =
            (Beam(Level::High), Radio::default(), NoDelay, Events::default());
        let node = SensorNode::new(NodeConfig::default());
        let out = {
            let mut ports = NodePorts {
                store: &mut ram,
                sensors: &mut beam,
                transport: &mut radio,
                delay: &mut delay,
                sink: &mut events,
            };
            node.run_wake_cycle(WakeCause::Timer, &mut ports).unwrap()
        };
        assert!(!out.radio_up);
        let channel = CompletionChannel::new();
        node.settle_radio(&out, &mut radio, &channel);
        assert_eq!(radio.shutdowns, 0);
    }
}
