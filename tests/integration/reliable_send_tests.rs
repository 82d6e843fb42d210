//! Reliable send through a whole wake cycle: retries, the error broadcast
//! fallback, and what the receiver makes of the frames.

use mailwatch::app::events::NodeEvent;
use mailwatch::app::service::SensorNode;
use mailwatch::config::{MASTER_MAC, NodeConfig};
use mailwatch::error::SendFailure;
use mailwatch::fsm::Phase;
use mailwatch::power::{SleepMode, WakeCause};
use mailwatch::radio::codec::MessageKind;
use mailwatch::radio::reliable::ERROR_BROADCAST_TEXT;
use mailwatch::radio::transport::{BROADCAST, Datagram, Transport};
use mailwatch::receiver::{self, Indicator, MailboxIndicator};
use mailwatch::sensors::Level;

use super::mock_hw::{Rig, test_config};

#[test]
fn transient_rejections_are_retried() {
    let node = SensorNode::new(test_config());
    let mut rig = Rig::cold_boot();
    rig.gpio.set_beam(Level::Low);
    rig.radio.reject_next(2);

    let out = rig.cycle(&node, WakeCause::PowerOn);
    assert_eq!(out.transition.next, Phase::PirWarmup);
    assert_eq!(
        rig.sink.count(|e| matches!(e, NodeEvent::AttemptRejected { .. })),
        2
    );
    assert!(rig.sink.events.contains(&NodeEvent::Sent {
        peer: MASTER_MAC,
        kind: MessageKind::Normal,
        attempt: 3,
    }));
    assert_eq!(rig.radio.sent().len(), 2);
}

#[test]
fn exhausted_greeting_broadcasts_error_and_stays() {
    let cfg = test_config();
    let node = SensorNode::new(cfg.clone());
    let mut rig = Rig::cold_boot();
    rig.gpio.set_beam(Level::Low);
    rig.radio.reject_next(usize::from(cfg.send_attempts));

    let out = rig.cycle(&node, WakeCause::PowerOn);
    assert_eq!(out.transition.next, Phase::InitialRead);
    assert_eq!(out.transition.sleep, SleepMode::Idle);

    assert!(rig.sink.events.contains(&NodeEvent::SendFailed(
        SendFailure::AllAttemptsFailed {
            attempts: cfg.send_attempts
        }
    )));

    // Only the broadcast got through; the reading was never attempted.
    let sent = rig.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, BROADCAST);
    assert_eq!(sent[0].1.kind, MessageKind::ErrorBroadcast);
    assert_eq!(sent[0].1.text.as_str(), ERROR_BROADCAST_TEXT);
    assert_eq!(out.handoffs, 1);
}

#[test]
fn zero_attempts_goes_straight_to_broadcast() {
    let node = SensorNode::new(NodeConfig {
        send_attempts: 0,
        ..test_config()
    });
    let mut rig = Rig::cold_boot();
    rig.gpio.set_beam(Level::Low);

    let out = rig.cycle(&node, WakeCause::PowerOn);
    assert_eq!(out.transition.next, Phase::InitialRead);
    assert_eq!(
        rig.sink.count(|e| matches!(e, NodeEvent::AttemptRejected { .. })),
        0
    );
    let sent = rig.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, BROADCAST);
}

#[test]
fn broadcast_peer_follows_intended_channel() {
    let cfg = test_config();
    let node = SensorNode::new(cfg.clone());
    let mut rig = Rig::cold_boot();
    rig.gpio.set_beam(Level::Low);
    rig.radio.reject_next(usize::from(cfg.send_attempts));

    // Keep the radio up after the cycle to inspect the peer table.
    let mut ports = rig.ports();
    node.run_wake_cycle(WakeCause::PowerOn, &mut ports)
        .expect("sim bring-up succeeds");
    assert_eq!(rig.radio.peer_channel(&BROADCAST), Some(cfg.channel));
}

#[test]
fn receiver_mirrors_node_reports() {
    let node = SensorNode::new(test_config());
    let mut rig = Rig::cold_boot();
    let mut indicator = MailboxIndicator::new();

    // Mail arrives.
    rig.gpio.set_beam(Level::Low);
    rig.cycle(&node, WakeCause::PowerOn);
    for (_, bytes) in rig.radio.sent() {
        receiver::handle_datagram(&mut indicator, &Datagram::new(mailwatch::config::SENSOR_MAC, bytes));
    }
    assert_eq!(indicator.current(), Indicator::MAIL);

    // Walk to the retrieval check and take the mail out.
    rig.cycle(&node, WakeCause::Timer);
    rig.cycle(&node, WakeCause::Timer);
    rig.gpio.set_beam(Level::High);
    rig.cycle(&node, WakeCause::Pin);

    let (_, last) = rig.radio.sent().last().expect("emptied report sent");
    let change = receiver::handle_datagram(
        &mut indicator,
        &Datagram::new(mailwatch::config::SENSOR_MAC, last),
    );
    assert_eq!(change, Some(Indicator::EMPTY));
}
