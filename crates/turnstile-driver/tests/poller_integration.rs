//! Integration tests for the register poller
//!
//! These tests drive a real poller task against the mock transport with the
//! Tokio clock paused, so tick intervals, read timeouts and send deadlines
//! elapse instantly and deterministically.

use std::io::ErrorKind;
use std::time::Duration;
use turnstile_core::{
    Event, FramingError, ReadError, RegisterSnapshot, RegisterVector, TransportError,
};
use turnstile_driver::mock::{MockReply, MockTransportHandle};
use turnstile_driver::{BackpressurePolicy, Device, Listener, PollerConfig, PollerExit};

fn counter(input_a: u32) -> RegisterSnapshot {
    RegisterSnapshot {
        input_a,
        ..RegisterSnapshot::default()
    }
}

/// Script a controller whose input A counter advances by one per read.
fn counting_device(last: u32) -> (Device, MockTransportHandle) {
    let (device, handle) = Device::mock();
    handle.extend((0..=last).map(|n| MockReply::Registers(counter(n))));
    (device, handle)
}

/// Assert that no event arrives within `window`.
async fn assert_quiet(listener: &mut Listener, window: Duration) {
    let result = tokio::time::timeout(window, listener.recv()).await;
    assert!(result.is_err(), "unexpected event: {:?}", result);
}

/// Test point read returns the flattened register vector
#[tokio::test]
async fn test_registers_vector_layout() {
    let (device, handle) = Device::mock();
    handle.push_registers(RegisterSnapshot {
        input_a: 1,
        input_b: 2,
        failure: 3,
        alarm: true,
        battery_flag: false,
    });

    let registers = device.registers().await.unwrap();
    assert_eq!(registers, RegisterVector([1, 2, 3, 0, 1]));
}

/// Test three failed ticks are silent and the fourth escalates
#[tokio::test(start_paused = true)]
async fn test_escalation_after_four_failures() {
    let (device, handle) = Device::mock();
    handle.push(MockReply::Error(ErrorKind::BrokenPipe));

    let mut listener = device.listen().unwrap();

    let event = listener.recv().await.unwrap();
    match event {
        Event::Error(escalation) => {
            assert_eq!(escalation.failures, 4);
            assert!(matches!(
                escalation.cause,
                ReadError::Transport(TransportError::Io {
                    kind: ErrorKind::BrokenPipe,
                    ..
                })
            ));
        }
        other => panic!("expected escalation, got {:?}", other),
    }

    assert_eq!(listener.recv().await, None);
    assert_eq!(handle.reads(), 4);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.reads(), 4);
    assert_eq!(listener.shutdown().await, PollerExit::Escalated);
}

/// Test a stalled transport escalates through read timeouts
#[tokio::test(start_paused = true)]
async fn test_escalation_on_read_timeouts() {
    let (device, handle) = Device::mock();
    handle.push(MockReply::Stall);

    let mut listener = device.listen().unwrap();

    assert_eq!(
        listener.recv().await,
        Some(Event::Error(turnstile_core::EscalationError {
            failures: 4,
            cause: TransportError::timeout(600_000).into(),
        }))
    );
    assert_eq!(listener.recv().await, None);
    assert_eq!(handle.reads(), 4);
}

/// Test transient empty reads still count toward escalation
#[tokio::test(start_paused = true)]
async fn test_transient_empty_reads_escalate() {
    let (device, handle) = Device::mock();
    handle.push(MockReply::Empty);

    let mut listener = device.listen().unwrap();

    match listener.recv().await {
        Some(Event::Error(escalation)) => assert!(escalation.cause.is_transient()),
        other => panic!("expected escalation, got {:?}", other),
    }
}

/// Test slow empty reads are classified as non-transient
#[tokio::test(start_paused = true)]
async fn test_slow_empty_reads_escalate() {
    let (device, handle) = Device::mock();
    handle.push(MockReply::EmptyAfter(Duration::from_secs(45)));

    let mut listener = device.listen().unwrap();

    match listener.recv().await {
        Some(Event::Error(escalation)) => {
            assert!(!escalation.cause.is_transient());
            assert!(matches!(
                escalation.cause,
                ReadError::Transport(TransportError::EmptyRead {
                    transient: false,
                    ..
                })
            ));
        }
        other => panic!("expected escalation, got {:?}", other),
    }
}

/// Test a success between failures resets the counter
#[tokio::test(start_paused = true)]
async fn test_success_resets_escalation_counter() {
    let (device, handle) = Device::mock();
    let failure = MockReply::Error(ErrorKind::TimedOut);
    handle.extend([
        failure.clone(),
        failure.clone(),
        failure.clone(),
        MockReply::Registers(counter(0)),
        failure.clone(),
        failure.clone(),
        failure,
        MockReply::Registers(counter(1)),
    ]);

    let mut listener = device.listen().unwrap();

    assert_eq!(listener.recv().await, Some(Event::InputA(1)));
    assert!(!listener.is_finished());
    assert_eq!(listener.shutdown().await, PollerExit::Shutdown);
}

/// Test corrupted and short frames count as failures
#[tokio::test(start_paused = true)]
async fn test_framing_failures_escalate() {
    let (device, handle) = Device::mock();
    let short = turnstile_protocol::encode_request(0x82, 0x10, 0x10, &[0; 8], 8);
    handle.extend([
        MockReply::Frame(vec![0x82, 0x10, 0x10]),
        MockReply::Frame(vec![0x82, 0x10, 0x10, 0x00, 0x00, 0x00]),
        MockReply::Frame(vec![0x82, 0x10, 0x10, 0x00, 0x00, 0xFC]),
        MockReply::Frame(short.to_vec()),
    ]);

    let mut listener = device.listen().unwrap();

    match listener.recv().await {
        Some(Event::Error(escalation)) => {
            assert_eq!(escalation.failures, 4);
            assert_eq!(
                escalation.cause,
                ReadError::Framing(FramingError::PayloadTooShort {
                    expected: 14,
                    actual: 8
                })
            );
        }
        other => panic!("expected escalation, got {:?}", other),
    }
}

/// Test the first snapshot only seeds the baseline
#[tokio::test(start_paused = true)]
async fn test_first_snapshot_is_silent() {
    let (device, handle) = Device::mock();
    handle.extend([
        MockReply::Registers(counter(100)),
        MockReply::Registers(counter(101)),
    ]);

    let mut listener = device.listen().unwrap();
    assert_eq!(listener.recv().await, Some(Event::InputA(101)));
}

/// Test an unchanging controller produces no events
#[tokio::test(start_paused = true)]
async fn test_identical_responses_are_silent() {
    let (device, handle) = Device::mock();
    handle.push_registers(counter(7));

    let mut listener = device.listen().unwrap();
    assert_quiet(&mut listener, Duration::from_secs(30)).await;

    assert!(handle.reads() >= 29);
    assert_eq!(listener.shutdown().await, PollerExit::Shutdown);
}

/// Test counter jumps outside the pulse guard are not reported
#[tokio::test(start_paused = true)]
async fn test_counter_jump_not_reported() {
    let (device, handle) = Device::mock();
    handle.extend([
        MockReply::Registers(counter(10)),
        MockReply::Registers(counter(40)),
        MockReply::Registers(counter(5)),
        MockReply::Registers(counter(6)),
    ]);

    let mut listener = device.listen().unwrap();
    assert_eq!(listener.recv().await, Some(Event::InputA(6)));
}

/// Test a point read while listening does not disturb the poller
#[tokio::test(start_paused = true)]
async fn test_point_read_while_listening() {
    let (device, handle) = Device::mock();
    handle.push_registers(counter(3));

    let mut listener = device.listen().unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let registers = device.registers().await.unwrap();
    assert_eq!(registers, RegisterVector([3, 0, 0, 0, 0]));

    assert_quiet(&mut listener, Duration::from_secs(5)).await;
}

/// Test a draining consumer sees every event in order, for both policies
#[tokio::test(start_paused = true)]
async fn test_draining_consumer_receives_all() {
    for policy in [
        BackpressurePolicy::default(),
        BackpressurePolicy::DropOldest,
    ] {
        let (device, _handle) = counting_device(10);
        let config = PollerConfig::default().with_backpressure(policy);
        let mut listener = device.listen_with(config).unwrap();

        for expected in 1..=10 {
            assert_eq!(listener.recv().await, Some(Event::InputA(expected)));
        }
        assert_eq!(listener.lost_events(), 0);
        assert_eq!(listener.shutdown().await, PollerExit::Shutdown);
    }
}

/// Test a stalled consumer under BlockWithDeadline keeps the oldest events
#[tokio::test(start_paused = true)]
async fn test_stalled_consumer_block_with_deadline() {
    let (device, _handle) = counting_device(20);
    let mut listener = device.listen().unwrap();

    tokio::time::sleep(Duration::from_secs(300)).await;

    for expected in 1..=4 {
        assert_eq!(listener.recv().await, Some(Event::InputA(expected)));
    }
    assert_quiet(&mut listener, Duration::from_secs(10)).await;
    assert!(!listener.is_finished());
}

/// Test escalation still ends the poller when the consumer never drains
#[tokio::test(start_paused = true)]
async fn test_escalation_with_stalled_consumer() {
    let (device, handle) = Device::mock();
    handle.extend([
        MockReply::Registers(counter(0)),
        MockReply::Registers(counter(1)),
        MockReply::Error(ErrorKind::BrokenPipe),
    ]);
    let config = PollerConfig::default().with_channel_capacity(1);
    let mut listener = device.listen_with(config).unwrap();

    // Seed at 1s, InputA(1) fills the channel at 2s, escalation at 6s,
    // the error event gives up after the 3s send deadline.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(listener.is_finished());
    assert_eq!(handle.reads(), 6);

    assert_eq!(listener.recv().await, Some(Event::InputA(1)));
    assert_eq!(listener.recv().await, None);
    assert_eq!(listener.shutdown().await, PollerExit::Escalated);
}

/// Test a stalled consumer under DropOldest keeps the newest events
#[tokio::test(start_paused = true)]
async fn test_stalled_consumer_drop_oldest() {
    let (device, _handle) = counting_device(20);
    let config = PollerConfig::default().with_backpressure(BackpressurePolicy::DropOldest);
    let mut listener = device.listen_with(config).unwrap();

    tokio::time::sleep(Duration::from_secs(60)).await;

    for expected in 17..=20 {
        assert_eq!(listener.recv().await, Some(Event::InputA(expected)));
    }
    assert_eq!(listener.lost_events(), 16);
}

/// Test shutdown interrupts a read in progress
#[tokio::test(start_paused = true)]
async fn test_shutdown_during_read() {
    let (device, handle) = Device::mock();
    handle.push(MockReply::Stall);

    let listener = device.listen().unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.reads(), 1);

    let exit = tokio::time::timeout(Duration::from_secs(1), listener.shutdown())
        .await
        .unwrap();
    assert_eq!(exit, PollerExit::Shutdown);
}

/// Test dropping the listener stops polling
#[tokio::test(start_paused = true)]
async fn test_drop_listener_stops_polling() {
    let (device, handle) = Device::mock();
    handle.push_registers(counter(0));

    let listener = device.listen().unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    let reads = handle.reads();
    assert_eq!(reads, 3);

    drop(listener);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.reads(), reads);
}

/// Test invalid poller configuration is rejected up front
#[tokio::test]
async fn test_invalid_config() {
    let (device, _handle) = Device::mock();
    let config = PollerConfig::default().with_tick_interval(Duration::ZERO);
    assert!(device.listen_with(config).is_err());
}
