//! Traffic light and phase signal tests

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use traffic_junction::simulation::{LightTiming, Phase, PhaseSignal, TrafficLight};

/// One time unit for these tests
const UNIT: Duration = Duration::from_millis(20);

/// Allowance for scheduling delays on a busy machine
const JITTER: Duration = Duration::from_millis(60);

fn test_timing() -> LightTiming {
    LightTiming::scaled(UNIT)
}

#[test]
fn test_light_starts_red() {
    let light = TrafficLight::new(test_timing());
    assert_eq!(light.current_phase(), Phase::Red);
    assert_eq!(light.timing().min_phase, UNIT * 4);
    assert_eq!(light.timing().max_phase, UNIT * 6);
}

/// Observe the light for 20 time units
#[test]
fn test_phases_alternate_within_bounds() {
    let timing = test_timing();
    let light = TrafficLight::with_seed(timing, 42);
    let mut receiver = light.subscribe();

    let started = Instant::now();
    light.start().unwrap();

    let observe_for = UNIT * 20;
    let mut transitions: Vec<(Phase, Instant)> = Vec::new();
    while started.elapsed() < observe_for {
        let remaining = observe_for.saturating_sub(started.elapsed());
        if let Some(phase) = receiver.recv_timeout(remaining) {
            transitions.push((phase, Instant::now()));
        }
    }

    assert!(
        transitions.len() >= 2,
        "Expected at least two transitions, got {}",
        transitions.len()
    );

    // Red is the initial phase, so the first transition is to green
    assert_eq!(transitions[0].0, Phase::Green);
    for pair in transitions.windows(2) {
        assert_ne!(pair[0].0, pair[1].0, "Consecutive phases must differ");
    }

    let first_after = transitions[0].1 - started;
    assert!(
        first_after <= timing.max_phase + JITTER,
        "First transition took {:?}",
        first_after
    );

    for pair in transitions.windows(2) {
        let held = pair[1].1 - pair[0].1;
        assert!(
            held <= timing.max_phase + JITTER,
            "Phase held for {:?}",
            held
        );
        assert!(
            held + JITTER >= timing.min_phase,
            "Phase held for only {:?}",
            held
        );
    }
}

#[test]
fn test_every_subscriber_sees_every_transition() {
    let light = TrafficLight::new(test_timing());
    let mut first = light.subscribe();
    let mut second = light.subscribe();
    light.start().unwrap();

    let timeout = UNIT * 6 + JITTER;
    let a: Vec<Phase> = (0..2).filter_map(|_| first.recv_timeout(timeout)).collect();
    let b: Vec<Phase> = (0..2).filter_map(|_| second.recv_timeout(timeout)).collect();

    assert_eq!(a, vec![Phase::Green, Phase::Red]);
    assert_eq!(a, b);
}

#[test]
fn test_concurrent_waiters_all_released_by_one_green() {
    let light = Arc::new(TrafficLight::new(test_timing()));

    let waiters: Vec<_> = (0..5)
        .map(|_| {
            let light = Arc::clone(&light);
            thread::spawn(move || light.wait_for_green())
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    let started = Instant::now();
    light.start().unwrap();

    for waiter in waiters {
        assert!(waiter.join().unwrap().is_ok());
    }
    // All of them got through on the first green rather than later cycles
    assert!(started.elapsed() < UNIT * 6 + JITTER);
}

#[test]
fn test_wait_for_green_returns_at_once_when_green() {
    let light = TrafficLight::new(test_timing());
    let mut receiver = light.subscribe();
    light.start().unwrap();

    assert_eq!(receiver.recv_timeout(UNIT * 6 + JITTER), Some(Phase::Green));
    let started = Instant::now();
    light.wait_for_green().unwrap();
    assert!(started.elapsed() < UNIT);
}

#[test]
fn test_shutdown_releases_green_waiters() {
    let light = Arc::new(TrafficLight::new(test_timing()));
    let waiter = {
        let light = Arc::clone(&light);
        thread::spawn(move || light.wait_for_green())
    };

    // Never started, so green never comes
    thread::sleep(Duration::from_millis(20));
    light.shutdown();
    assert!(waiter.join().unwrap().is_err());
}

#[test]
fn test_start_twice_fails() {
    let light = TrafficLight::new(test_timing());
    assert!(light.start().is_ok());
    assert!(light.start().is_err());
}

#[test]
fn test_drop_stops_cycle_thread() {
    let light = TrafficLight::new(test_timing());
    let mut receiver = light.subscribe();
    light.start().unwrap();

    let started = Instant::now();
    drop(light);
    assert!(started.elapsed() < Duration::from_secs(1));

    // Drain whatever was sent before the light went away
    while receiver.try_recv().is_some() {}
    assert_eq!(receiver.recv(), None);
}

#[test]
fn test_signal_buffers_transitions_in_order() {
    let signal = Arc::new(PhaseSignal::new());
    let mut receiver = signal.subscribe();

    assert!(signal.send(Phase::Green));
    assert!(signal.send(Phase::Red));
    assert!(signal.send(Phase::Green));

    assert_eq!(receiver.try_recv(), Some(Phase::Green));
    assert_eq!(receiver.try_recv(), Some(Phase::Red));
    assert_eq!(receiver.try_recv(), Some(Phase::Green));
    assert_eq!(receiver.try_recv(), None);
    assert_eq!(signal.sent_count(), 3);
}

#[test]
fn test_signal_subscriber_only_sees_later_transitions() {
    let signal = Arc::new(PhaseSignal::new());
    signal.send(Phase::Green);

    let mut receiver = signal.subscribe();
    assert_eq!(receiver.try_recv(), None);

    signal.send(Phase::Red);
    assert_eq!(receiver.try_recv(), Some(Phase::Red));
}

#[test]
fn test_lagging_receiver_skips_to_oldest_retained() {
    let signal = Arc::new(PhaseSignal::with_capacity(2));
    let mut receiver = signal.subscribe();

    signal.send(Phase::Green);
    signal.send(Phase::Red);
    signal.send(Phase::Green);
    signal.send(Phase::Red);

    assert_eq!(receiver.try_recv(), Some(Phase::Green));
    assert_eq!(receiver.try_recv(), Some(Phase::Red));
    assert_eq!(receiver.try_recv(), None);
}

#[test]
fn test_closed_signal_drains_then_ends() {
    let signal = Arc::new(PhaseSignal::new());
    let mut receiver = signal.subscribe();

    signal.send(Phase::Green);
    signal.close();

    assert!(signal.is_closed());
    assert!(!signal.send(Phase::Red));
    assert_eq!(receiver.recv(), Some(Phase::Green));
    assert_eq!(receiver.recv(), None);
}

#[test]
fn test_blocked_receiver_wakes_on_send() {
    let signal = Arc::new(PhaseSignal::new());
    let mut receiver = signal.subscribe();

    let handle = thread::spawn(move || receiver.recv());
    thread::sleep(Duration::from_millis(20));
    signal.send(Phase::Green);

    assert_eq!(handle.join().unwrap(), Some(Phase::Green));
}
