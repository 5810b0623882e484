//! Identity and lifecycle tests for the shared object base

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use traffic_junction::simulation::{
    next_sim_id, Completion, Intersection, IntersectionConfig, ObjectKind, Position, SimId,
    Street, TrafficObject, Vehicle,
};

#[test]
fn test_ids_are_unique_across_threads() {
    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(|| {
                (0..200)
                    .map(|i| match i % 3 {
                        0 => Vehicle::new(10.0).id(),
                        1 => Street::new(10.0).id(),
                        _ => next_sim_id(),
                    })
                    .collect::<Vec<SimId>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "Id {:?} handed out twice", id);
        }
    }
    assert_eq!(seen.len(), 8 * 200);
}

#[test]
fn test_ids_increase_monotonically() {
    let first = Vehicle::new(10.0).id();
    let second = Vehicle::new(10.0).id();
    assert!(second > first);
}

#[test]
fn test_object_kind_and_position() {
    let object = TrafficObject::new(ObjectKind::Street);
    assert_eq!(object.kind(), ObjectKind::Street);
    assert_eq!(object.position(), Position::default());

    object.set_position(Position::new(3.0, 4.0));
    assert_eq!(object.position(), Position::new(3.0, 4.0));
    assert_eq!(object.position().distance(&Position::default()), 5.0);
}

#[test]
fn test_drop_joins_background_threads() {
    let finished = Arc::new(AtomicBool::new(false));
    let object = TrafficObject::new(ObjectKind::None);

    let flag = Arc::clone(&finished);
    object
        .spawn("worker", move |stop| {
            while !stop.is_raised() {
                thread::sleep(Duration::from_millis(1));
            }
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
    assert_eq!(object.thread_count(), 1);

    drop(object);
    assert!(finished.load(Ordering::SeqCst));
}

#[test]
fn test_dropping_intersection_stops_its_threads() {
    let intersection = Intersection::new(IntersectionConfig::default());
    intersection.start().unwrap();
    thread::sleep(Duration::from_millis(10));

    let started = std::time::Instant::now();
    drop(intersection);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_street_between_positions() {
    let street = Street::between(&Position::new(0.0, 0.0), &Position::new(20.0, 0.0));
    assert_eq!(street.length(), 20.0);
    assert_eq!(street.position(), Position::new(10.0, 0.0));
}

#[test]
fn test_completion_fulfilled_across_threads() {
    let (fulfiller, waiter) = Completion::pair();
    let handle = thread::spawn(move || waiter.wait());
    thread::sleep(Duration::from_millis(10));
    fulfiller.fulfill();
    assert!(handle.join().unwrap().is_ok());
}

#[test]
fn test_completion_abandoned_when_dropped() {
    let (fulfiller, waiter) = Completion::pair();
    drop(fulfiller);
    assert!(!waiter.is_fulfilled());
    assert!(waiter.wait().is_err());
}

#[test]
fn test_completion_fulfil_is_visible_before_wait() {
    let (fulfiller, waiter) = Completion::pair();
    assert!(!waiter.is_fulfilled());
    fulfiller.fulfill();
    assert!(waiter.is_fulfilled());
    assert!(waiter.wait().is_ok());

    // Fulfilling after the waiter went away is harmless
    let (fulfiller, waiter) = Completion::pair();
    drop(waiter);
    fulfiller.fulfill();
}
