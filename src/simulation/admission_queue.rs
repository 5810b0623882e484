//! FIFO of vehicles waiting to enter one intersection

use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::completion::Fulfiller;
use super::traffic_object::lock;
use super::types::SimId;
use super::vehicle::Vehicle;

/// A vehicle waiting for entry together with the handle that releases it
#[derive(Debug)]
struct PendingEntry {
    vehicle: Arc<Vehicle>,
    fulfiller: Fulfiller,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<PendingEntry>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct AdmissionQueue {
    state: Mutex<QueueState>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vehicles currently waiting
    pub fn size(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Ids of the waiting vehicles, oldest first
    pub fn waiting(&self) -> Vec<SimId> {
        lock(&self.state)
            .entries
            .iter()
            .map(|entry| entry.vehicle.id())
            .collect()
    }

    /// Append a request at the tail. Never blocks.
    /// On a closed queue the fulfiller is dropped at once, which abandons it.
    pub fn enqueue(&self, vehicle: Arc<Vehicle>, fulfiller: Fulfiller) {
        let mut state = lock(&self.state);
        if state.closed {
            debug!("Queue closed, rejecting vehicle {}", vehicle.id());
            return;
        }
        state.entries.push_back(PendingEntry { vehicle, fulfiller });
    }

    /// Remove the oldest request and release its caller.
    /// Returns the granted vehicle, or `None` if nobody is waiting.
    pub fn grant_head(&self) -> Option<Arc<Vehicle>> {
        let entry = lock(&self.state).entries.pop_front()?;
        // Removal is visible before the caller wakes up
        entry.fulfiller.fulfill();
        Some(entry.vehicle)
    }

    /// Refuse further requests and abandon every pending one
    pub fn close(&self) -> usize {
        let drained: Vec<PendingEntry> = {
            let mut state = lock(&self.state);
            state.closed = true;
            state.entries.drain(..).collect()
        };
        drained.len()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }
}
