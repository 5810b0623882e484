//! Phase transition channel between a traffic light and its observers
//!
//! Delivery is broadcast: every subscriber keeps its own cursor into a
//! bounded history of transitions, so each receiver drains transitions in
//! the order they were sent and no receiver can steal a transition from
//! another one. A receiver that falls more than `capacity` transitions
//! behind skips ahead to the oldest transition still retained.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::traffic_object::lock;
use super::types::Phase;

/// Default number of transitions retained for slow receivers
pub const DEFAULT_SIGNAL_CAPACITY: usize = 16;

#[derive(Debug)]
struct SignalState {
    history: VecDeque<Phase>,
    /// Sequence number of `history[0]`
    first_seq: u64,
    closed: bool,
}

impl SignalState {
    fn next_seq(&self) -> u64 {
        self.first_seq + self.history.len() as u64
    }

    /// Take the transition at `cursor`, skipping forward if it was evicted
    fn take(&self, cursor: &mut u64) -> Option<Phase> {
        if *cursor < self.first_seq {
            *cursor = self.first_seq;
        }
        let index = (*cursor - self.first_seq) as usize;
        let phase = self.history.get(index).copied()?;
        *cursor += 1;
        Some(phase)
    }
}

#[derive(Debug)]
pub struct PhaseSignal {
    state: Mutex<SignalState>,
    changed: Condvar,
    capacity: usize,
}

impl Default for PhaseSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseSignal {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SIGNAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(SignalState {
                history: VecDeque::with_capacity(capacity),
                first_seq: 0,
                closed: false,
            }),
            changed: Condvar::new(),
            capacity,
        }
    }

    /// Publish a transition to every subscriber.
    /// Returns false if the signal has already been closed.
    pub fn send(&self, phase: Phase) -> bool {
        let mut state = lock(&self.state);
        if state.closed {
            return false;
        }
        if state.history.len() == self.capacity {
            state.history.pop_front();
            state.first_seq += 1;
        }
        state.history.push_back(phase);
        self.changed.notify_all();
        true
    }

    /// Start receiving transitions sent from now on
    pub fn subscribe(self: &Arc<Self>) -> PhaseReceiver {
        let cursor = lock(&self.state).next_seq();
        PhaseReceiver {
            signal: Arc::clone(self),
            cursor,
        }
    }

    /// Close the signal and wake every blocked receiver
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Total number of transitions ever sent
    pub fn sent_count(&self) -> u64 {
        lock(&self.state).next_seq()
    }
}

/// One subscriber's view of a `PhaseSignal`
#[derive(Debug)]
pub struct PhaseReceiver {
    signal: Arc<PhaseSignal>,
    cursor: u64,
}

impl PhaseReceiver {
    /// Block until the next transition arrives.
    /// Returns `None` once the signal is closed and nothing is left to drain.
    pub fn recv(&mut self) -> Option<Phase> {
        let mut state = lock(&self.signal.state);
        loop {
            if let Some(phase) = state.take(&mut self.cursor) {
                return Some(phase);
            }
            if state.closed {
                return None;
            }
            state = self
                .signal
                .changed
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like `recv`, but gives up after `timeout`
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Phase> {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.signal.state);
        loop {
            if let Some(phase) = state.take(&mut self.cursor) {
                return Some(phase);
            }
            let now = Instant::now();
            if state.closed || now >= deadline {
                return None;
            }
            state = self
                .signal
                .changed
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Take the next buffered transition without blocking
    pub fn try_recv(&mut self) -> Option<Phase> {
        lock(&self.signal.state).take(&mut self.cursor)
    }
}
