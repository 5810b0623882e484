//! Shared base state of every simulated entity
//!
//! A `TrafficObject` carries the process-unique id, the kind tag and the
//! position, and owns the background threads of its entity. Dropping it
//! raises the stop flag and then joins every owned thread.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use super::types::{ObjectKind, Position, SimId};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Allocate the next process-unique id. Ids are never reused.
pub fn next_sim_id() -> SimId {
    SimId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Lock a mutex, recovering the data if another thread panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cooperative cancellation flag shared with background threads
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct TrafficObject {
    id: SimId,
    kind: ObjectKind,
    position: Mutex<Position>,
    stop: StopFlag,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl TrafficObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            id: next_sim_id(),
            kind,
            position: Mutex::new(Position::default()),
            stop: StopFlag::new(),
            threads: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> SimId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        *lock(&self.position)
    }

    pub fn set_position(&self, position: Position) {
        *lock(&self.position) = position;
    }

    /// The stop flag handed to every thread this object spawns
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Spawn a named background thread owned by this object
    pub fn spawn<F>(&self, name: &str, task: F) -> Result<()>
    where
        F: FnOnce(StopFlag) + Send + 'static,
    {
        let stop = self.stop_flag();
        let thread_name = format!("{}-{}", name, self.id.0);
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || task(stop))
            .with_context(|| format!("Failed to spawn thread {}", thread_name))?;
        lock(&self.threads).push(handle);
        Ok(())
    }

    /// Raise the stop flag without waiting for threads to finish
    pub fn request_stop(&self) {
        self.stop.raise();
    }

    /// Number of background threads that have been spawned and not yet joined
    pub fn thread_count(&self) -> usize {
        lock(&self.threads).len()
    }

    /// Raise the stop flag and join every owned thread
    pub fn join_all(&self) {
        self.stop.raise();
        let handles: Vec<JoinHandle<()>> = lock(&self.threads).drain(..).collect();
        for handle in handles {
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if handle.join().is_err() {
                warn!("{:?} {}: thread {} panicked", self.kind, self.id, name);
            } else {
                debug!("{:?} {}: joined thread {}", self.kind, self.id, name);
            }
        }
    }
}

impl Drop for TrafficObject {
    fn drop(&mut self) {
        self.join_all();
    }
}
