//! Traffic light with a background phase cycle
//!
//! The light starts red and toggles between red and green forever, holding
//! each phase for a random duration drawn from its `LightTiming`. Every
//! toggle is published on the light's `PhaseSignal`.

use anyhow::{bail, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::config::LightTiming;
use super::phase_signal::{PhaseReceiver, PhaseSignal};
use super::traffic_object::{lock, StopFlag, TrafficObject};
use super::types::{ObjectKind, Phase, SimId};

pub struct TrafficLight {
    object: TrafficObject,
    phase: Arc<Mutex<Phase>>,
    signal: Arc<PhaseSignal>,
    timing: LightTiming,
    /// Seeded RNG handed to the cycle thread on start
    rng: Mutex<Option<StdRng>>,
    started: AtomicBool,
}

impl TrafficLight {
    fn new_internal(timing: LightTiming, rng: Option<StdRng>) -> Self {
        Self {
            object: TrafficObject::new(ObjectKind::TrafficLight),
            phase: Arc::new(Mutex::new(Phase::Red)),
            signal: Arc::new(PhaseSignal::new()),
            timing,
            rng: Mutex::new(rng),
            started: AtomicBool::new(false),
        }
    }

    pub fn new(timing: LightTiming) -> Self {
        Self::new_internal(timing, None)
    }

    /// Create a light whose phase durations are reproducible
    pub fn with_seed(timing: LightTiming, seed: u64) -> Self {
        Self::new_internal(timing, Some(StdRng::seed_from_u64(seed)))
    }

    pub fn id(&self) -> SimId {
        self.object.id()
    }

    pub fn timing(&self) -> &LightTiming {
        &self.timing
    }

    pub fn current_phase(&self) -> Phase {
        *lock(&self.phase)
    }

    /// Receive every transition published from now on
    pub fn subscribe(&self) -> PhaseReceiver {
        self.signal.subscribe()
    }

    /// Launch the phase cycle on a background thread
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            bail!("TrafficLight {} already started", self.id());
        }
        let rng = lock(&self.rng)
            .take()
            .unwrap_or_else(|| StdRng::from_rng(&mut rand::rng()));
        let id = self.id();
        let phase = Arc::clone(&self.phase);
        let signal = Arc::clone(&self.signal);
        let timing = self.timing;
        self.object.spawn("traffic-light", move |stop| {
            cycle_through_phases(id, &phase, &signal, timing, rng, &stop)
        })
    }

    /// Block until the light is green.
    /// Fails if the light shuts down first.
    pub fn wait_for_green(&self) -> Result<()> {
        // Subscribe before reading the phase so a toggle in between is not lost
        let mut receiver = self.subscribe();
        if self.current_phase().is_green() {
            return Ok(());
        }
        while let Some(phase) = receiver.recv() {
            if phase.is_green() {
                return Ok(());
            }
        }
        bail!("TrafficLight {} shut down while waiting for green", self.id())
    }

    /// Stop cycling and release everyone waiting for green
    pub fn shutdown(&self) {
        self.object.request_stop();
        self.signal.close();
    }
}

impl Drop for TrafficLight {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn draw_duration(rng: &mut StdRng, timing: &LightTiming) -> Duration {
    if timing.max_phase <= timing.min_phase {
        return timing.min_phase;
    }
    rng.random_range(timing.min_phase..=timing.max_phase)
}

fn cycle_through_phases(
    id: SimId,
    phase: &Mutex<Phase>,
    signal: &PhaseSignal,
    timing: LightTiming,
    mut rng: StdRng,
    stop: &StopFlag,
) {
    info!(
        "TrafficLight {}: cycle thread {:?} started",
        id,
        thread::current().id()
    );

    let mut cycle_duration = draw_duration(&mut rng, &timing);
    let mut last_update = Instant::now();

    while !stop.is_raised() {
        thread::sleep(timing.poll_interval);

        if last_update.elapsed() < cycle_duration {
            continue;
        }

        let next = {
            let mut current = lock(phase);
            *current = current.toggled();
            *current
        };
        debug!(
            "TrafficLight {}: {:?} after {:?}",
            id,
            next,
            last_update.elapsed()
        );
        if !signal.send(next) {
            break;
        }

        last_update = Instant::now();
        cycle_duration = draw_duration(&mut rng, &timing);
    }

    debug!("TrafficLight {}: cycle thread stopped", id);
}
