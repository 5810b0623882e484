//! Intersection admission control
//!
//! Vehicles queue up in arrival order. A dispatcher thread lets the vehicle
//! at the head of the queue in whenever the intersection is vacant, and the
//! admitted vehicle holds the intersection until it reports its departure.
//! An admitted vehicle still waits for a green light before crossing.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use super::admission_queue::AdmissionQueue;
use super::completion::Completion;
use super::config::IntersectionConfig;
use super::street::Street;
use super::traffic_light::TrafficLight;
use super::traffic_object::{lock, StopFlag, TrafficObject};
use super::types::{ObjectKind, Phase, Position, SimId};
use super::vehicle::Vehicle;

/// Who currently holds the crossing right
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Vacant,
    Occupied(SimId),
}

pub struct Intersection {
    object: TrafficObject,
    light: TrafficLight,
    queue: Arc<AdmissionQueue>,
    occupancy: Arc<Mutex<Occupancy>>,
    /// Streets connected to this intersection, in connection order
    streets: Mutex<Vec<Arc<Street>>>,
    config: IntersectionConfig,
    started: AtomicBool,
    /// Vehicles that have crossed and left
    departures: AtomicUsize,
}

impl Intersection {
    pub fn new(config: IntersectionConfig) -> Self {
        Self::with_light(config, TrafficLight::new(config.light))
    }

    /// Create an intersection whose light timings are reproducible
    pub fn with_seed(config: IntersectionConfig, seed: u64) -> Self {
        Self::with_light(config, TrafficLight::with_seed(config.light, seed))
    }

    fn with_light(config: IntersectionConfig, light: TrafficLight) -> Self {
        Self {
            object: TrafficObject::new(ObjectKind::Intersection),
            light,
            queue: Arc::new(AdmissionQueue::new()),
            occupancy: Arc::new(Mutex::new(Occupancy::Vacant)),
            streets: Mutex::new(Vec::new()),
            config,
            started: AtomicBool::new(false),
            departures: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> SimId {
        self.object.id()
    }

    pub fn position(&self) -> Position {
        self.object.position()
    }

    pub fn set_position(&self, position: Position) {
        self.object.set_position(position);
    }

    pub fn light(&self) -> &TrafficLight {
        &self.light
    }

    /// Register an adjoining street
    pub fn connect(&self, street: Arc<Street>) {
        lock(&self.streets).push(street);
    }

    /// Every connected street except `incoming`
    pub fn outgoing_streets(&self, incoming: &Street) -> Vec<Arc<Street>> {
        lock(&self.streets)
            .iter()
            .filter(|street| street.id() != incoming.id())
            .cloned()
            .collect()
    }

    pub fn street_count(&self) -> usize {
        lock(&self.streets).len()
    }

    pub fn light_is_green(&self) -> bool {
        self.light.current_phase() == Phase::Green
    }

    /// Number of vehicles waiting for admission
    pub fn queue_len(&self) -> usize {
        self.queue.size()
    }

    /// Ids of the waiting vehicles, oldest first
    pub fn waiting_vehicles(&self) -> Vec<SimId> {
        self.queue.waiting()
    }

    /// The vehicle currently holding the crossing right, if any
    pub fn occupant(&self) -> Option<SimId> {
        match *lock(&self.occupancy) {
            Occupancy::Vacant => None,
            Occupancy::Occupied(id) => Some(id),
        }
    }

    /// Number of vehicles that have crossed and reported their departure
    pub fn departures(&self) -> usize {
        self.departures.load(Ordering::Relaxed)
    }

    /// Start the traffic light and the admission dispatcher
    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            bail!("Intersection {} already started", self.id());
        }
        self.light
            .start()
            .with_context(|| format!("Failed to start light of intersection {}", self.id()))?;

        let id = self.id();
        let queue = Arc::clone(&self.queue);
        let occupancy = Arc::clone(&self.occupancy);
        let poll_interval = self.config.poll_interval;
        self.object.spawn("dispatcher", move |stop| {
            process_vehicle_queue(id, &queue, &occupancy, poll_interval, &stop)
        })
    }

    /// Block until `vehicle` is admitted and the light is green.
    /// Fails only if the intersection shuts down while the vehicle waits.
    pub fn request_entry(&self, vehicle: &Arc<Vehicle>) -> Result<()> {
        debug!(
            "Intersection {}: vehicle {} queued from thread {:?}",
            self.id(),
            vehicle.id(),
            thread::current().id()
        );

        let (fulfiller, waiter) = Completion::pair();
        self.queue.enqueue(Arc::clone(vehicle), fulfiller);
        waiter.wait().with_context(|| {
            format!(
                "Intersection {} shut down before vehicle {} was admitted",
                self.id(),
                vehicle.id()
            )
        })?;

        info!(
            "Intersection {}: vehicle {} is granted entry",
            self.id(),
            vehicle.id()
        );

        if !self.light_is_green() {
            if let Err(e) = self.light.wait_for_green() {
                // The vehicle never crossed, so it gives up the crossing right
                self.vacate(vehicle.id());
                return Err(e);
            }
        }
        Ok(())
    }

    fn vacate(&self, vehicle: SimId) {
        let mut occupancy = lock(&self.occupancy);
        if *occupancy == Occupancy::Occupied(vehicle) {
            *occupancy = Occupancy::Vacant;
        }
    }

    /// Release the crossing right held by `vehicle`
    pub fn notify_departure(&self, vehicle: &Vehicle) {
        let mut occupancy = lock(&self.occupancy);
        match *occupancy {
            Occupancy::Occupied(id) if id == vehicle.id() => {
                *occupancy = Occupancy::Vacant;
                self.departures.fetch_add(1, Ordering::Relaxed);
                info!("Intersection {}: vehicle {} has left", self.id(), id);
                debug!("Intersection {}: occupancy=Vacant", self.id());
            }
            other => {
                warn!(
                    "Intersection {}: departure of vehicle {} ignored, occupancy is {:?}",
                    self.id(),
                    vehicle.id(),
                    other
                );
            }
        }
    }

    /// Stop the background threads and release every blocked caller.
    /// Threads are joined when the intersection is dropped.
    pub fn shutdown(&self) {
        self.object.request_stop();
        let abandoned = self.queue.close();
        if abandoned > 0 {
            debug!(
                "Intersection {}: released {} waiting vehicles on shutdown",
                self.id(),
                abandoned
            );
        }
        self.light.shutdown();
    }
}

impl Drop for Intersection {
    fn drop(&mut self) {
        self.shutdown();
        self.object.join_all();
    }
}

fn process_vehicle_queue(
    id: SimId,
    queue: &AdmissionQueue,
    occupancy: &Mutex<Occupancy>,
    poll_interval: std::time::Duration,
    stop: &StopFlag,
) {
    info!(
        "Intersection {}: dispatcher thread {:?} started",
        id,
        thread::current().id()
    );

    while !stop.is_raised() {
        thread::sleep(poll_interval);

        let mut current = lock(occupancy);
        if *current != Occupancy::Vacant || queue.size() == 0 {
            continue;
        }
        // Occupancy is recorded before the vehicle wakes, so its departure
        // always finds itself as the occupant.
        if let Some(vehicle) = queue.grant_head() {
            *current = Occupancy::Occupied(vehicle.id());
            debug!(
                "Intersection {}: occupancy=Occupied({})",
                id,
                vehicle.id()
            );
        }
    }

    debug!("Intersection {}: dispatcher thread stopped", id);
}
