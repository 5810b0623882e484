//! Headless simulation world that drives vehicles through intersections
//!
//! This is the entry point for running the traffic simulation. It builds a
//! grid of signalled intersections, runs one thread per vehicle for a fixed
//! wall-clock time and then shuts everything down.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::config::SimConfig;
use super::intersection::Intersection;
use super::road_network::RoadNetwork;
use super::street::Street;
use super::traffic_object::StopFlag;
use super::types::{Position, SimId};
use super::vehicle::Vehicle;

/// Distance between neighbouring grid intersections
pub const GRID_SPACING: f64 = 20.0;

/// Vehicle speeds, in distance units per time unit
pub const MIN_VEHICLE_SPEED: f64 = 15.0;
pub const MAX_VEHICLE_SPEED: f64 = 30.0;

/// Time a vehicle spends inside an intersection, in time units
pub const CROSSING_UNITS: f64 = 0.5;

/// Longest uninterrupted sleep of a vehicle thread
const VEHICLE_TICK: Duration = Duration::from_millis(5);

/// Totals reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimSummary {
    pub vehicles: usize,
    pub intersections: usize,
    pub streets: usize,
    pub crossings: usize,
    /// Vehicles still queued when the run ended
    pub still_waiting: usize,
}

/// The main simulation world
pub struct SimWorld {
    /// Street network holding every intersection
    pub network: Arc<RoadNetwork>,

    pub vehicles: Vec<Arc<Vehicle>>,

    config: SimConfig,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,

    crossings: Arc<AtomicUsize>,
}

impl SimWorld {
    pub fn new(config: SimConfig) -> Result<Self> {
        let mut rng = config.seed.map(StdRng::seed_from_u64);
        let network = Self::build_grid(&config, rng.as_mut())?;

        let vehicles = (0..config.vehicles)
            .map(|_| {
                let speed = match rng.as_mut() {
                    Some(rng) => rng.random_range(MIN_VEHICLE_SPEED..MAX_VEHICLE_SPEED),
                    None => rand::rng().random_range(MIN_VEHICLE_SPEED..MAX_VEHICLE_SPEED),
                };
                Arc::new(Vehicle::new(speed))
            })
            .collect();

        Ok(Self {
            network: Arc::new(network),
            vehicles,
            config,
            rng,
            crossings: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Build a square grid of intersections joined by streets
    fn build_grid(config: &SimConfig, mut rng: Option<&mut StdRng>) -> Result<RoadNetwork> {
        let size = config.grid_size;
        if size < 2 {
            bail!("Grid size must be at least 2, got {}", size);
        }

        let mut network = RoadNetwork::new();
        let mut grid = vec![vec![SimId(0); size]; size];
        let offset = (size as f64 - 1.0) / 2.0;

        for (row, cells) in grid.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                let intersection = match rng.as_deref_mut() {
                    Some(rng) => Intersection::with_seed(config.intersection_config(), rng.random()),
                    None => Intersection::new(config.intersection_config()),
                };
                intersection.set_position(Position::new(
                    (col as f64 - offset) * GRID_SPACING,
                    (row as f64 - offset) * GRID_SPACING,
                ));
                *cell = intersection.id();
                network.add_intersection(Arc::new(intersection));
            }
        }

        // Connect grid horizontally
        for row in 0..size {
            for col in 0..size - 1 {
                network.add_street(grid[row][col], grid[row][col + 1])?;
            }
        }

        // Connect grid vertically
        for row in 0..size - 1 {
            for col in 0..size {
                network.add_street(grid[row][col], grid[row + 1][col])?;
            }
        }

        Ok(network)
    }

    /// Pick a starting street and the intersection the vehicle drives away from
    fn starting_point(&mut self) -> Result<(Arc<Street>, SimId)> {
        let mut intersections: Vec<SimId> = self.network.intersections().map(|i| i.id()).collect();
        intersections.sort();
        let from = match &mut self.rng {
            Some(rng) => intersections.choose(rng).copied(),
            None => intersections.choose(&mut rand::rng()).copied(),
        }
        .context("Network has no intersections")?;

        let streets = self.network.streets_at(from);
        let street = match &mut self.rng {
            Some(rng) => streets.choose(rng).cloned(),
            None => streets.choose(&mut rand::rng()).cloned(),
        }
        .with_context(|| format!("Intersection {} has no streets", from))?;
        Ok((street, from))
    }

    /// Run the simulation for the configured time and return the totals
    pub fn run(&mut self) -> Result<SimSummary> {
        info!(
            "Starting simulation: {} vehicles, {}x{} grid, {:?}",
            self.config.vehicles, self.config.grid_size, self.config.grid_size, self.config.run_for
        );
        self.network.start_all()?;

        let starts = (0..self.vehicles.len())
            .map(|_| self.starting_point())
            .collect::<Result<Vec<_>>>()?;

        info!("=== SPAWNING VEHICLES ===");
        let stop = StopFlag::new();
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.vehicles.len());
        for (vehicle, (street, from)) in self.vehicles.clone().into_iter().zip(starts) {
            let seed = match &mut self.rng {
                Some(rng) => rng.random(),
                None => rand::rng().random(),
            };
            let journey = Journey {
                vehicle: Arc::clone(&vehicle),
                network: Arc::clone(&self.network),
                unit: self.config.unit,
                stop: stop.clone(),
                crossings: Arc::clone(&self.crossings),
                rng: StdRng::seed_from_u64(seed),
            };
            let spawned = thread::Builder::new()
                .name(format!("vehicle-{}", vehicle.id().0))
                .spawn(move || {
                    let id = journey.vehicle.id();
                    if let Err(e) = journey.drive(street, from) {
                        debug!("Vehicle {} stopped: {:#}", id, e);
                    }
                });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    stop.raise();
                    self.network.shutdown_all();
                    return Err(e).with_context(|| format!("Failed to spawn vehicle {}", vehicle.id()));
                }
            }
        }

        thread::sleep(self.config.run_for);

        info!("=== STOPPING VEHICLES ===");
        stop.raise();
        let still_waiting: usize = self.network.intersections().map(|i| i.queue_len()).sum();
        self.network.shutdown_all();
        for handle in handles {
            if handle.join().is_err() {
                warn!("A vehicle thread panicked");
            }
        }

        let summary = self.summary(still_waiting);
        self.log_summary(&summary);
        Ok(summary)
    }

    pub fn summary(&self, still_waiting: usize) -> SimSummary {
        SimSummary {
            vehicles: self.vehicles.len(),
            intersections: self.network.intersection_count(),
            streets: self.network.street_count(),
            crossings: self.crossings.load(Ordering::Relaxed),
            still_waiting,
        }
    }

    /// Log a summary of the world state
    pub fn log_summary(&self, summary: &SimSummary) {
        info!("=== Traffic Simulation Summary ===");
        info!("Vehicles: {}", summary.vehicles);
        info!("Intersections: {}", summary.intersections);
        info!("Streets: {}", summary.streets);
        info!("Total crossings: {}", summary.crossings);
        info!("Still waiting: {}", summary.still_waiting);

        let mut intersections: Vec<&Arc<Intersection>> = self.network.intersections().collect();
        intersections.sort_by_key(|i| i.id());
        for intersection in intersections {
            let position = intersection.position();
            info!(
                "  Intersection {} at ({:.1}, {:.1}): departures={}, streets={}, light={:?}",
                intersection.id(),
                position.x,
                position.y,
                intersection.departures(),
                intersection.street_count(),
                intersection.light().current_phase()
            );
        }
        info!("SIMULATION COMPLETE");
    }
}

/// Everything one vehicle thread needs
struct Journey {
    vehicle: Arc<Vehicle>,
    network: Arc<RoadNetwork>,
    unit: Duration,
    stop: StopFlag,
    crossings: Arc<AtomicUsize>,
    rng: StdRng,
}

impl Journey {
    /// Drive from intersection to intersection until stopped
    fn drive(mut self, mut street: Arc<Street>, mut from: SimId) -> Result<()> {
        while !self.stop.is_raised() {
            let travel = self.unit.mul_f64(street.length() / self.vehicle.speed());
            self.vehicle.set_position(street.position());
            if !self.pause(travel) {
                break;
            }

            let target = self
                .network
                .other_end(street.id(), from)
                .with_context(|| format!("Street {} is not in the network", street.id()))?;
            let intersection = self.network.intersection(target)?;
            self.vehicle.set_position(intersection.position());

            let waiting_since = Instant::now();
            intersection.request_entry(&self.vehicle)?;
            debug!(
                "Vehicle {} entered intersection {} after {:?}",
                self.vehicle.id(),
                target,
                waiting_since.elapsed()
            );

            self.pause(self.unit.mul_f64(CROSSING_UNITS));
            intersection.notify_departure(&self.vehicle);
            self.crossings.fetch_add(1, Ordering::Relaxed);

            // Dead ends send the vehicle back the way it came
            let outgoing = intersection.outgoing_streets(&street);
            street = outgoing
                .choose(&mut self.rng)
                .cloned()
                .unwrap_or(street);
            from = target;
        }
        Ok(())
    }

    /// Sleep for `duration` in short steps. Returns false if stopped early.
    fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.stop.is_raised() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(VEHICLE_TICK.min(deadline - now));
        }
    }
}
