//! Timing and world configuration

use std::time::Duration;

/// Shortest phase, in time units
pub const MIN_PHASE_UNITS: u32 = 4;

/// Longest phase, in time units
pub const MAX_PHASE_UNITS: u32 = 6;

/// Sleep between iterations of every background loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long a traffic light stays in one phase before toggling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightTiming {
    pub min_phase: Duration,
    pub max_phase: Duration,
    pub poll_interval: Duration,
}

impl Default for LightTiming {
    fn default() -> Self {
        Self::scaled(Duration::from_secs(1))
    }
}

impl LightTiming {
    /// Phases of 4 to 6 of the given time unit
    pub fn scaled(unit: Duration) -> Self {
        Self {
            min_phase: unit * MIN_PHASE_UNITS,
            max_phase: unit * MAX_PHASE_UNITS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionConfig {
    pub light: LightTiming,
    /// Idle sleep of the admission dispatcher
    pub poll_interval: Duration,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            light: LightTiming::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl IntersectionConfig {
    pub fn scaled(unit: Duration) -> Self {
        Self {
            light: LightTiming::scaled(unit),
            ..Self::default()
        }
    }
}

/// Parameters of a headless simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of vehicle threads
    pub vehicles: usize,
    /// The world is a `grid_size` x `grid_size` grid of intersections
    pub grid_size: usize,
    /// Wall-clock length of the run
    pub run_for: Duration,
    /// Length of one simulated time unit
    pub unit: Duration,
    /// Seed for reproducible vehicle choices and light timings
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            vehicles: 6,
            grid_size: 2,
            run_for: Duration::from_secs(10),
            unit: Duration::from_secs(1),
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn intersection_config(&self) -> IntersectionConfig {
        IntersectionConfig::scaled(self.unit)
    }
}
