//! Concurrent traffic simulation
//!
//! Intersections admit one vehicle at a time in arrival order, and every
//! intersection owns a traffic light cycling on its own thread. The driver
//! in `world` runs vehicles through a grid of such intersections.

mod admission_queue;
mod completion;
mod config;
mod intersection;
mod phase_signal;
mod road_network;
mod street;
mod traffic_light;
mod traffic_object;
mod types;
mod vehicle;
mod world;

pub use admission_queue::AdmissionQueue;
pub use completion::{Completion, Fulfiller, Waiter};
pub use config::{
    IntersectionConfig, LightTiming, SimConfig, DEFAULT_POLL_INTERVAL, MAX_PHASE_UNITS,
    MIN_PHASE_UNITS,
};
pub use intersection::{Intersection, Occupancy};
pub use phase_signal::{PhaseReceiver, PhaseSignal, DEFAULT_SIGNAL_CAPACITY};
pub use road_network::RoadNetwork;
pub use street::Street;
pub use traffic_light::TrafficLight;
pub use traffic_object::{next_sim_id, StopFlag, TrafficObject};
pub use types::{ObjectKind, Phase, Position, SimId};
pub use vehicle::Vehicle;
pub use world::{SimSummary, SimWorld, CROSSING_UNITS, GRID_SPACING};
