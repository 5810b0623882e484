//! Vehicle identity consumed by intersections

use super::traffic_object::TrafficObject;
use super::types::{ObjectKind, Position, SimId};

/// A vehicle moving through the street network
#[derive(Debug)]
pub struct Vehicle {
    object: TrafficObject,
    /// Distance units per time unit
    speed: f64,
}

impl Vehicle {
    pub fn new(speed: f64) -> Self {
        Self {
            object: TrafficObject::new(ObjectKind::Vehicle),
            speed,
        }
    }

    pub fn id(&self) -> SimId {
        self.object.id()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn position(&self) -> Position {
        self.object.position()
    }

    pub fn set_position(&self, position: Position) {
        self.object.set_position(position);
    }
}
