//! Street identity consumed by intersections

use super::traffic_object::TrafficObject;
use super::types::{ObjectKind, Position, SimId};

/// A street joining two intersections
#[derive(Debug)]
pub struct Street {
    object: TrafficObject,
    length: f64,
}

impl Street {
    pub fn new(length: f64) -> Self {
        Self {
            object: TrafficObject::new(ObjectKind::Street),
            length,
        }
    }

    /// Create a street running between two positions
    pub fn between(start: &Position, end: &Position) -> Self {
        let street = Self::new(start.distance(end));
        street.object.set_position(start.lerp(end, 0.5));
        street
    }

    pub fn id(&self) -> SimId {
        self.object.id()
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn position(&self) -> Position {
        self.object.position()
    }
}
