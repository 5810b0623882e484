//! Street network graph used by the headless driver
//!
//! Intersections are nodes and streets are undirected edges. The network
//! only answers topology questions; admission and signalling live in
//! `Intersection`.

use anyhow::{Context, Result};
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::sync::Arc;

use super::intersection::Intersection;
use super::street::Street;
use super::types::SimId;

#[derive(Default)]
pub struct RoadNetwork {
    /// The underlying petgraph graph, weighted by street id
    graph: UnGraph<SimId, SimId>,

    /// Maps intersection IDs to their node indices in the graph
    intersection_to_node: HashMap<SimId, NodeIndex>,

    /// Maps street IDs to their edge indices in the graph
    street_to_edge: HashMap<SimId, EdgeIndex>,

    intersections: HashMap<SimId, Arc<Intersection>>,

    streets: HashMap<SimId, Arc<Street>>,
}

impl RoadNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an intersection to the network graph
    pub fn add_intersection(&mut self, intersection: Arc<Intersection>) {
        let id = intersection.id();
        if self.intersection_to_node.contains_key(&id) {
            return;
        }
        let node = self.graph.add_node(id);
        self.intersection_to_node.insert(id, node);
        self.intersections.insert(id, intersection);
    }

    /// Joins two intersections with a new street and connects it to both ends
    pub fn add_street(&mut self, start: SimId, end: SimId) -> Result<Arc<Street>> {
        let start_node = *self
            .intersection_to_node
            .get(&start)
            .with_context(|| format!("Intersection {} not found", start))?;
        let end_node = *self
            .intersection_to_node
            .get(&end)
            .with_context(|| format!("Intersection {} not found", end))?;

        let start_intersection = self.intersection(start)?;
        let end_intersection = self.intersection(end)?;

        let street = Arc::new(Street::between(
            &start_intersection.position(),
            &end_intersection.position(),
        ));
        start_intersection.connect(Arc::clone(&street));
        end_intersection.connect(Arc::clone(&street));

        let edge = self.graph.add_edge(start_node, end_node, street.id());
        self.street_to_edge.insert(street.id(), edge);
        self.streets.insert(street.id(), Arc::clone(&street));
        Ok(street)
    }

    pub fn intersection(&self, id: SimId) -> Result<Arc<Intersection>> {
        self.intersections
            .get(&id)
            .cloned()
            .with_context(|| format!("Intersection {} not found", id))
    }

    /// The intersection at the far end of `street`, seen from `from`
    pub fn other_end(&self, street: SimId, from: SimId) -> Option<SimId> {
        let edge = self.street_to_edge.get(&street)?;
        let (a, b) = self.graph.edge_endpoints(*edge)?;
        let far = if self.graph[a] == from { b } else { a };
        Some(self.graph[far])
    }

    /// Streets touching an intersection
    pub fn streets_at(&self, intersection: SimId) -> Vec<Arc<Street>> {
        let Some(node) = self.intersection_to_node.get(&intersection) else {
            return Vec::new();
        };
        self.graph
            .edges(*node)
            .filter_map(|edge| self.streets.get(edge.weight()).cloned())
            .collect()
    }

    pub fn intersections(&self) -> impl Iterator<Item = &Arc<Intersection>> {
        self.intersections.values()
    }

    /// Get number of streets
    pub fn street_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Get number of intersections
    pub fn intersection_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Start every intersection in the network
    pub fn start_all(&self) -> Result<()> {
        for intersection in self.intersections.values() {
            intersection.start()?;
        }
        Ok(())
    }

    /// Shut down every intersection, releasing all blocked vehicles
    pub fn shutdown_all(&self) {
        for intersection in self.intersections.values() {
            intersection.shutdown();
        }
    }
}
