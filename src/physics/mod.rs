mod forces;
mod quadtree;

use eframe::egui::Vec2;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::graph::{Edge, Graph, Node};

pub use forces::{CenterForce, CollisionForce, LinkForce, ManyBodyForce, RadialForce};
pub use quadtree::QuadtreeCell;
use quadtree::{QuadNode, collect_quadtree_cells};

/// A velocity contribution applied once per tick.
///
/// `initialize` runs whenever the graph's structure changes, before the next `apply`.
/// Forces must only write to `velocity` and must never produce non-finite values.
pub trait Force {
    fn name(&self) -> &'static str;

    fn initialize(&mut self, graph: &Graph);

    fn apply(&mut self, nodes: &mut [Node], edges: &[Edge], alpha: f32);
}

/// Forces in application order.
#[derive(Default)]
pub struct ForceRegistry {
    forces: Vec<Box<dyn Force>>,
}

impl ForceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// link, many-body, collision, center and, when configured, radial.
    pub fn from_config(config: &LayoutConfig) -> Self {
        let forces = &config.forces;
        let mut registry = Self::new()
            .with(LinkForce::new(forces))
            .with(ManyBodyForce::new(forces))
            .with(CollisionForce::new(forces, &config.radii))
            .with(CenterForce::new(forces));
        if let Some(mode) = forces.radial {
            registry.push(RadialForce::new(mode, forces));
        }
        registry
    }

    pub fn with(mut self, force: impl Force + 'static) -> Self {
        self.push(force);
        self
    }

    pub fn push(&mut self, force: impl Force + 'static) {
        self.forces.push(Box::new(force));
    }

    /// Drops every force with this name; returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.forces.len();
        self.forces.retain(|force| force.name() != name);
        self.forces.len() != before
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.forces.iter().map(|force| force.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.forces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }

    pub(crate) fn initialize(&mut self, graph: &Graph) {
        for force in &mut self.forces {
            force.initialize(graph);
        }
        debug!(forces = ?self.names(), nodes = graph.len(), "initialized forces");
    }

    pub(crate) fn apply(&mut self, nodes: &mut [Node], edges: &[Edge], alpha: f32) {
        for force in &mut self.forces {
            force.apply(nodes, edges, alpha);
        }
    }
}

/// Cell outlines of a quadtree over the current node positions.
pub fn quadtree_cells(graph: &Graph, positions: &mut Vec<Vec2>, cells: &mut Vec<QuadtreeCell>) {
    positions.clear();
    positions.extend(graph.nodes().iter().map(|node| node.position));

    cells.clear();
    let Some(quadtree) = QuadNode::build(positions) else {
        return;
    };

    collect_quadtree_cells(&quadtree, 0, cells);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RadialConfig;

    #[test]
    fn default_order_is_fixed() {
        let registry = ForceRegistry::from_config(&LayoutConfig::default());
        assert_eq!(registry.names(), ["link", "many-body", "collision", "center"]);
    }

    #[test]
    fn radial_is_appended_when_configured() {
        let mut config = LayoutConfig::default();
        config.forces.radial = Some(RadialConfig::ByChildCount {
            base: 40.0,
            per_child: 5.0,
            strength: 0.1,
        });
        let mut registry = ForceRegistry::from_config(&config);
        assert_eq!(registry.names().last(), Some(&"radial"));
        assert!(registry.remove("radial"));
        assert!(!registry.remove("radial"));
        assert_eq!(registry.len(), 4);
    }
}
