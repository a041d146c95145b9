//! Single owner of a live layout: graph, simulation, viewport and highlight state.
//!
//! Renderers drive it with [`LayoutSession::tick`] once per frame and feed user input
//! back through the `on_*` and `add_*` entry points.

use eframe::egui::{Vec2, vec2};
use tracing::{debug, info};

use crate::config::{ForceConfig, LayoutConfig};
use crate::error::{GraphError, LayoutError};
use crate::graph::{Added, Graph, NodeId};
use crate::highlight::{HighlightFade, HighlightSet, compute_highlight_set};
use crate::incremental::merge_graph;
use crate::physics::ForceRegistry;
use crate::simulation::{RunSummary, Simulation, TickOutcome};
use crate::source::{ContentSource, EdgeInput, GraphInput, NodeInput};
use crate::viewport::{Transform, ZoomController};

pub struct LayoutSession {
    config: LayoutConfig,
    graph: Graph,
    simulation: Simulation,
    zoom: ZoomController,
    fade: HighlightFade,
    hovered: Option<usize>,
    content: Box<dyn ContentSource>,
}

impl LayoutSession {
    pub fn new(
        config: LayoutConfig,
        graph: Graph,
        content: Box<dyn ContentSource>,
        viewport: Vec2,
    ) -> Result<Self, LayoutError> {
        config.validate()?;
        let simulation = Simulation::new(&config);
        let zoom = ZoomController::new(&config.viewport, viewport);
        info!(nodes = graph.len(), edges = graph.edges().len(), "layout session started");
        Ok(Self {
            fade: HighlightFade::default(),
            config,
            graph,
            simulation,
            zoom,
            hovered: None,
            content,
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Direct access for pinning or dragging nodes between ticks.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    pub fn zoom(&self) -> &ZoomController {
        &self.zoom
    }

    pub fn zoom_mut(&mut self) -> &mut ZoomController {
        &mut self.zoom
    }

    pub fn transform(&self) -> Transform {
        self.zoom.transform()
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn highlight(&self) -> &HighlightFade {
        &self.fade
    }

    /// One frame: a simulation tick plus `dt_ms` of viewport and highlight animation.
    pub fn tick(&mut self, dt_ms: f32) -> TickOutcome {
        let outcome = self.simulation.tick(&mut self.graph);
        self.zoom.advance(dt_ms);
        self.fade.advance(dt_ms);
        outcome
    }

    pub fn run_until_converged(&mut self, max_ticks: u64) -> RunSummary {
        self.simulation.run_until_converged(&mut self.graph, max_ticks)
    }

    /// Full reheat at the configured merge alpha.
    pub fn reheat(&mut self) {
        let alpha = self.config.simulation.reheat_alpha;
        self.simulation.reheat(&mut self.graph, alpha);
    }

    /// Swaps in new force parameters and reheats so the layout adapts to them.
    pub fn update_forces(&mut self, forces: ForceConfig) -> Result<(), LayoutError> {
        let mut config = self.config.clone();
        config.forces = forces;
        config.validate()?;
        self.config = config;
        self.simulation
            .replace_forces(ForceRegistry::from_config(&self.config));
        self.reheat();
        Ok(())
    }

    pub fn set_velocity_decay(&mut self, decay: f32) {
        self.config.simulation.velocity_decay = decay.clamp(0.0, 1.0);
        self.simulation.set_velocity_decay(decay);
    }

    pub fn on_hover(&mut self, node: Option<&NodeId>) -> Result<&HighlightSet, LayoutError> {
        let index = match node {
            Some(id) => Some(
                self.graph
                    .index_of(id)
                    .ok_or_else(|| GraphError::UnknownNode(id.clone()))?,
            ),
            None => None,
        };
        Ok(self.hover_index(index))
    }

    pub fn hover_index(&mut self, index: Option<usize>) -> &HighlightSet {
        let index = index.filter(|&index| index < self.graph.len());
        if index != self.hovered {
            self.hovered = index;
            self.fade.set(compute_highlight_set(&self.graph, index));
        }
        self.fade.current()
    }

    /// Eases the viewport so world point `(x, y)` lands under the anchor at `scale`.
    pub fn on_zoom_request(&mut self, x: f32, y: f32, scale: f32) -> Result<(), LayoutError> {
        let duration = self.config.viewport.transition_ms;
        self.zoom.zoom_to(vec2(x, y), scale, duration)?;
        Ok(())
    }

    /// Zooms to a node at the configured click zoom.
    pub fn focus_node(&mut self, index: usize) -> Result<(), LayoutError> {
        let Some(node) = self.graph.node(index) else {
            return Err(GraphError::UnknownNode(NodeId::from(index.to_string())).into());
        };
        let position = node.position;
        let scale = self.config.viewport.click_zoom;
        self.on_zoom_request(position.x, position.y, scale)
    }

    pub fn fit_to_graph(&mut self, padding: f32) {
        if let Some(bounds) = self.graph.bounds() {
            self.zoom.zoom_to_fit(bounds, padding);
        }
    }

    /// Adds `count` children under `parent`, or under a parent chosen by the content
    /// source when none is given, and merges them into the running layout.
    pub fn add_nodes(&mut self, parent: Option<&NodeId>, count: usize) -> Result<Added, LayoutError> {
        let parent_index = match parent {
            Some(id) => self
                .graph
                .index_of(id)
                .ok_or_else(|| GraphError::UnknownNode(id.clone()))?,
            None => self
                .content
                .pick_parent(&self.graph)
                .ok_or(LayoutError::NoParent)?,
        };
        let parent_id = self
            .graph
            .node(parent_index)
            .map(|node| node.id().clone())
            .ok_or(LayoutError::NoParent)?;
        if count == 0 {
            return Ok(Added::default());
        }

        let mut batch = GraphInput::default();
        for _ in 0..count {
            let id = self.graph.allocate_id();
            let name = self.content.node_name();
            batch.nodes.push(NodeInput::named(id.as_str(), &name));
            batch
                .edges
                .push(EdgeInput::new(parent_id.as_str(), id.as_str()));
        }
        debug!(parent = %parent_id, count, "adding nodes");
        Ok(merge_graph(&mut self.graph, &mut self.simulation, batch)?)
    }

    /// Adds up to `count` new edges between existing nodes picked by the content source.
    pub fn add_links(&mut self, count: usize) -> Result<Added, LayoutError> {
        let pairs = self.content.link_candidates(&self.graph, count);
        let mut batch = GraphInput::default();
        for (source, target) in pairs {
            let (Some(source), Some(target)) = (self.graph.node(source), self.graph.node(target))
            else {
                continue;
            };
            batch
                .edges
                .push(EdgeInput::new(source.id().as_str(), target.id().as_str()));
        }
        if batch.edges.is_empty() {
            return Ok(Added::default());
        }
        debug!(count = batch.edges.len(), "adding links");
        Ok(merge_graph(&mut self.graph, &mut self.simulation, batch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::SimulationState;
    use crate::source::{RandomContent, generate_hierarchy};

    fn session() -> LayoutSession {
        let graph = Graph::from_input(generate_hierarchy(5)).unwrap();
        LayoutSession::new(
            LayoutConfig::default(),
            graph,
            Box::new(RandomContent::seeded(5)),
            vec2(800.0, 600.0),
        )
        .unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = LayoutConfig::default();
        config.viewport.min_zoom = 20.0;
        let result = LayoutSession::new(
            config,
            Graph::new(),
            Box::new(RandomContent::seeded(0)),
            vec2(100.0, 100.0),
        );
        assert!(matches!(result, Err(LayoutError::Config(_))));
    }

    #[test]
    fn add_nodes_grows_under_the_named_parent() {
        let mut session = session();
        session.run_until_converged(1_000);
        let root = session.graph().root_index().unwrap();
        let root_id = session.graph().nodes()[root].id().clone();
        let before = session.graph().nodes()[root].child_count();

        let added = session.add_nodes(Some(&root_id), 3).unwrap();
        assert_eq!(added.nodes.len(), 3);
        assert_eq!(session.graph().nodes()[root].child_count(), before + 3);
        assert_eq!(session.simulation().state(), SimulationState::Running);
    }

    #[test]
    fn adding_zero_nodes_leaves_a_settled_layout_alone() {
        let mut session = session();
        assert!(session.run_until_converged(1_000).converged);
        let revision = session.graph().revision();
        let root_id = session.graph().nodes()[session.graph().root_index().unwrap()]
            .id()
            .clone();

        assert_eq!(session.add_nodes(Some(&root_id), 0).unwrap(), Added::default());
        assert_eq!(session.add_nodes(None, 0).unwrap(), Added::default());
        assert_eq!(session.graph().revision(), revision);
        assert_eq!(session.simulation().state(), SimulationState::Converged);
    }

    #[test]
    fn add_nodes_without_parent_uses_the_content_source() {
        let mut session = session();
        let len = session.graph().len();
        session.add_nodes(None, 2).unwrap();
        assert_eq!(session.graph().len(), len + 2);
    }

    #[test]
    fn unknown_hover_target_is_an_error() {
        let mut session = session();
        assert!(matches!(
            session.on_hover(Some(&NodeId::from("nobody"))),
            Err(LayoutError::Graph(GraphError::UnknownNode(_)))
        ));
        assert!(session.on_hover(None).unwrap().is_empty());
    }

    #[test]
    fn hovering_the_root_highlights_its_children() {
        let mut session = session();
        let root = session.graph().root_index().unwrap();
        let root_id = session.graph().nodes()[root].id().clone();
        let children = session.graph().nodes()[root].child_count();
        let set = session.on_hover(Some(&root_id)).unwrap();
        assert_eq!(set.node_ids.len(), children + 1);
        assert_eq!(set.edges.len(), children);
    }

    #[test]
    fn zoom_requests_animate_through_ticks() {
        let mut session = session();
        session.on_zoom_request(10.0, 10.0, 50.0).unwrap();
        for _ in 0..40 {
            session.tick(16.0);
        }
        assert_eq!(session.transform().scale, 12.0);
        assert!(session.on_zoom_request(f32::NAN, 0.0, 2.0).is_err());
    }

    #[test]
    fn force_updates_are_validated_then_reheat() {
        let mut session = session();
        session.run_until_converged(1_000);
        let mut forces = session.config().forces;
        forces.link_distance = 90.0;
        session.update_forces(forces).unwrap();
        assert_eq!(session.simulation().state(), SimulationState::Running);

        forces.theta = f32::NAN;
        assert!(session.update_forces(forces).is_err());
        assert_eq!(session.config().forces.link_distance, 90.0);
    }

    #[test]
    fn add_links_merges_new_edges() {
        let mut session = session();
        let edges = session.graph().edges().len();
        let added = session.add_links(2).unwrap();
        assert_eq!(session.graph().edges().len(), edges + added.edges.len());
    }
}
