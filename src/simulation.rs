//! Alpha-driven integrator with an explicit lifecycle.
//!
//! Every tick runs, in order: rebind forces if the graph's revision moved, apply the
//! registry, integrate velocities into positions, decay alpha, and settle every node
//! once alpha drops below `alpha_min`.

use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};
use tracing::{debug, info};

use crate::config::{LayoutConfig, SimulationConfig};
use crate::graph::Graph;
use crate::physics::ForceRegistry;
use crate::util::stable_pair;

const SEED_RADIUS: f32 = 10.0;
const SEED_JITTER: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    /// Nothing to lay out yet.
    Idle,
    Running,
    /// Every node is settled; ticks are no-ops until a reheat.
    Converged,
    /// Stopped by the caller; positions are left where the last tick put them.
    Halted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Empty,
    Advanced,
    /// This tick crossed `alpha_min`.
    Converged,
    Resting,
    Halted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub converged: bool,
}

type Callback = Box<dyn FnMut()>;

pub struct Simulation {
    params: SimulationConfig,
    center: Vec2,
    alpha: f32,
    forces: ForceRegistry,
    state: SimulationState,
    bound_revision: Option<u64>,
    ticks: u64,
    on_tick: Option<Callback>,
    on_end: Option<Callback>,
}

impl Simulation {
    pub fn new(config: &LayoutConfig) -> Self {
        Self::with_forces(config, ForceRegistry::from_config(config))
    }

    pub fn with_forces(config: &LayoutConfig, forces: ForceRegistry) -> Self {
        Self {
            params: config.simulation,
            center: vec2(config.forces.center_x, config.forces.center_y),
            alpha: config.simulation.alpha,
            forces,
            state: SimulationState::Idle,
            bound_revision: None,
            ticks: 0,
            on_tick: None,
            on_end: None,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn params(&self) -> &SimulationConfig {
        &self.params
    }

    /// Total ticks advanced over the simulation's lifetime.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn forces(&self) -> &ForceRegistry {
        &self.forces
    }

    /// Swaps the force set; the new forces are initialised on the next tick.
    pub fn replace_forces(&mut self, forces: ForceRegistry) {
        self.forces = forces;
        self.bound_revision = None;
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.params.alpha_target = target.clamp(0.0, 1.0);
    }

    pub fn set_velocity_decay(&mut self, decay: f32) {
        self.params.velocity_decay = decay.clamp(0.0, 1.0);
    }

    pub fn on_tick(&mut self, callback: impl FnMut() + 'static) {
        self.on_tick = Some(Box::new(callback));
    }

    pub fn on_end(&mut self, callback: impl FnMut() + 'static) {
        self.on_end = Some(Box::new(callback));
    }

    pub fn tick(&mut self, graph: &mut Graph) -> TickOutcome {
        let outcome = self.advance(graph);
        match outcome {
            TickOutcome::Advanced => self.fire_tick(),
            TickOutcome::Converged => {
                self.fire_tick();
                if let Some(on_end) = self.on_end.as_mut() {
                    on_end();
                }
            }
            TickOutcome::Empty | TickOutcome::Resting | TickOutcome::Halted => {}
        }
        outcome
    }

    /// Advances up to `count` ticks without invoking callbacks; returns how many ran.
    pub fn tick_n(&mut self, graph: &mut Graph, count: u64) -> u64 {
        let mut advanced = 0;
        for _ in 0..count {
            match self.advance(graph) {
                TickOutcome::Advanced => advanced += 1,
                TickOutcome::Converged => {
                    advanced += 1;
                    break;
                }
                TickOutcome::Empty | TickOutcome::Resting | TickOutcome::Halted => break,
            }
        }
        advanced
    }

    pub fn run_until_converged(&mut self, graph: &mut Graph, max_ticks: u64) -> RunSummary {
        let mut ticks = 0;
        while ticks < max_ticks {
            match self.tick(graph) {
                TickOutcome::Advanced => ticks += 1,
                TickOutcome::Converged => {
                    ticks += 1;
                    break;
                }
                TickOutcome::Empty | TickOutcome::Resting | TickOutcome::Halted => break,
            }
        }
        RunSummary {
            ticks,
            converged: self.state == SimulationState::Converged,
        }
    }

    /// Ticks left until convergence if nothing reheats, or `None` when the alpha target
    /// keeps the simulation running forever.
    pub fn estimated_ticks_remaining(&self) -> Option<u64> {
        match self.state {
            SimulationState::Converged | SimulationState::Idle => return Some(0),
            SimulationState::Running | SimulationState::Halted => {}
        }
        let SimulationConfig {
            alpha_min,
            alpha_decay,
            alpha_target,
            ..
        } = self.params;
        if alpha_target >= alpha_min || alpha_decay <= 0.0 {
            return None;
        }
        if self.alpha < alpha_min {
            return Some(0);
        }
        let remaining = (alpha_target - alpha_min) / (alpha_target - self.alpha);
        let ticks = remaining.ln() / (1.0 - alpha_decay).ln();
        Some(ticks.max(0.0).ceil() as u64)
    }

    /// Stops at the current tick boundary. Positions stay where they are.
    pub fn halt(&mut self) {
        if self.state != SimulationState::Idle {
            self.state = SimulationState::Halted;
            debug!(ticks = self.ticks, alpha = self.alpha, "simulation halted");
        }
    }

    /// Restarts the simulation at `alpha`, releasing every pin set by convergence.
    /// Caller pins stay in place.
    pub fn reheat(&mut self, graph: &mut Graph, alpha: f32) {
        for node in graph.nodes_mut() {
            node.release();
        }
        self.resume(graph, alpha);
    }

    /// Like [`Simulation::reheat`], but only the given nodes lose their settled pins.
    pub fn reheat_region(&mut self, graph: &mut Graph, alpha: f32, region: &[usize]) {
        for &index in region {
            if let Some(node) = graph.node_mut(index) {
                node.release();
            }
        }
        self.resume(graph, alpha);
    }

    fn resume(&mut self, graph: &Graph, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        self.alpha = match self.state {
            SimulationState::Running => self.alpha.max(alpha),
            _ => alpha,
        };
        self.state = if graph.is_empty() {
            SimulationState::Idle
        } else {
            SimulationState::Running
        };
        debug!(alpha = self.alpha, state = ?self.state, "simulation reheated");
    }

    fn fire_tick(&mut self) {
        if let Some(on_tick) = self.on_tick.as_mut() {
            on_tick();
        }
    }

    fn advance(&mut self, graph: &mut Graph) -> TickOutcome {
        if graph.is_empty() {
            self.state = SimulationState::Idle;
            return TickOutcome::Empty;
        }
        match self.state {
            SimulationState::Halted => return TickOutcome::Halted,
            SimulationState::Converged => return TickOutcome::Resting,
            SimulationState::Idle => self.state = SimulationState::Running,
            SimulationState::Running => {}
        }

        if self.bound_revision != Some(graph.revision()) {
            self.rebind(graph);
        }

        {
            let (nodes, edges) = graph.split_mut();
            self.forces.apply(nodes, edges, self.alpha);
        }
        self.integrate(graph);

        self.alpha += (self.params.alpha_target - self.alpha) * self.params.alpha_decay;
        self.ticks += 1;

        if self.alpha < self.params.alpha_min {
            for node in graph.nodes_mut() {
                node.settle();
            }
            self.state = SimulationState::Converged;
            info!(
                ticks = self.ticks,
                nodes = graph.len(),
                "layout converged"
            );
            return TickOutcome::Converged;
        }
        TickOutcome::Advanced
    }

    /// Seeds unplaced nodes on a phyllotaxis disc around the layout center, then
    /// re-initialises every force against the current structure.
    fn rebind(&mut self, graph: &mut Graph) {
        let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
        let mut seeded = 0usize;
        for (index, node) in graph.nodes_mut().iter_mut().enumerate() {
            if node.placed {
                continue;
            }
            let radius = SEED_RADIUS * (0.5 + index as f32).sqrt();
            let angle = index as f32 * golden_angle;
            let (jitter_x, jitter_y) = stable_pair(node.id().as_str());
            let seeded_at = self.center
                + vec2(radius * angle.cos(), radius * angle.sin())
                + vec2(jitter_x, jitter_y) * SEED_JITTER;
            if let Some(x) = node.fixed_x {
                node.position.x = x;
            } else {
                node.position.x = seeded_at.x;
            }
            if let Some(y) = node.fixed_y {
                node.position.y = y;
            } else {
                node.position.y = seeded_at.y;
            }
            node.placed = true;
            seeded += 1;
        }

        self.forces.initialize(graph);
        self.bound_revision = Some(graph.revision());
        debug!(
            revision = graph.revision(),
            seeded,
            nodes = graph.len(),
            "rebound simulation"
        );
    }

    fn integrate(&self, graph: &mut Graph) {
        let retain = 1.0 - self.params.velocity_decay;
        for node in graph.nodes_mut() {
            if !node.velocity.x.is_finite() {
                node.velocity.x = 0.0;
            }
            if !node.velocity.y.is_finite() {
                node.velocity.y = 0.0;
            }

            match node.fixed_x {
                Some(x) => {
                    node.position.x = x;
                    node.velocity.x = 0.0;
                }
                None => {
                    node.velocity.x *= retain;
                    node.position.x += node.velocity.x;
                }
            }
            match node.fixed_y {
                Some(y) => {
                    node.position.y = y;
                    node.velocity.y = 0.0;
                }
                None => {
                    node.velocity.y *= retain;
                    node.position.y += node.velocity.y;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::graph::NodeId;
    use crate::source::{EdgeInput, GraphInput, NodeInput};

    fn small_tree() -> Graph {
        Graph::from_input(GraphInput {
            nodes: ["root", "a", "b", "c"].iter().map(|id| NodeInput::new(id)).collect(),
            edges: vec![
                EdgeInput::new("root", "a"),
                EdgeInput::new("root", "b"),
                EdgeInput::new("a", "c"),
            ],
        })
        .unwrap()
    }

    #[test]
    fn empty_graph_is_a_no_op() {
        let mut graph = Graph::new();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        assert_eq!(simulation.tick(&mut graph), TickOutcome::Empty);
        assert_eq!(simulation.state(), SimulationState::Idle);
        assert_eq!(simulation.ticks(), 0);
    }

    #[test]
    fn converges_after_the_predicted_number_of_ticks() {
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.tick(&mut graph);
        let predicted = simulation.estimated_ticks_remaining().unwrap() + 1;

        let summary = simulation.run_until_converged(&mut graph, 1_000);
        assert!(summary.converged);
        let total = summary.ticks + 1;
        assert!(total.abs_diff(predicted) <= 1, "{total} vs {predicted}");
        assert!((299..=302).contains(&total), "{total}");
        assert!(graph.nodes().iter().all(|node| node.is_settled()));
        assert!(graph.nodes().iter().all(|node| node.velocity == Vec2::ZERO));
        assert_eq!(simulation.tick(&mut graph), TickOutcome::Resting);
    }

    #[test]
    fn unplaced_nodes_are_seeded_on_first_tick() {
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.tick(&mut graph);
        let positions = graph.positions();
        for (index, first) in positions.iter().enumerate() {
            assert!(first.x.is_finite() && first.y.is_finite());
            for second in &positions[index + 1..] {
                assert!((first.x, first.y) != (second.x, second.y));
            }
        }
    }

    #[test]
    fn callbacks_fire_per_tick_and_once_at_the_end() {
        let ticks = Rc::new(Cell::new(0u32));
        let ends = Rc::new(Cell::new(0u32));
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        {
            let ticks = Rc::clone(&ticks);
            simulation.on_tick(move || ticks.set(ticks.get() + 1));
            let ends = Rc::clone(&ends);
            simulation.on_end(move || ends.set(ends.get() + 1));
        }

        let summary = simulation.run_until_converged(&mut graph, 1_000);
        simulation.tick(&mut graph);
        assert_eq!(u64::from(ticks.get()), summary.ticks);
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn tick_n_skips_callbacks() {
        let ticks = Rc::new(Cell::new(0u32));
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        let counter = Rc::clone(&ticks);
        simulation.on_tick(move || counter.set(counter.get() + 1));
        assert_eq!(simulation.tick_n(&mut graph, 25), 25);
        assert_eq!(ticks.get(), 0);
        assert_eq!(simulation.ticks(), 25);
    }

    #[test]
    fn halt_preserves_positions() {
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.tick_n(&mut graph, 10);
        simulation.halt();
        let before = graph.positions();
        assert_eq!(simulation.tick(&mut graph), TickOutcome::Halted);
        assert_eq!(graph.positions(), before);
        assert_eq!(simulation.state(), SimulationState::Halted);

        simulation.reheat(&mut graph, 0.5);
        assert_eq!(simulation.state(), SimulationState::Running);
        assert_eq!(simulation.tick(&mut graph), TickOutcome::Advanced);
    }

    #[test]
    fn fixed_axes_do_not_move() {
        let mut graph = small_tree();
        let a = graph.index_of(&NodeId::from("a")).unwrap();
        if let Some(node) = graph.node_mut(a) {
            node.fixed_x = Some(42.0);
        }
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.tick_n(&mut graph, 50);
        let node = &graph.nodes()[a];
        assert_eq!(node.position.x, 42.0);
        assert_eq!(node.velocity.x, 0.0);
    }

    #[test]
    fn reheat_keeps_caller_pins() {
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.run_until_converged(&mut graph, 1_000);

        let b = graph.index_of(&NodeId::from("b")).unwrap();
        if let Some(node) = graph.node_mut(b) {
            node.unpin();
            node.pin();
        }
        simulation.reheat(&mut graph, 0.3);
        assert!(graph.nodes()[b].is_fixed());
        assert!(
            graph
                .nodes()
                .iter()
                .enumerate()
                .all(|(index, node)| index == b || !node.is_fixed())
        );
    }

    #[test]
    fn reheat_region_only_releases_the_region() {
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.run_until_converged(&mut graph, 1_000);

        simulation.reheat_region(&mut graph, 0.3, &[1]);
        assert!(!graph.nodes()[1].is_settled());
        assert!(graph.nodes()[0].is_settled());
        assert!((simulation.alpha() - 0.3).abs() < 1e-6);

        let pinned = graph.nodes()[0].position;
        simulation.run_until_converged(&mut graph, 1_000);
        assert_eq!(graph.nodes()[0].position, pinned);
    }

    #[test]
    fn revision_change_rebinds_and_seeds_new_nodes() {
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.tick_n(&mut graph, 5);

        graph
            .extend(GraphInput {
                nodes: vec![NodeInput::new("orphan")],
                edges: Vec::new(),
            })
            .unwrap();
        simulation.tick(&mut graph);
        let orphan = graph.node_by_id(&NodeId::from("orphan")).unwrap();
        assert!(orphan.position.is_finite());
        assert!(orphan.position != Vec2::ZERO);
    }

    #[test]
    fn alpha_target_above_min_never_converges() {
        let mut graph = small_tree();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        simulation.set_alpha_target(0.2);
        simulation.tick(&mut graph);
        assert_eq!(simulation.estimated_ticks_remaining(), None);
        let summary = simulation.run_until_converged(&mut graph, 400);
        assert!(!summary.converged);
        assert_eq!(summary.ticks, 400);
    }
}
