use eframe::egui::{Vec2, vec2};

use crate::config::{ForceConfig, RadialConfig, RadiusConfig};
use crate::graph::{Edge, Graph, Node, NodeRole};
use crate::util::{MIN_DISTANCE, fallback_direction};

use super::Force;
use super::quadtree::QuadNode;

/// Spring toward a target length on predicted positions, split by endpoint degree.
pub struct LinkForce {
    link_distance: f32,
    link_strength: f32,
    distances: Vec<f32>,
    strengths: Vec<f32>,
    biases: Vec<f32>,
}

impl LinkForce {
    pub fn new(config: &ForceConfig) -> Self {
        Self {
            link_distance: config.link_distance,
            link_strength: config.link_strength,
            distances: Vec::new(),
            strengths: Vec::new(),
            biases: Vec::new(),
        }
    }
}

impl Force for LinkForce {
    fn name(&self) -> &'static str {
        "link"
    }

    fn initialize(&mut self, graph: &Graph) {
        let degree = |index: usize| graph.outgoing(index).len() + graph.incoming(index).len();

        self.distances.clear();
        self.strengths.clear();
        self.biases.clear();
        for edge in graph.edges() {
            let weight = edge.weight.unwrap_or(1.0).clamp(0.25, 4.0);
            self.distances.push(self.link_distance / weight.sqrt());

            let target_children = graph
                .node(edge.target())
                .map(Node::child_count)
                .unwrap_or(0);
            self.strengths
                .push(self.link_strength / (1.0 + target_children as f32));

            let source_degree = degree(edge.source()) as f32;
            let target_degree = degree(edge.target()) as f32;
            self.biases
                .push(source_degree / (source_degree + target_degree).max(1.0));
        }
    }

    fn apply(&mut self, nodes: &mut [Node], edges: &[Edge], alpha: f32) {
        let count = edges.len().min(self.distances.len());
        for (index, edge) in edges.iter().enumerate().take(count) {
            let (source, target) = (edge.source(), edge.target());
            if source >= nodes.len() || target >= nodes.len() || source == target {
                continue;
            }

            let predicted_source = nodes[source].position + nodes[source].velocity;
            let predicted_target = nodes[target].position + nodes[target].velocity;
            let mut delta = predicted_target - predicted_source;
            let mut length = delta.length();
            if !(length > MIN_DISTANCE) {
                delta = fallback_direction(source, target) * MIN_DISTANCE;
                length = MIN_DISTANCE;
            }

            let factor = (length - self.distances[index]) / length * alpha * self.strengths[index];
            let correction = delta * factor;
            let bias = self.biases[index];
            nodes[target].velocity -= correction * bias;
            nodes[source].velocity += correction * (1.0 - bias);
        }
    }
}

/// Barnes-Hut repulsion with per-role charges.
pub struct ManyBodyForce {
    config: ForceConfig,
    charges: Vec<f32>,
    positions: Vec<Vec2>,
}

impl ManyBodyForce {
    pub fn new(config: &ForceConfig) -> Self {
        Self {
            config: *config,
            charges: Vec::new(),
            positions: Vec::new(),
        }
    }

    fn charge_for(&self, node: &Node) -> f32 {
        let scale = match node.role() {
            NodeRole::Root => self.config.root_charge_scale,
            NodeRole::Parent => self.config.parent_charge_scale,
            NodeRole::Leaf => 1.0,
        };
        self.config.charge_strength * scale
    }
}

#[derive(Clone, Copy)]
struct ChargeParams {
    theta_sq: f32,
    distance_min_sq: f32,
    distance_max_sq: f32,
    alpha: f32,
}

/// Velocity change from `charge` located `delta` away from the body it acts on.
fn charge_impulse(mut delta: Vec2, charge: f32, params: ChargeParams) -> Vec2 {
    let mut distance_sq = delta.length_sq();
    if distance_sq >= params.distance_max_sq {
        return Vec2::ZERO;
    }
    if distance_sq < params.distance_min_sq {
        distance_sq = (params.distance_min_sq * distance_sq).sqrt();
    }
    if !(distance_sq > 0.0) {
        delta = vec2(MIN_DISTANCE, 0.0);
        distance_sq = (params.distance_min_sq * MIN_DISTANCE * MIN_DISTANCE).sqrt();
    }
    delta * (charge * params.alpha / distance_sq)
}

fn accumulate_charge_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    charges: &[f32],
    params: ChargeParams,
    velocity: &mut Vec2,
) {
    if node.len == 0 || node.charge == 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let mut delta = positions[other_index] - point;
            if delta.length_sq() < MIN_DISTANCE * MIN_DISTANCE {
                delta = fallback_direction(index, other_index) * MIN_DISTANCE;
            }
            *velocity += charge_impulse(delta, charges[other_index], params);
        }
        return;
    }

    let delta = node.center - point;
    let distance_sq = delta.length_sq();
    let width = node.bounds.side_length();
    let can_approximate =
        !node.bounds.contains(point) && (width * width / params.theta_sq) < distance_sq;

    if can_approximate {
        *velocity += charge_impulse(delta, node.charge, params);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge_for_node(child, index, positions, charges, params, velocity);
    }
}

impl Force for ManyBodyForce {
    fn name(&self) -> &'static str {
        "many-body"
    }

    fn initialize(&mut self, graph: &Graph) {
        self.charges = graph
            .nodes()
            .iter()
            .map(|node| self.charge_for(node))
            .collect();
    }

    fn apply(&mut self, nodes: &mut [Node], _edges: &[Edge], alpha: f32) {
        let count = nodes.len().min(self.charges.len());
        if count < 2 {
            return;
        }

        self.positions.clear();
        self.positions
            .extend(nodes.iter().take(count).map(|node| node.position));
        let Some(quadtree) = QuadNode::build_charged(&self.positions, Some(&self.charges[..count]))
        else {
            return;
        };

        let theta = self.config.theta.max(f32::EPSILON);
        let params = ChargeParams {
            theta_sq: theta * theta,
            distance_min_sq: self.config.distance_min * self.config.distance_min,
            distance_max_sq: self.config.distance_max * self.config.distance_max,
            alpha,
        };
        for (index, node) in nodes.iter_mut().enumerate().take(count) {
            accumulate_charge_for_node(
                &quadtree,
                index,
                &self.positions,
                &self.charges,
                params,
                &mut node.velocity,
            );
        }
    }
}

/// Minimum separation between node circles, resolved on predicted positions.
pub struct CollisionForce {
    strength: f32,
    padding: f32,
    radii_config: RadiusConfig,
    radii: Vec<f32>,
    positions: Vec<Vec2>,
    impulses: Vec<Vec2>,
}

#[derive(Clone, Copy)]
struct CollisionParams {
    strength: f32,
    max_collision_distance_sq: f32,
}

impl CollisionForce {
    pub fn new(config: &ForceConfig, radii: &RadiusConfig) -> Self {
        Self {
            strength: config.collision_strength,
            padding: config.collision_padding,
            radii_config: *radii,
            radii: Vec::new(),
            positions: Vec::new(),
            impulses: Vec::new(),
        }
    }
}

fn resolve_overlap(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    impulses: &mut [Vec2],
) {
    let reach = radii[from] + radii[to];
    let mut delta = positions[from] - positions[to];
    let mut distance_sq = delta.length_sq();
    if distance_sq >= reach * reach {
        return;
    }
    if distance_sq < MIN_DISTANCE * MIN_DISTANCE {
        delta = fallback_direction(to, from) * MIN_DISTANCE;
        distance_sq = MIN_DISTANCE * MIN_DISTANCE;
    }

    let distance = distance_sq.sqrt();
    let push = delta * ((reach - distance) / distance * strength);
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let share = to_sq / (from_sq + to_sq);
    impulses[from] += push * share;
    impulses[to] -= push * (1.0 - share);
}

fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    params: CollisionParams,
    impulses: &mut [Vec2],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_collision_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    resolve_overlap(from, to, positions, radii, params.strength, impulses);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    resolve_overlap(from, to, positions, radii, params.strength, impulses);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, positions, radii, params, impulses);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, positions, radii, params, impulses,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, positions, radii, params, impulses);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, positions, radii, params, impulses);
        }
    }
}

impl Force for CollisionForce {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn initialize(&mut self, graph: &Graph) {
        self.radii = graph
            .nodes()
            .iter()
            .map(|node| node.radius(&self.radii_config) + self.padding)
            .collect();
    }

    fn apply(&mut self, nodes: &mut [Node], _edges: &[Edge], _alpha: f32) {
        let count = nodes.len().min(self.radii.len());
        if count < 2 || self.strength <= 0.0 {
            return;
        }

        self.positions.clear();
        self.positions.extend(
            nodes
                .iter()
                .take(count)
                .map(|node| node.position + node.velocity),
        );
        let Some(quadtree) = QuadNode::build(&self.positions) else {
            return;
        };

        let max_radius = self.radii[..count].iter().copied().fold(0.0_f32, f32::max);
        let max_collision_distance = max_radius * 2.0;
        self.impulses.clear();
        self.impulses.resize(count, Vec2::ZERO);
        accumulate_collision_pairs(
            &quadtree,
            &quadtree,
            true,
            &self.positions,
            &self.radii,
            CollisionParams {
                strength: self.strength,
                max_collision_distance_sq: max_collision_distance * max_collision_distance,
            },
            &mut self.impulses,
        );

        for (node, impulse) in nodes.iter_mut().zip(&self.impulses) {
            node.velocity += *impulse;
        }
    }
}

/// Pulls the root toward the layout center and every node weakly toward it.
pub struct CenterForce {
    center: Vec2,
    root_strength: f32,
    gravity: f32,
    root: Option<usize>,
}

impl CenterForce {
    pub fn new(config: &ForceConfig) -> Self {
        Self {
            center: vec2(config.center_x, config.center_y),
            root_strength: config.root_center_strength,
            gravity: config.gravity_strength,
            root: None,
        }
    }
}

impl Force for CenterForce {
    fn name(&self) -> &'static str {
        "center"
    }

    fn initialize(&mut self, graph: &Graph) {
        self.root = graph.root_index();
    }

    fn apply(&mut self, nodes: &mut [Node], _edges: &[Edge], alpha: f32) {
        for node in nodes.iter_mut() {
            node.velocity += (self.center - node.position) * (self.gravity * alpha);
        }
        if let Some(root) = self.root.and_then(|root| nodes.get_mut(root)) {
            root.velocity += (self.center - root.position) * (self.root_strength * alpha);
        }
    }
}

/// Pulls nodes toward a ring around the layout center.
pub struct RadialForce {
    mode: RadialConfig,
    center: Vec2,
    targets: Vec<Option<f32>>,
}

impl RadialForce {
    pub fn new(mode: RadialConfig, config: &ForceConfig) -> Self {
        Self {
            mode,
            center: vec2(config.center_x, config.center_y),
            targets: Vec::new(),
        }
    }

    fn strength(&self) -> f32 {
        match self.mode {
            RadialConfig::ByLevel { strength, .. } | RadialConfig::ByChildCount { strength, .. } => {
                strength
            }
        }
    }
}

impl Force for RadialForce {
    fn name(&self) -> &'static str {
        "radial"
    }

    fn initialize(&mut self, graph: &Graph) {
        self.targets = graph
            .nodes()
            .iter()
            .map(|node| match self.mode {
                RadialConfig::ByLevel { ring_spacing, .. } => {
                    node.level().map(|level| level as f32 * ring_spacing)
                }
                RadialConfig::ByChildCount { base, per_child, .. } => {
                    Some(base + per_child * node.child_count() as f32)
                }
            })
            .collect();
    }

    fn apply(&mut self, nodes: &mut [Node], _edges: &[Edge], alpha: f32) {
        let strength = self.strength();
        for (index, (node, target)) in nodes.iter_mut().zip(&self.targets).enumerate() {
            let Some(target) = *target else {
                continue;
            };
            let mut offset = node.position - self.center;
            let mut distance = offset.length();
            if distance < MIN_DISTANCE {
                if target <= 0.0 {
                    continue;
                }
                offset = fallback_direction(index, index) * MIN_DISTANCE;
                distance = MIN_DISTANCE;
            }
            let factor = (target - distance) * strength * alpha / distance;
            node.velocity += offset * factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{EdgeInput, GraphInput, NodeInput};

    fn weighted_pair(distance: f32, weight: Option<f32>) -> Graph {
        let mut edge = EdgeInput::new("a", "b");
        edge.weight = weight;
        Graph::from_input(GraphInput {
            nodes: vec![
                NodeInput::new("a").at(0.0, 0.0),
                NodeInput::new("b").at(distance, 0.0),
            ],
            edges: vec![edge],
        })
        .unwrap()
    }

    fn pair(distance: f32) -> Graph {
        weighted_pair(distance, None)
    }

    fn apply(force: &mut dyn Force, graph: &mut Graph, alpha: f32) {
        force.initialize(graph);
        let (nodes, edges) = graph.split_mut();
        force.apply(nodes, edges, alpha);
    }

    #[test]
    fn stretched_link_pulls_endpoints_together() {
        let mut graph = pair(200.0);
        apply(&mut LinkForce::new(&ForceConfig::default()), &mut graph, 1.0);
        let nodes = graph.nodes();
        assert!(nodes[0].velocity.x > 0.0);
        assert!(nodes[1].velocity.x < 0.0);
    }

    #[test]
    fn coincident_link_endpoints_get_finite_push() {
        let mut graph = pair(0.0);
        apply(&mut LinkForce::new(&ForceConfig::default()), &mut graph, 1.0);
        let nodes = graph.nodes();
        assert!(nodes[0].velocity.is_finite() && nodes[1].velocity.is_finite());
        assert!(nodes[0].velocity.length() <= ForceConfig::default().link_distance);
        assert!((nodes[0].velocity - nodes[1].velocity).length() > 0.0);
    }

    #[test]
    fn heavier_link_weight_shortens_rest_length() {
        let mut light = pair(60.0);
        let mut heavy = weighted_pair(60.0, Some(4.0));
        apply(&mut LinkForce::new(&ForceConfig::default()), &mut light, 1.0);
        apply(&mut LinkForce::new(&ForceConfig::default()), &mut heavy, 1.0);
        assert!(light.nodes()[0].velocity.length() < 1e-4);
        assert!(heavy.nodes()[0].velocity.x > 0.0);
    }

    #[test]
    fn many_body_repels_and_respects_distance_max() {
        let config = ForceConfig::default();
        let mut near = pair(50.0);
        apply(&mut ManyBodyForce::new(&config), &mut near, 1.0);
        assert!(near.nodes()[0].velocity.x < 0.0);
        assert!(near.nodes()[1].velocity.x > 0.0);

        let mut far = pair(config.distance_max + 10.0);
        apply(&mut ManyBodyForce::new(&config), &mut far, 1.0);
        assert_eq!(far.nodes()[0].velocity, Vec2::ZERO);
    }

    #[test]
    fn many_body_pushes_coincident_nodes_apart_finitely() {
        let mut graph = pair(0.0);
        apply(&mut ManyBodyForce::new(&ForceConfig::default()), &mut graph, 1.0);
        let nodes = graph.nodes();
        assert!(nodes[0].velocity.is_finite());
        assert!(nodes[0].velocity.length() > 0.0);
        assert!(nodes[0].velocity.dot(nodes[1].velocity) < 0.0);
    }

    #[test]
    fn approximation_matches_direct_sum_far_away() {
        let mut input = GraphInput::default();
        input.nodes.push(NodeInput::new("outlier").at(-200.0, 0.0));
        for index in 0..100 {
            let id = format!("c{index}");
            input.nodes.push(
                NodeInput::new(&id).at((index % 10) as f32 * 2.0, (index / 10) as f32 * 2.0),
            );
        }
        let mut approximate = Graph::from_input(input.clone()).unwrap();
        let mut exact = Graph::from_input(input).unwrap();

        apply(&mut ManyBodyForce::new(&ForceConfig::default()), &mut approximate, 1.0);
        let exact_config = ForceConfig {
            theta: 0.0001,
            ..ForceConfig::default()
        };
        apply(&mut ManyBodyForce::new(&exact_config), &mut exact, 1.0);

        let a = approximate.nodes()[0].velocity;
        let e = exact.nodes()[0].velocity;
        assert!((a - e).length() / e.length() < 0.05, "{a:?} vs {e:?}");
    }

    #[test]
    fn collision_separates_overlapping_nodes() {
        let mut graph = pair(2.0);
        apply(
            &mut CollisionForce::new(&ForceConfig::default(), &RadiusConfig::default()),
            &mut graph,
            1.0,
        );
        let nodes = graph.nodes();
        assert!(nodes[0].velocity.x < 0.0);
        assert!(nodes[1].velocity.x > 0.0);
    }

    #[test]
    fn collision_split_favours_the_smaller_node() {
        let mut graph = Graph::from_input(GraphInput {
            nodes: vec![
                NodeInput::new("big").at(0.0, 0.0),
                NodeInput::new("small").at(4.0, 0.0),
                NodeInput::new("leaf").at(500.0, 500.0),
            ],
            edges: vec![EdgeInput::new("big", "leaf")],
        })
        .unwrap();
        apply(
            &mut CollisionForce::new(&ForceConfig::default(), &RadiusConfig::default()),
            &mut graph,
            1.0,
        );
        let nodes = graph.nodes();
        assert!(nodes[1].velocity.length() > nodes[0].velocity.length());
    }

    #[test]
    fn center_pulls_the_root_hardest() {
        let mut graph = Graph::from_input(GraphInput {
            nodes: vec![
                NodeInput::new("root").at(100.0, 0.0),
                NodeInput::new("leaf").at(100.0, 0.0),
            ],
            edges: vec![EdgeInput::new("root", "leaf")],
        })
        .unwrap();
        apply(&mut CenterForce::new(&ForceConfig::default()), &mut graph, 1.0);
        let nodes = graph.nodes();
        assert!(nodes[0].velocity.x < nodes[1].velocity.x);
        assert!(nodes[1].velocity.x < 0.0);
    }

    #[test]
    fn radial_by_level_moves_nodes_toward_their_ring() {
        let mut graph = pair(10.0);
        let mode = RadialConfig::ByLevel {
            ring_spacing: 80.0,
            strength: 0.5,
        };
        apply(
            &mut RadialForce::new(mode, &ForceConfig::default()),
            &mut graph,
            1.0,
        );
        assert!(graph.nodes()[1].velocity.x > 0.0);
        assert_eq!(graph.nodes()[0].velocity, Vec2::ZERO);
    }
}
