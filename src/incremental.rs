use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::GraphError;
use crate::graph::{Added, Graph};
use crate::simulation::Simulation;
use crate::source::GraphInput;

/// Appends `batch`, then reheats only the region it touches at the configured
/// `reheat_alpha`.
///
/// The region is every new node, both endpoints of every new edge and the direct
/// neighbours of those endpoints. Settled nodes outside it stay pinned, and existing
/// nodes keep their positions and velocities. A rejected batch changes nothing.
pub fn merge_graph(
    graph: &mut Graph,
    simulation: &mut Simulation,
    batch: GraphInput,
) -> Result<Added, GraphError> {
    let added = graph.extend(batch).inspect_err(|error| {
        warn!(%error, "rejected graph merge");
    })?;

    let region = affected_region(graph, &added);
    let alpha = simulation.params().reheat_alpha;
    simulation.reheat_region(graph, alpha, &region);
    debug!(
        nodes = added.nodes.len(),
        edges = added.edges.len(),
        region = region.len(),
        alpha,
        "merged batch into live layout"
    );
    Ok(added)
}

pub fn affected_region(graph: &Graph, added: &Added) -> Vec<usize> {
    let mut region: BTreeSet<usize> = added.nodes.iter().copied().collect();
    let mut endpoints = BTreeSet::new();
    for edge in added.edges.iter().filter_map(|&edge| graph.edges().get(edge)) {
        endpoints.insert(edge.source());
        endpoints.insert(edge.target());
    }
    for &endpoint in &endpoints {
        region.insert(endpoint);
        region.extend(graph.neighbors(endpoint));
    }
    region.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::graph::NodeId;
    use crate::simulation::SimulationState;
    use crate::source::{EdgeInput, NodeInput};

    fn settled_layout() -> (Graph, Simulation) {
        let mut graph = Graph::from_input(GraphInput {
            nodes: vec![
                NodeInput::new("hub"),
                NodeInput::new("a"),
                NodeInput::new("b"),
                NodeInput::new("far"),
                NodeInput::new("far-child"),
            ],
            edges: vec![
                EdgeInput::new("hub", "a"),
                EdgeInput::new("hub", "b"),
                EdgeInput::new("hub", "far"),
                EdgeInput::new("far", "far-child"),
            ],
        })
        .unwrap();
        let mut simulation = Simulation::new(&LayoutConfig::default());
        assert!(simulation.run_until_converged(&mut graph, 1_000).converged);
        (graph, simulation)
    }

    #[test]
    fn merge_reheats_only_the_touched_region() {
        let (mut graph, mut simulation) = settled_layout();
        let a = graph.index_of(&NodeId::from("a")).unwrap();
        let far_child = graph.index_of(&NodeId::from("far-child")).unwrap();
        let far_child_position = graph.nodes()[far_child].position;
        let a_position = graph.nodes()[a].position;

        let added = merge_graph(
            &mut graph,
            &mut simulation,
            GraphInput {
                nodes: vec![NodeInput::new("a-new")],
                edges: vec![EdgeInput::new("a", "a-new")],
            },
        )
        .unwrap();

        assert_eq!(simulation.state(), SimulationState::Running);
        assert!((simulation.alpha() - 0.3).abs() < 1e-6);
        let new_index = added.nodes[0];
        assert_eq!(graph.nodes()[new_index].position, a_position);
        assert!(!graph.nodes()[a].is_settled());
        assert!(graph.nodes()[far_child].is_settled());

        simulation.run_until_converged(&mut graph, 1_000);
        assert_eq!(graph.nodes()[far_child].position, far_child_position);
    }

    #[test]
    fn region_covers_endpoints_and_their_neighbours() {
        let (mut graph, _) = settled_layout();
        let added = graph
            .extend(GraphInput {
                nodes: vec![NodeInput::new("x")],
                edges: vec![EdgeInput::new("a", "x")],
            })
            .unwrap();
        let region = affected_region(&graph, &added);
        let index = |id: &str| graph.index_of(&NodeId::from(id)).unwrap();
        for id in ["x", "a", "hub"] {
            assert!(region.contains(&index(id)), "{id} missing");
        }
        assert!(!region.contains(&index("far-child")));
        assert!(!region.contains(&index("b")));
    }

    #[test]
    fn rejected_merge_leaves_layout_settled() {
        let (mut graph, mut simulation) = settled_layout();
        let result = merge_graph(
            &mut graph,
            &mut simulation,
            GraphInput {
                nodes: Vec::new(),
                edges: vec![EdgeInput::new("a", "ghost")],
            },
        );
        assert!(matches!(result, Err(GraphError::DanglingEdge { .. })));
        assert_eq!(simulation.state(), SimulationState::Converged);
        assert!(graph.nodes().iter().all(|node| node.is_settled()));
    }
}
