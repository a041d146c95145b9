use std::collections::HashMap;

use eframe::egui::{Color32, vec2};
use tracing::debug;

use crate::error::GraphError;
use crate::source::{EdgeInput, GraphInput, NodeInput};
use crate::util::parse_hex_color;

use super::{Edge, Graph, Node, NodeId};

pub(super) const DEFAULT_NODE_COLOR: Color32 = Color32::from_rgb(0x17, 0x7e, 0x89);

pub(super) fn make_node(input: &NodeInput, fallback_color: Color32) -> Result<Node, GraphError> {
    let id = input.id.canonical();
    let color = match &input.color {
        Some(raw) => parse_hex_color(raw)?,
        None => fallback_color,
    };
    let name = input.name.clone().unwrap_or_else(|| id.to_string());

    let mut node = Node::new(id, name, color);
    if let (Some(x), Some(y)) = (input.x, input.y) {
        if !x.is_finite() || !y.is_finite() {
            return Err(GraphError::InvalidPosition { id: node.id.clone() });
        }
        node.position = vec2(x, y);
        node.placed = true;
    }
    for fixed in [input.fixed_x, input.fixed_y].into_iter().flatten() {
        if !fixed.is_finite() {
            return Err(GraphError::InvalidPosition { id: node.id.clone() });
        }
    }
    node.fixed_x = input.fixed_x;
    node.fixed_y = input.fixed_y;
    if let Some(x) = node.fixed_x {
        node.position.x = x;
    }
    if let Some(y) = node.fixed_y {
        node.position.y = y;
    }
    if node.fixed_x.is_some() && node.fixed_y.is_some() {
        node.placed = true;
    }
    node.is_root = input.is_root;
    Ok(node)
}

pub(super) fn make_edge(
    position: usize,
    input: &EdgeInput,
    resolve: impl Fn(&NodeId) -> Option<usize>,
) -> Result<Edge, GraphError> {
    let source_id = input.source.canonical();
    let target_id = input.target.canonical();
    let source = resolve(&source_id).ok_or_else(|| GraphError::DanglingEdge {
        edge: position,
        endpoint: source_id.clone(),
    })?;
    let target = resolve(&target_id).ok_or(GraphError::DanglingEdge {
        edge: position,
        endpoint: target_id,
    })?;
    if source == target {
        return Err(GraphError::SelfLoop(source_id));
    }
    if let Some(weight) = input.weight
        && !(weight.is_finite() && weight > 0.0)
    {
        return Err(GraphError::InvalidWeight {
            edge: position,
            weight,
        });
    }
    let color = input.color.as_deref().map(parse_hex_color).transpose()?;

    Ok(Edge {
        source,
        target,
        weight: input.weight,
        color,
    })
}

impl Graph {
    /// Builds a graph, resolving every edge endpoint once.
    ///
    /// Fails on duplicate ids, dangling or self-referencing edges, invalid weights or
    /// colors, and more than one explicit root. Without an explicit root, the first node
    /// nothing points at becomes the root.
    pub fn from_input(input: GraphInput) -> Result<Self, GraphError> {
        if input.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut nodes = Vec::with_capacity(input.nodes.len());
        let mut index_by_id = HashMap::with_capacity(input.nodes.len());
        let mut root_index: Option<usize> = None;
        for (index, raw) in input.nodes.iter().enumerate() {
            let node = make_node(raw, DEFAULT_NODE_COLOR)?;
            if index_by_id.insert(node.id.clone(), index).is_some() {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
            if node.is_root {
                if let Some(first) = root_index {
                    let first: &Node = &nodes[first];
                    return Err(GraphError::MultipleRoots {
                        first: first.id.clone(),
                        second: node.id.clone(),
                    });
                }
                root_index = Some(index);
            }
            nodes.push(node);
        }

        let mut edges = Vec::with_capacity(input.edges.len());
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];
        for (position, raw) in input.edges.iter().enumerate() {
            let edge = make_edge(position, raw, |id| index_by_id.get(id).copied())?;
            outgoing[edge.source].push(position);
            incoming[edge.target].push(position);
            nodes[edge.source].child_count += 1;
            edges.push(edge);
        }

        let root_index = root_index
            .or_else(|| (0..nodes.len()).find(|&index| incoming[index].is_empty()))
            .or(Some(0));
        if let Some(root) = root_index {
            nodes[root].is_root = true;
        }

        let mut graph = Self {
            next_generated_id: nodes.len() as u64,
            nodes,
            edges,
            index_by_id,
            outgoing,
            incoming,
            root_index,
            revision: 1,
        };
        graph.recompute_levels();
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "built graph from input"
        );
        Ok(graph)
    }
}
