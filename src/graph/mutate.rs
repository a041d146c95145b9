use std::collections::HashMap;

use eframe::egui::Color32;
use tracing::{debug, warn};

use crate::error::GraphError;
use crate::source::{EdgeInput, GraphInput, NodeInput};
use crate::util::format_hex_color;

use super::build::{DEFAULT_NODE_COLOR, make_edge, make_node};
use super::{Graph, NodeId};

/// Indices of everything a mutation appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Added {
    pub nodes: Vec<usize>,
    pub edges: Vec<usize>,
}

pub trait NameSource {
    fn next_name(&mut self) -> String;
}

impl<F: FnMut() -> String> NameSource for F {
    fn next_name(&mut self) -> String {
        self()
    }
}

impl Graph {
    /// Returns an id of the form `n<seq>` that no node uses yet.
    pub fn allocate_id(&mut self) -> NodeId {
        loop {
            self.next_generated_id += 1;
            let id = NodeId::from(format!("n{}", self.next_generated_id));
            if !self.index_by_id.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn create_root(&mut self, name: &str, color: Color32) -> Result<usize, GraphError> {
        if let Some(root) = self.root_index {
            return Err(GraphError::RootExists(self.nodes[root].id.clone()));
        }
        let id = self.allocate_id();
        let mut input = NodeInput::named(id.as_str(), name).root();
        input.color = Some(format_hex_color(color));
        let added = self.extend(GraphInput {
            nodes: vec![input],
            edges: Vec::new(),
        })?;
        added.nodes.first().copied().ok_or(GraphError::Empty)
    }

    /// Appends `count` children under `parent`, one edge each.
    ///
    /// Children take the parent's color unless `color` overrides it and start at the
    /// parent's current position.
    pub fn add_children(
        &mut self,
        parent: &NodeId,
        count: usize,
        names: &mut dyn NameSource,
        color: Option<Color32>,
    ) -> Result<Added, GraphError> {
        if !self.index_by_id.contains_key(parent) {
            warn!(%parent, "add_children called with unknown parent");
            return Err(GraphError::UnknownNode(parent.clone()));
        }
        if count == 0 {
            return Ok(Added::default());
        }

        let mut batch = GraphInput::default();
        for _ in 0..count {
            let id = self.allocate_id();
            let mut node = NodeInput::named(id.as_str(), &names.next_name());
            node.color = color.map(format_hex_color);
            batch.edges.push(EdgeInput::new(parent.as_str(), id.as_str()));
            batch.nodes.push(node);
        }
        self.extend(batch)
    }

    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        weight: Option<f32>,
        color: Option<Color32>,
    ) -> Result<usize, GraphError> {
        let mut edge = EdgeInput::new(source.as_str(), target.as_str());
        edge.weight = weight;
        edge.color = color.map(format_hex_color);
        let added = self.extend(GraphInput {
            nodes: Vec::new(),
            edges: vec![edge],
        })?;
        added.edges.first().copied().ok_or(GraphError::Empty)
    }

    /// Validated append of new nodes and edges. Edges may reference existing nodes or
    /// nodes from the same batch.
    ///
    /// Nothing is modified unless the whole batch is valid. Existing nodes keep their
    /// position and velocity; a new node without coordinates starts where its parent
    /// currently is.
    pub fn extend(&mut self, batch: GraphInput) -> Result<Added, GraphError> {
        let base = self.nodes.len();

        let mut new_index_by_id: HashMap<NodeId, usize> = HashMap::with_capacity(batch.nodes.len());
        let mut new_nodes = Vec::with_capacity(batch.nodes.len());
        let mut explicit_colors = Vec::with_capacity(batch.nodes.len());
        let mut batch_root: Option<usize> = None;
        for (offset, raw) in batch.nodes.iter().enumerate() {
            let node = make_node(raw, DEFAULT_NODE_COLOR)?;
            if self.index_by_id.contains_key(&node.id)
                || new_index_by_id.insert(node.id.clone(), base + offset).is_some()
            {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
            if node.is_root {
                if let Some(existing) = self.root_index {
                    return Err(GraphError::RootExists(self.nodes[existing].id.clone()));
                }
                if let Some(first) = batch_root {
                    let first: &super::Node = &new_nodes[first - base];
                    return Err(GraphError::MultipleRoots {
                        first: first.id.clone(),
                        second: node.id.clone(),
                    });
                }
                batch_root = Some(base + offset);
            }
            explicit_colors.push(raw.color.is_some());
            new_nodes.push(node);
        }

        let edge_base = self.edges.len();
        let mut new_edges = Vec::with_capacity(batch.edges.len());
        for (offset, raw) in batch.edges.iter().enumerate() {
            let edge = make_edge(edge_base + offset, raw, |id| {
                self.index_by_id
                    .get(id)
                    .or_else(|| new_index_by_id.get(id))
                    .copied()
            })?;
            new_edges.push(edge);
        }

        self.nodes.extend(new_nodes);
        self.outgoing.resize(self.nodes.len(), Vec::new());
        self.incoming.resize(self.nodes.len(), Vec::new());
        self.index_by_id.extend(new_index_by_id);

        let added = Added {
            nodes: (base..self.nodes.len()).collect(),
            edges: (edge_base..edge_base + new_edges.len()).collect(),
        };
        for (offset, edge) in new_edges.into_iter().enumerate() {
            let index = edge_base + offset;
            self.outgoing[edge.source].push(index);
            self.incoming[edge.target].push(index);
            self.nodes[edge.source].child_count += 1;
            self.edges.push(edge);
        }

        for (offset, &index) in added.nodes.iter().enumerate() {
            let Some(parent) = self.parent_of(index) else {
                continue;
            };
            let (parent_color, parent_position, parent_placed) = {
                let parent = &self.nodes[parent];
                (parent.color, parent.position, parent.placed)
            };
            let node = &mut self.nodes[index];
            if !explicit_colors[offset] {
                node.color = parent_color;
            }
            if !node.placed && parent_placed {
                node.position = parent_position;
                node.placed = true;
            }
        }

        if self.root_index.is_none() {
            let root = batch_root.or_else(|| {
                added
                    .nodes
                    .iter()
                    .copied()
                    .find(|&index| self.incoming[index].is_empty())
            });
            if let Some(root) = root {
                self.nodes[root].is_root = true;
                self.root_index = Some(root);
            }
        }

        self.recompute_levels();
        self.revision += 1;
        debug!(
            nodes = added.nodes.len(),
            edges = added.edges.len(),
            revision = self.revision,
            "extended graph"
        );
        Ok(added)
    }
}
