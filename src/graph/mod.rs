//! Append-only graph model shared by the simulation, the viewport and the renderer.
//!
//! Nodes and edges are never removed, so the indices handed out here stay valid for the
//! lifetime of a [`Graph`]. Edge endpoints are resolved from ids to indices exactly once,
//! when the edge is added.

mod build;
mod mutate;

use std::collections::{HashMap, VecDeque};
use std::fmt;

use eframe::egui::{Color32, Rect, Vec2, pos2};
use serde::Serialize;

use crate::config::RadiusConfig;

pub use mutate::{Added, NameSource};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeRole {
    Root,
    Parent,
    Leaf,
}

#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    pub name: String,
    pub color: Color32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub fixed_x: Option<f32>,
    pub fixed_y: Option<f32>,
    /// Pinned by convergence rather than by the caller.
    pub(crate) settled: bool,
    /// Has a meaningful position; unplaced nodes are seeded when the simulation binds.
    pub(crate) placed: bool,
    is_root: bool,
    child_count: usize,
    level: Option<u32>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, color: Color32) -> Self {
        Self {
            id,
            name,
            color,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            fixed_x: None,
            fixed_y: None,
            settled: false,
            placed: false,
            is_root: false,
            child_count: 0,
            level: None,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn child_count(&self) -> usize {
        self.child_count
    }

    pub fn is_parent(&self) -> bool {
        self.child_count > 0
    }

    pub fn level(&self) -> Option<u32> {
        self.level
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_x.is_some() || self.fixed_y.is_some()
    }

    pub fn role(&self) -> NodeRole {
        if self.is_root {
            NodeRole::Root
        } else if self.is_parent() {
            NodeRole::Parent
        } else {
            NodeRole::Leaf
        }
    }

    pub fn radius(&self, radii: &RadiusConfig) -> f32 {
        match self.role() {
            NodeRole::Root => radii.root,
            NodeRole::Parent => radii.parent,
            NodeRole::Leaf => radii.child,
        }
    }

    /// Pins the node at its current position until [`Node::unpin`] is called.
    /// Caller pins survive reheats.
    pub fn pin(&mut self) {
        self.fixed_x = Some(self.position.x);
        self.fixed_y = Some(self.position.y);
        self.velocity = Vec2::ZERO;
        self.settled = false;
    }

    pub fn unpin(&mut self) {
        self.fixed_x = None;
        self.fixed_y = None;
        self.settled = false;
    }

    pub(crate) fn settle(&mut self) {
        self.velocity = Vec2::ZERO;
        if self.fixed_x.is_none() && self.fixed_y.is_none() {
            self.fixed_x = Some(self.position.x);
            self.fixed_y = Some(self.position.y);
            self.settled = true;
        }
    }

    pub(crate) fn release(&mut self) {
        if self.settled {
            self.fixed_x = None;
            self.fixed_y = None;
            self.settled = false;
        }
    }
}

#[derive(Clone, Debug)]
pub struct Edge {
    source: usize,
    target: usize,
    pub weight: Option<f32>,
    pub color: Option<Color32>,
}

impl Edge {
    pub fn source(&self) -> usize {
        self.source
    }

    pub fn target(&self) -> usize {
        self.target
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodePosition {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    index_by_id: HashMap<NodeId, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    root_index: Option<usize>,
    revision: u64,
    next_generated_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    pub fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node_by_id(&self, id: &NodeId) -> Option<&Node> {
        self.index_of(id).and_then(|index| self.nodes.get(index))
    }

    pub fn root_index(&self) -> Option<usize> {
        self.root_index
    }

    /// Bumped on every structural change; the simulation rebinds its forces when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Indices of edges whose source is `index`.
    pub fn outgoing(&self, index: usize) -> &[usize] {
        self.outgoing.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Indices of edges whose target is `index`.
    pub fn incoming(&self, index: usize) -> &[usize] {
        self.incoming.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.outgoing(index)
            .iter()
            .filter_map(|&edge| self.edges.get(edge).map(Edge::target))
    }

    /// Source of the first edge pointing at `index`.
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.incoming(index)
            .first()
            .and_then(|&edge| self.edges.get(edge))
            .map(Edge::source)
    }

    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let parents = self
            .incoming(index)
            .iter()
            .filter_map(|&edge| self.edges.get(edge).map(Edge::source));
        self.children(index).chain(parents)
    }

    pub fn are_linked(&self, a: usize, b: usize) -> bool {
        self.children(a).any(|target| target == b) || self.children(b).any(|target| target == a)
    }

    pub fn bounds(&self) -> Option<Rect> {
        let first = self.nodes.first()?;
        let start = pos2(first.position.x, first.position.y);
        let rect = self
            .nodes
            .iter()
            .fold(Rect::from_min_max(start, start), |rect, node| {
                rect.union(Rect::from_min_max(
                    pos2(node.position.x, node.position.y),
                    pos2(node.position.x, node.position.y),
                ))
            });
        Some(rect)
    }

    /// Snapshot of every node's position for consumers that do not read the graph directly.
    pub fn positions(&self) -> Vec<NodePosition> {
        self.nodes
            .iter()
            .map(|node| NodePosition {
                id: node.id.clone(),
                x: node.position.x,
                y: node.position.y,
            })
            .collect()
    }

    pub(crate) fn split_mut(&mut self) -> (&mut [Node], &[Edge]) {
        (&mut self.nodes, &self.edges)
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    fn recompute_levels(&mut self) {
        for node in &mut self.nodes {
            node.level = None;
        }

        let Some(root) = self.root_index else {
            return;
        };

        let mut queue = VecDeque::from([(root, 0u32)]);
        self.nodes[root].level = Some(0);
        while let Some((index, level)) = queue.pop_front() {
            for &edge in &self.outgoing[index] {
                let target = self.edges[edge].target;
                if self.nodes[target].level.is_none() {
                    self.nodes[target].level = Some(level + 1);
                    queue.push_back((target, level + 1));
                }
            }
        }
    }
}
