//! Graph sources: typed input records, JSON ingestion and the random content generator.
//!
//! Sources only ever produce [`GraphInput`]; they never touch the simulation.

mod generate;
mod parse;

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NodeId};

pub use generate::{RandomContent, generate_hierarchy};
pub use parse::{parse_graph_json, read_graph_file};

/// Node ids arrive as strings or numbers; both map to the same canonical [`NodeId`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    pub fn canonical(&self) -> NodeId {
        match self {
            Self::Text(text) => NodeId::from(text.as_str()),
            Self::Number(number) => NodeId::from(number.to_string()),
        }
    }
}

impl From<&str> for RawId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInput {
    pub id: RawId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub fixed_x: Option<f32>,
    #[serde(default)]
    pub fixed_y: Option<f32>,
}

impl NodeInput {
    pub fn new(id: &str) -> Self {
        Self {
            id: RawId::from(id),
            name: None,
            color: None,
            x: None,
            y: None,
            is_root: false,
            fixed_x: None,
            fixed_y: None,
        }
    }

    pub fn named(id: &str, name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..Self::new(id)
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn root(mut self) -> Self {
        self.is_root = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeInput {
    pub source: RawId,
    pub target: RawId,
    #[serde(default)]
    pub weight: Option<f32>,
    #[serde(default)]
    pub color: Option<String>,
}

impl EdgeInput {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: RawId::from(source),
            target: RawId::from(target),
            weight: None,
            color: None,
        }
    }
}

/// A complete graph, or a batch of additions when handed to [`Graph::extend`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphInput {
    #[serde(default)]
    pub nodes: Vec<NodeInput>,
    #[serde(default, alias = "links")]
    pub edges: Vec<EdgeInput>,
}

/// Nested `{ id, name, color, children }` records, as produced by hierarchy builders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HierarchyInput {
    pub id: RawId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub children: Vec<HierarchyInput>,
}

impl HierarchyInput {
    /// Flattens depth-first; the top record becomes the root and children inherit colors.
    pub fn flatten(&self) -> GraphInput {
        let mut input = GraphInput::default();
        let mut stack = vec![(self, None::<&RawId>, None::<&String>)];
        while let Some((record, parent, inherited_color)) = stack.pop() {
            let color = record.color.as_ref().or(inherited_color);
            input.nodes.push(NodeInput {
                id: record.id.clone(),
                name: record.name.clone(),
                color: color.cloned(),
                x: None,
                y: None,
                is_root: parent.is_none(),
                fixed_x: None,
                fixed_y: None,
            });
            if let Some(parent) = parent {
                input.edges.push(EdgeInput {
                    source: parent.clone(),
                    target: record.id.clone(),
                    weight: None,
                    color: None,
                });
            }
            for child in record.children.iter().rev() {
                stack.push((child, Some(&record.id), color));
            }
        }
        input
    }
}

/// Supplies content for interactive growth. Swappable so tests and tools can be deterministic.
pub trait ContentSource {
    fn node_name(&mut self) -> String;

    /// Parent used by "add nodes" when the caller does not name one.
    fn pick_parent(&mut self, graph: &Graph) -> Option<usize>;

    /// Up to `count` new `(source, target)` pairs for "add links".
    fn link_candidates(&mut self, graph: &Graph, count: usize) -> Vec<(usize, usize)>;
}
