use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("graph input contains no nodes")]
    Empty,
    #[error("node id `{0}` is used more than once")]
    DuplicateNode(NodeId),
    #[error("edge #{edge} references unknown node `{endpoint}`")]
    DanglingEdge { edge: usize, endpoint: NodeId },
    #[error("node `{0}` does not exist")]
    UnknownNode(NodeId),
    #[error("edge from `{0}` to itself is not allowed")]
    SelfLoop(NodeId),
    #[error("graph declares more than one root (`{first}` and `{second}`)")]
    MultipleRoots { first: NodeId, second: NodeId },
    #[error("graph already has root `{0}`")]
    RootExists(NodeId),
    #[error("edge #{edge} has invalid weight {weight}; weights must be positive and finite")]
    InvalidWeight { edge: usize, weight: f32 },
    #[error("invalid color `{0}`; expected #rrggbb")]
    InvalidColor(String),
    #[error("node `{id}` has a non-finite coordinate")]
    InvalidPosition { id: NodeId },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON graph payload")]
    Json(#[from] serde_json::Error),
    #[error("unrecognised graph payload: {0}")]
    Shape(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
    #[error("min_zoom ({min}) must not exceed max_zoom ({max})")]
    ZoomBounds { min: f32, max: f32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewportError {
    #[error("zoom request ({x}, {y}) at scale {scale} is not finite")]
    NonFinite { x: f32, y: f32, scale: f32 },
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Viewport(#[from] ViewportError),
    #[error("no parent node is available to receive new children")]
    NoParent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_edge_message_names_the_endpoint() {
        let error = GraphError::DanglingEdge {
            edge: 3,
            endpoint: NodeId::from("ghost"),
        };
        assert_eq!(error.to_string(), "edge #3 references unknown node `ghost`");
    }

    #[test]
    fn layout_error_is_transparent_over_graph_errors() {
        let error = LayoutError::from(GraphError::UnknownNode(NodeId::from("n9")));
        assert_eq!(error.to_string(), "node `n9` does not exist");
    }
}
