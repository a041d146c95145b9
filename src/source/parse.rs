use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::SourceError;
use crate::graph::Graph;

use super::{GraphInput, HierarchyInput};

/// Accepts either a flat `{ nodes, edges | links }` payload or a nested hierarchy rooted
/// at an object with an `id`.
pub fn parse_graph_json(raw: &str) -> Result<GraphInput, SourceError> {
    let parsed: Value = serde_json::from_str(raw)?;
    let object = parsed
        .as_object()
        .ok_or_else(|| SourceError::Shape("expected a JSON object at the top level".to_owned()))?;

    if object.contains_key("nodes") {
        let input: GraphInput = serde_json::from_value(parsed)?;
        return Ok(input);
    }

    if object.contains_key("id") {
        let hierarchy: HierarchyInput = serde_json::from_value(parsed)?;
        return Ok(hierarchy.flatten());
    }

    Err(SourceError::Shape(
        "expected a `nodes` array or a hierarchy record with an `id`".to_owned(),
    ))
}

pub fn read_graph_file(path: &Path) -> Result<Graph, SourceError> {
    let raw = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let input = parse_graph_json(&raw)?;
    Ok(Graph::from_input(input)?)
}
