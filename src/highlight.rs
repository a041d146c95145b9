use std::collections::BTreeSet;

use crate::graph::{Graph, NodeId};

pub const DEFAULT_FADE_MS: f32 = 500.0;

/// What to emphasise for the current selection.
///
/// `nodes` and `edges` hold indices for renderers; the id sets are the stable,
/// index-independent description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightSet {
    pub node_ids: BTreeSet<NodeId>,
    pub edge_source_ids: BTreeSet<NodeId>,
    pub nodes: BTreeSet<usize>,
    pub edges: BTreeSet<usize>,
}

impl HighlightSet {
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn contains_node(&self, index: usize) -> bool {
        self.nodes.contains(&index)
    }

    pub fn contains_edge(&self, index: usize) -> bool {
        self.edges.contains(&index)
    }
}

/// A parent highlights itself, its direct children and the edges to them. Any other
/// node highlights only itself; `None` or an unknown index highlights nothing.
pub fn compute_highlight_set(graph: &Graph, selected: Option<usize>) -> HighlightSet {
    let mut set = HighlightSet::default();
    let Some((index, node)) = selected.and_then(|index| Some((index, graph.node(index)?))) else {
        return set;
    };

    set.node_ids.insert(node.id().clone());
    set.nodes.insert(index);
    if !node.is_parent() {
        return set;
    }

    set.edge_source_ids.insert(node.id().clone());
    for &edge in graph.outgoing(index) {
        let Some(target) = graph.edges().get(edge).map(|edge| edge.target()) else {
            continue;
        };
        if let Some(child) = graph.node(target) {
            set.node_ids.insert(child.id().clone());
            set.nodes.insert(target);
            set.edges.insert(edge);
        }
    }
    set
}

/// Eases a highlight in when one appears and out after it clears.
///
/// While fading out the last non-empty set stays available through
/// [`HighlightFade::visible`] so the renderer can keep drawing it.
#[derive(Clone, Debug)]
pub struct HighlightFade {
    current: HighlightSet,
    fading: Option<HighlightSet>,
    value: f32,
    duration_ms: f32,
}

impl Default for HighlightFade {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_MS)
    }
}

impl HighlightFade {
    pub fn new(duration_ms: f32) -> Self {
        Self {
            current: HighlightSet::default(),
            fading: None,
            value: 0.0,
            duration_ms: duration_ms.max(0.0),
        }
    }

    pub fn set(&mut self, next: HighlightSet) {
        if next == self.current {
            return;
        }
        if next.is_empty() && !self.current.is_empty() {
            self.fading = Some(std::mem::take(&mut self.current));
        } else {
            self.fading = None;
        }
        self.current = next;
    }

    pub fn current(&self) -> &HighlightSet {
        &self.current
    }

    /// The set to draw: the live one, or the one fading out.
    pub fn visible(&self) -> Option<&HighlightSet> {
        if !self.current.is_empty() {
            Some(&self.current)
        } else {
            self.fading.as_ref()
        }
    }

    /// 0 for no emphasis, 1 for full emphasis.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_animating(&self) -> bool {
        let target = if self.current.is_empty() { 0.0 } else { 1.0 };
        self.value != target
    }

    pub fn advance(&mut self, dt_ms: f32) {
        let target = if self.current.is_empty() { 0.0 } else { 1.0 };
        let step = if self.duration_ms > 0.0 {
            dt_ms.max(0.0) / self.duration_ms
        } else {
            1.0
        };
        self.value = if target > self.value {
            (self.value + step).min(target)
        } else {
            (self.value - step).max(target)
        };
        if self.value <= 0.0 {
            self.fading = None;
        }
    }
}
