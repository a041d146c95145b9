use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::graph::{Graph, NameSource};

use super::{ContentSource, GraphInput, HierarchyInput, RawId};

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "labore", "dolore", "magna", "aliqua", "enim", "minim",
    "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip",
    "commodo", "consequat", "duis", "aute", "irure", "voluptate", "velit", "esse", "cillum",
    "fugiat", "nulla", "pariatur", "excepteur", "sint", "occaecat", "cupidatat", "proident",
];

/// d3's category10 scheme.
const PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const ROOT_COLOR: &str = "#177e89";
const BRANCH_CHANCE: f64 = 0.2;
const MAX_DEPTH: usize = 4;

/// Seeded names, parents and link pairs for interactive growth.
pub struct RandomContent {
    rng: StdRng,
}

impl RandomContent {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    fn words(&mut self, count: usize) -> String {
        let mut name = String::new();
        for index in 0..count {
            let word = WORDS.choose(&mut self.rng).copied().unwrap_or("node");
            if index == 0 {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    name.extend(first.to_uppercase());
                    name.push_str(chars.as_str());
                }
            } else {
                name.push(' ');
                name.push_str(word);
            }
        }
        name
    }
}

impl ContentSource for RandomContent {
    fn node_name(&mut self) -> String {
        let count = self.rng.gen_range(1..=3);
        self.words(count)
    }

    /// Prefers a non-root parent so growth deepens existing branches; falls back to the root.
    fn pick_parent(&mut self, graph: &Graph) -> Option<usize> {
        let branches = graph
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_parent() && !node.is_root())
            .map(|(index, _)| index)
            .collect::<Vec<_>>();
        branches
            .choose(&mut self.rng)
            .copied()
            .or_else(|| graph.root_index())
    }

    fn link_candidates(&mut self, graph: &Graph, count: usize) -> Vec<(usize, usize)> {
        let len = graph.len();
        let mut pairs = Vec::with_capacity(count);
        if len < 2 {
            return pairs;
        }

        let attempts = count.saturating_mul(8);
        for _ in 0..attempts {
            if pairs.len() == count {
                break;
            }
            let source = self.rng.gen_range(0..len);
            let target = self.rng.gen_range(0..len);
            if source == target
                || graph.are_linked(source, target)
                || pairs.contains(&(source, target))
                || pairs.contains(&(target, source))
            {
                continue;
            }
            pairs.push((source, target));
        }
        pairs
    }
}

impl NameSource for RandomContent {
    fn next_name(&mut self) -> String {
        self.node_name()
    }
}

/// Random hierarchy: 5 to 10 top-level branches, each of which has a one-in-five chance
/// of carrying 1 to 6 children of its own, recursively.
pub fn generate_hierarchy(seed: u64) -> GraphInput {
    let mut content = RandomContent::seeded(seed);
    let mut next_id = 0usize;

    let mut root = HierarchyInput {
        id: RawId::from("root"),
        name: Some(content.words(2)),
        color: Some(ROOT_COLOR.to_owned()),
        children: Vec::new(),
    };
    let count = content.rng.gen_range(5..=10);
    for branch in 0..count {
        let mut child = grow(&mut content, &mut next_id, 1);
        child.color = Some(PALETTE[branch % PALETTE.len()].to_owned());
        root.children.push(child);
    }

    let input = root.flatten();
    debug!(seed, nodes = input.nodes.len(), "generated hierarchy");
    input
}

fn grow(content: &mut RandomContent, next_id: &mut usize, depth: usize) -> HierarchyInput {
    *next_id += 1;
    let mut record = HierarchyInput {
        id: RawId::Text(format!("g{next_id}")),
        name: Some(content.node_name()),
        color: None,
        children: Vec::new(),
    };
    if depth < MAX_DEPTH && content.rng.gen_bool(BRANCH_CHANCE) {
        let count = content.rng.gen_range(1..=6);
        for _ in 0..count {
            record.children.push(grow(content, next_id, depth + 1));
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{EdgeInput, NodeInput};

    #[test]
    fn same_seed_same_hierarchy() {
        assert_eq!(generate_hierarchy(11), generate_hierarchy(11));
    }

    #[test]
    fn generated_hierarchy_builds_a_rooted_tree() {
        for seed in 0..20 {
            let input = generate_hierarchy(seed);
            let graph = Graph::from_input(input).unwrap();
            let root = graph.root_index().unwrap();
            let top = graph.nodes()[root].child_count();
            assert!((5..=10).contains(&top), "seed {seed}: {top} branches");
            assert_eq!(graph.edges().len(), graph.len() - 1);
            assert!(graph.nodes().iter().all(|node| node.level().is_some()));
        }
    }

    #[test]
    fn link_candidates_are_new_and_distinct() {
        let graph = Graph::from_input(GraphInput {
            nodes: ["a", "b", "c", "d"].iter().map(|id| NodeInput::new(id)).collect(),
            edges: vec![EdgeInput::new("a", "b")],
        })
        .unwrap();
        let mut content = RandomContent::seeded(3);
        let pairs = content.link_candidates(&graph, 3);
        assert!(pairs.len() <= 3);
        for &(source, target) in &pairs {
            assert_ne!(source, target);
            assert!(!graph.are_linked(source, target));
        }
    }

    #[test]
    fn pick_parent_falls_back_to_root() {
        let graph = Graph::from_input(GraphInput {
            nodes: vec![NodeInput::new("r"), NodeInput::new("leaf")],
            edges: vec![EdgeInput::new("r", "leaf")],
        })
        .unwrap();
        let mut content = RandomContent::seeded(0);
        assert_eq!(content.pick_parent(&graph), Some(0));
    }

    #[test]
    fn names_are_capitalised_words() {
        let mut content = RandomContent::seeded(9);
        for _ in 0..10 {
            let name = content.node_name();
            assert!(name.chars().next().is_some_and(char::is_uppercase), "{name}");
        }
    }
}
