use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::Graph;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchMatch {
    pub index: usize,
    pub score: i64,
}

struct SearchCache {
    query: String,
    revision: u64,
    matches: Vec<SearchMatch>,
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Ranks nodes against a query, caching the result until the query or the graph changes.
#[derive(Default)]
pub struct NodeSearch {
    matcher: SkimMatcherV2,
    cache: Option<SearchCache>,
}

impl NodeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches ordered by descending score, then by node index. Empty for a blank query.
    pub fn matches(&mut self, graph: &Graph, query: &str) -> &[SearchMatch] {
        let query = query.trim();
        let fresh = self
            .cache
            .as_ref()
            .is_some_and(|cache| cache.revision == graph.revision() && cache.query == query);
        if !fresh {
            let matches = self.rank(graph, query);
            self.cache = Some(SearchCache {
                query: query.to_owned(),
                revision: graph.revision(),
                matches,
            });
        }
        self.cache
            .as_ref()
            .map(|cache| cache.matches.as_slice())
            .unwrap_or(&[])
    }

    pub fn best(&mut self, graph: &Graph, query: &str) -> Option<usize> {
        self.matches(graph, query).first().map(|hit| hit.index)
    }

    fn rank(&self, graph: &Graph, query: &str) -> Vec<SearchMatch> {
        if query.is_empty() {
            return Vec::new();
        }

        let mut matches = graph
            .nodes()
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let by_name = fuzzy_match_score(&self.matcher, &node.name, query);
                let by_id = fuzzy_match_score(&self.matcher, node.id().as_str(), query);
                by_name
                    .max(by_id)
                    .map(|score| SearchMatch { index, score })
            })
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
        matches
    }
}
