use std::collections::BTreeMap;

use crate::text::normalize_tags;

/// Tag frequencies plus pairwise co-occurrence counts over a corpus of tag
/// sets. Pairs are stored once with the lexicographically smaller tag first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooccurrenceGraph {
    frequencies: BTreeMap<String, usize>,
    edges: BTreeMap<(String, String), usize>,
}

impl CooccurrenceGraph {
    pub fn from_tag_sets<I, T, S>(tag_sets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut graph = Self::default();
        for tags in tag_sets {
            let tags = normalize_tags(tags.as_ref());
            for (position, tag) in tags.iter().enumerate() {
                *graph.frequencies.entry(tag.clone()).or_default() += 1;
                for other in &tags[position + 1..] {
                    *graph.edges.entry(edge_key(tag, other)).or_default() += 1;
                }
            }
        }
        graph
    }

    /// Records carrying both tags.
    #[must_use]
    pub fn weight(&self, lhs: &str, rhs: &str) -> usize {
        if lhs == rhs {
            return self.frequency(lhs);
        }
        self.edges
            .get(&edge_key(lhs, rhs))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn frequency(&self, tag: &str) -> usize {
        self.frequencies.get(tag).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.frequencies.contains_key(tag)
    }

    /// Tags ordered by frequency desc, then name.
    #[must_use]
    pub fn tags_by_frequency(&self) -> Vec<&str> {
        let mut tags = self
            .frequencies
            .iter()
            .map(|(tag, count)| (tag.as_str(), *count))
            .collect::<Vec<_>>();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tags.into_iter().map(|(tag, _)| tag).collect()
    }
}

fn edge_key(lhs: &str, rhs: &str) -> (String, String) {
    if lhs <= rhs {
        (lhs.to_string(), rhs.to_string())
    } else {
        (rhs.to_string(), lhs.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_pairs_symmetrically_and_ignores_duplicates() {
        let graph = CooccurrenceGraph::from_tag_sets([
            vec!["Python", "web", "python"],
            vec!["web", "python"],
            vec!["docker"],
        ]);
        assert_eq!(graph.weight("python", "web"), 2);
        assert_eq!(graph.weight("web", "python"), 2);
        assert_eq!(graph.weight("docker", "web"), 0);
        assert_eq!(graph.frequency("python"), 2);
        assert_eq!(graph.weight("docker", "python"), 0);
    }

    #[test]
    fn tags_by_frequency_breaks_ties_by_name() {
        let graph = CooccurrenceGraph::from_tag_sets([vec!["b", "a"], vec!["c"], vec!["c"]]);
        assert_eq!(graph.tags_by_frequency(), vec!["c", "a", "b"]);
    }
}
