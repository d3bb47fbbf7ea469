use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::cooccurrence::CooccurrenceGraph;

/// Tags that co-occur often enough to be filed as siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    /// Most frequent member, or the caller-supplied root when one is set.
    pub parent: String,
    pub members: Vec<String>,
}

/// Proposed mapping of every known tag to a keyword path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTaxonomy {
    mappings: BTreeMap<String, Vec<String>>,
    frequencies: BTreeMap<String, usize>,
    pub groups: Vec<TagGroup>,
}

impl ProposedTaxonomy {
    #[must_use]
    pub fn path_for(&self, tag: &str) -> Option<&[String]> {
        self.mappings.get(tag).map(Vec::as_slice)
    }

    #[must_use]
    pub fn frequency(&self, tag: &str) -> usize {
        self.frequencies.get(tag).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn mappings(&self) -> &BTreeMap<String, Vec<String>> {
        &self.mappings
    }

    /// Distinct proposed paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<Vec<String>> {
        self.mappings
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Pins `tag` to an explicit path, overriding the inferred one.
    pub fn insert(&mut self, tag: String, path: Vec<String>) {
        self.mappings.insert(tag, path);
    }
}

/// Builds the proposal in three passes: hyphenated tags whose prefix is
/// itself a tag are set aside for nesting, the remaining tags are grouped
/// around the most frequent ungrouped tag (every tag co-occurring with it
/// more than `threshold` times joins), and the nested tags are finally placed
/// under their prefix's path.
pub(super) fn propose(
    graph: &CooccurrenceGraph,
    threshold: usize,
    root: Option<&str>,
) -> ProposedTaxonomy {
    let base = root.map(|root| vec![root.to_string()]).unwrap_or_default();
    let ordered = graph.tags_by_frequency();

    let mut nested = BTreeMap::<&str, (&str, &str)>::new();
    for tag in ordered.iter().copied() {
        if let Some((prefix, rest)) = hyphen_split(tag)
            && graph.contains(prefix)
        {
            nested.insert(tag, (prefix, rest));
        }
    }

    let mut taxonomy = ProposedTaxonomy::default();
    let mut grouped = BTreeSet::<&str>::new();
    for head in ordered.iter().copied() {
        if nested.contains_key(head) || grouped.contains(head) {
            continue;
        }
        grouped.insert(head);
        let mut members = vec![head];
        for candidate in ordered.iter().copied() {
            if nested.contains_key(candidate) || grouped.contains(candidate) {
                continue;
            }
            if graph.weight(head, candidate) > threshold {
                grouped.insert(candidate);
                members.push(candidate);
            }
        }

        if members.len() == 1 {
            taxonomy.insert(head.to_string(), extend(&base, &[head]));
            continue;
        }
        let parent = root.unwrap_or(head);
        for member in &members {
            let path = if root.is_none() && *member == head {
                vec![head.to_string()]
            } else if root.is_none() {
                vec![head.to_string(), (*member).to_string()]
            } else {
                extend(&base, &[*member])
            };
            taxonomy.insert((*member).to_string(), path);
        }
        taxonomy.groups.push(TagGroup {
            parent: parent.to_string(),
            members: members.iter().map(ToString::to_string).collect(),
        });
    }

    // Nested tags can chain (`a-b-c` under `a-b` under `a`), so resolve until
    // no more progress is made. Prefix chains are finite and acyclic because
    // every prefix is strictly shorter than its tag.
    let mut unresolved = nested;
    while !unresolved.is_empty() {
        let before = unresolved.len();
        unresolved.retain(|tag, &mut (prefix, rest)| {
            let Some(prefix_path) = taxonomy.path_for(prefix).map(<[String]>::to_vec) else {
                return true;
            };
            taxonomy.insert((*tag).to_string(), extend(&prefix_path, &[rest]));
            false
        });
        if unresolved.len() == before {
            break;
        }
    }
    for tag in unresolved.keys().copied() {
        taxonomy.insert(tag.to_string(), extend(&base, &[tag]));
    }

    taxonomy.frequencies = ordered
        .iter()
        .map(|tag| ((*tag).to_string(), graph.frequency(tag)))
        .collect();
    taxonomy
}

/// `python-web` → `("python", "web")`. The split is at the last hyphen whose
/// prefix is non-empty, so `a-b-c` nests under `a-b` when that tag exists.
fn hyphen_split(tag: &str) -> Option<(&str, &str)> {
    let (prefix, rest) = tag.rsplit_once('-')?;
    (!prefix.is_empty() && !rest.is_empty()).then_some((prefix, rest))
}

fn extend(base: &[String], tail: &[&str]) -> Vec<String> {
    base.iter()
        .cloned()
        .chain(tail.iter().map(ToString::to_string))
        .collect()
}
