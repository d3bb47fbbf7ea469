use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{KeypathError, Result};
use crate::models::KeywordChild;
use crate::text::normalize_path;

mod restructure;
mod validate;

/// Stable handle of a keyword node. Ids are never reused within one tree, so
/// a stale id resolves to nothing instead of to an unrelated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

const ROOT: NodeId = NodeId(0);

#[derive(Debug, Clone)]
struct KeywordNode {
    label: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    records: BTreeSet<Arc<str>>,
}

impl KeywordNode {
    fn new(label: String, parent: Option<NodeId>) -> Self {
        Self {
            label,
            parent,
            children: BTreeMap::new(),
            records: BTreeSet::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.records.is_empty()
    }
}

/// Keyword hierarchy stored as an arena. The unlabeled root is addressed by
/// the empty path and is never pruned.
#[derive(Debug, Clone)]
pub struct TaxonomyTree {
    nodes: Vec<Option<KeywordNode>>,
    attachments: HashMap<Arc<str>, NodeId>,
}

impl Default for TaxonomyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxonomyTree {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(KeywordNode::new(String::new(), None))],
            attachments: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        ROOT
    }

    /// Live nodes, not counting the root.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count().saturating_sub(1)
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.attachments.len()
    }

    #[must_use]
    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|node| node.label.as_str())
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Resolves an already-normalized path.
    #[must_use]
    pub fn resolve(&self, path: &[String]) -> Option<NodeId> {
        let mut current = ROOT;
        for segment in path {
            current = *self.node(current)?.children.get(segment)?;
        }
        Some(current)
    }

    pub fn resolve_strict(&self, path: &[String]) -> Result<NodeId> {
        self.resolve(path)
            .ok_or_else(|| KeypathError::path_not_found(path))
    }

    /// Creates any missing nodes along `path` and returns the node at its end.
    pub fn ensure_path<S: AsRef<str>>(&mut self, path: &[S]) -> Result<NodeId> {
        let path = normalize_path(path)?;
        let mut current = ROOT;
        for segment in path {
            let existing = self
                .node(current)
                .and_then(|node| node.children.get(&segment).copied());
            current = match existing {
                Some(child) => child,
                None => self.alloc_child(current, segment)?,
            };
        }
        Ok(current)
    }

    /// Files `record_id` at `path`, moving it if it was attached elsewhere.
    pub fn attach<S: AsRef<str>>(&mut self, record_id: &str, path: &[S]) -> Result<NodeId> {
        let target = self.ensure_path(path)?;
        let previous = self.attachments.get(record_id).copied();
        if previous == Some(target) {
            return Ok(target);
        }
        let key: Arc<str> = Arc::from(record_id);
        self.node_mut(target)?.records.insert(key.clone());
        self.attachments.insert(key, target);
        if let Some(previous) = previous {
            if let Some(node) = self.node_slot_mut(previous) {
                node.records.remove(record_id);
            }
            self.prune_upward(previous);
        }
        Ok(target)
    }

    /// Detaches a record from the node at `path` and prunes emptied ancestors.
    pub fn remove(&mut self, record_id: &str, path: &[String]) -> Result<()> {
        let node_id = self.resolve_strict(path)?;
        let removed = self.node_mut(node_id)?.records.remove(record_id);
        if !removed {
            return Err(KeypathError::RecordNotFound(format!(
                "{record_id} is not attached at {}",
                crate::error::display_path(path)
            )));
        }
        self.attachments.remove(record_id);
        self.prune_upward(node_id);
        Ok(())
    }

    /// Detaches a record wherever it is filed. Returns its former path.
    pub fn detach(&mut self, record_id: &str) -> Option<Vec<String>> {
        let node_id = self.attachments.remove(record_id)?;
        let path = self.path_of(node_id);
        if let Some(node) = self.node_slot_mut(node_id) {
            node.records.remove(record_id);
        }
        self.prune_upward(node_id);
        Some(path)
    }

    /// Child labels of the node at `path` with the number of records
    /// reachable through each child.
    pub fn children(&self, path: &[String]) -> Result<Vec<KeywordChild>> {
        let node_id = self.resolve_strict(path)?;
        let Some(node) = self.node(node_id) else {
            return Err(KeypathError::path_not_found(path));
        };
        Ok(node
            .children
            .iter()
            .map(|(label, child)| KeywordChild {
                label: label.clone(),
                count: self.reachable_record_count(*child),
            })
            .collect())
    }

    #[must_use]
    pub fn records_at(&self, id: NodeId) -> Vec<Arc<str>> {
        self.node(id)
            .map(|node| node.records.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Records attached at `id` or any descendant, in DFS order.
    #[must_use]
    pub fn records_under(&self, id: NodeId) -> Vec<Arc<str>> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            out.extend(node.records.iter().cloned());
            pending.extend(node.children.values().rev().copied());
        }
        out
    }

    #[must_use]
    pub fn reachable_record_count(&self, id: NodeId) -> usize {
        let mut count = 0usize;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            count += node.records.len();
            pending.extend(node.children.values().copied());
        }
        count
    }

    #[must_use]
    pub fn record_node(&self, record_id: &str) -> Option<NodeId> {
        self.attachments.get(record_id).copied()
    }

    #[must_use]
    pub fn record_path(&self, record_id: &str) -> Option<Vec<String>> {
        self.record_node(record_id).map(|id| self.path_of(id))
    }

    /// Labels from the root down to `id`. The walk is bounded by the arena
    /// size so a corrupted parent chain cannot loop forever.
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        let mut labels = Vec::new();
        let mut current = Some(id);
        let mut remaining_hops = self.nodes.len();
        while let Some(node_id) = current {
            if node_id == ROOT || remaining_hops == 0 {
                break;
            }
            remaining_hops -= 1;
            let Some(node) = self.node(node_id) else {
                break;
            };
            labels.push(node.label.clone());
            current = node.parent;
        }
        labels.reverse();
        labels
    }

    /// Every node path in depth-first, label-sorted order.
    #[must_use]
    pub fn paths(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        let mut pending = vec![(ROOT, Vec::<String>::new())];
        while let Some((current, path)) = pending.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            for (label, child) in node.children.iter().rev() {
                let mut child_path = path.clone();
                child_path.push(label.clone());
                pending.push((*child, child_path));
            }
            if current != ROOT {
                out.push(path);
            }
        }
        out
    }

    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        let mut remaining_hops = self.nodes.len();
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            if remaining_hops == 0 {
                return false;
            }
            remaining_hops -= 1;
            current = self.parent(node_id);
        }
        false
    }

    fn node(&self, id: NodeId) -> Option<&KeywordNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_slot_mut(&mut self, id: NodeId) -> Option<&mut KeywordNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut KeywordNode> {
        self.node_slot_mut(id)
            .ok_or_else(|| KeypathError::Internal(format!("dangling keyword node id {}", id.0)))
    }

    fn alloc_child(&mut self, parent: NodeId, label: String) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        self.node_mut(parent)?.children.insert(label.clone(), id);
        self.nodes.push(Some(KeywordNode::new(label, Some(parent))));
        Ok(id)
    }

    /// Removes `start` and its ancestors while they hold neither records nor
    /// children. Stops at the root.
    fn prune_upward(&mut self, start: NodeId) {
        let mut current = start;
        while current != ROOT {
            let Some(node) = self.node(current) else {
                return;
            };
            if !node.is_empty() {
                return;
            }
            let parent = node.parent;
            let label = node.label.clone();
            self.nodes[current.0] = None;
            let Some(parent) = parent else {
                return;
            };
            if let Some(parent_node) = self.node_slot_mut(parent) {
                parent_node.children.remove(&label);
            }
            current = parent;
        }
    }
}
