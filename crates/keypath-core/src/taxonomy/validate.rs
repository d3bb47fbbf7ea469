use crate::error::{KeypathError, Result, display_path};

use super::{NodeId, ROOT, TaxonomyTree};

impl TaxonomyTree {
    /// Structural self-check: every live node is reachable from the root
    /// through consistent parent/child links, and every record attachment
    /// points at a node that lists the record. The first violation is
    /// reported with the offending path.
    pub fn validate(&self) -> Result<()> {
        for (index, slot) in self.nodes.iter().enumerate() {
            let Some(node) = slot else {
                continue;
            };
            let id = NodeId(index);

            for (label, child_id) in &node.children {
                let Some(child) = self.node(*child_id) else {
                    return Err(malformed(
                        self,
                        id,
                        format!("child '{label}' points at a removed node"),
                    ));
                };
                if child.parent != Some(id) || &child.label != label {
                    return Err(malformed(
                        self,
                        *child_id,
                        "child link disagrees with parent link".to_string(),
                    ));
                }
            }

            if id == ROOT {
                if node.parent.is_some() {
                    return Err(malformed(self, id, "root has a parent".to_string()));
                }
                continue;
            }

            let Some(parent_id) = node.parent else {
                return Err(malformed(self, id, "orphaned node".to_string()));
            };
            let listed = self
                .node(parent_id)
                .and_then(|parent| parent.children.get(&node.label))
                .is_some_and(|listed| *listed == id);
            if !listed {
                return Err(malformed(
                    self,
                    id,
                    "parent does not list this node".to_string(),
                ));
            }
            if !self.reaches_root(id) {
                return Err(malformed(self, id, "cycle in parent chain".to_string()));
            }
        }

        for (record, node_id) in &self.attachments {
            let attached = self
                .node(*node_id)
                .is_some_and(|node| node.records.contains(record));
            if !attached {
                return Err(malformed(
                    self,
                    *node_id,
                    format!("record '{record}' attachment is dangling"),
                ));
            }
        }
        Ok(())
    }

    fn reaches_root(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        let mut remaining_hops = self.nodes.len();
        while let Some(node_id) = current {
            if node_id == ROOT {
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
}

fn malformed(tree: &TaxonomyTree, id: NodeId, reason: String) -> KeypathError {
    KeypathError::MalformedTaxonomy {
        path: display_path(&tree.path_of(id)),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use crate::error::KeypathError;
    use crate::taxonomy::{NodeId, TaxonomyTree};

    #[test]
    fn fresh_tree_is_valid() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["lang", "python"]).expect("attach");
        tree.validate().expect("valid");
    }

    #[test]
    fn parent_cycle_is_reported_with_path() {
        let mut tree = TaxonomyTree::new();
        let lang = tree.ensure_path(&["lang"]).expect("ensure");
        let python = tree.ensure_path(&["lang", "python"]).expect("ensure");
        tree.nodes[lang.0].as_mut().expect("lang").parent = Some(python);

        let err = tree.validate().expect_err("cycle must be detected");
        assert!(matches!(err, KeypathError::MalformedTaxonomy { .. }));
    }

    #[test]
    fn orphaned_node_is_reported() {
        let mut tree = TaxonomyTree::new();
        let go = tree.ensure_path(&["lang", "go"]).expect("ensure");
        tree.nodes[go.0].as_mut().expect("go").parent = Some(NodeId(999));

        match tree.validate() {
            Err(KeypathError::MalformedTaxonomy { path, .. }) => assert!(path.ends_with("go")),
            other => panic!("unexpected validation result: {other:?}"),
        }
    }
}
