use std::sync::Arc;

use crate::error::{KeypathError, Result, display_path};
use crate::text::{normalize_label, normalize_path};

use super::{NodeId, ROOT, TaxonomyTree};

impl TaxonomyTree {
    /// Relabels the child `old_label` of the node at `path`. The node keeps
    /// its id, children and records.
    pub fn rename<S: AsRef<str>>(
        &mut self,
        path: &[S],
        old_label: &str,
        new_label: &str,
    ) -> Result<NodeId> {
        let parent_path = normalize_path(path)?;
        let old_label = normalize_label(old_label)?;
        let new_label = normalize_label(new_label)?;
        let parent_id = self.resolve_strict(&parent_path)?;
        let parent = self.node_mut(parent_id)?;

        let Some(child_id) = parent.children.get(&old_label).copied() else {
            let mut missing = parent_path.clone();
            missing.push(old_label);
            return Err(KeypathError::path_not_found(&missing));
        };
        if old_label == new_label {
            return Ok(child_id);
        }
        if parent.children.contains_key(&new_label) {
            let mut taken = parent_path;
            taken.push(new_label);
            return Err(KeypathError::NameCollision(format!(
                "{} already exists",
                display_path(&taken)
            )));
        }

        parent.children.remove(&old_label);
        parent.children.insert(new_label.clone(), child_id);
        self.node_mut(child_id)?.label = new_label;
        Ok(child_id)
    }

    /// Folds the node at `src` into the node at `dst`. Colliding child labels
    /// are merged recursively; the source node disappears and its emptied
    /// ancestors are pruned. Every precondition is checked before the arena
    /// is touched, so a failed merge leaves the tree unchanged.
    pub fn merge<S: AsRef<str>, D: AsRef<str>>(&mut self, src: &[S], dst: &[D]) -> Result<NodeId> {
        let src_path = normalize_path(src)?;
        let dst_path = normalize_path(dst)?;
        let src_id = self.resolve_strict(&src_path)?;
        let dst_id = self.resolve_strict(&dst_path)?;

        if src_id == ROOT {
            return Err(KeypathError::Validation(
                "the taxonomy root cannot be merged".to_string(),
            ));
        }
        if src_id == dst_id {
            return Err(KeypathError::Validation(format!(
                "cannot merge {} into itself",
                display_path(&src_path)
            )));
        }
        if self.is_ancestor_or_self(src_id, dst_id) {
            return Err(KeypathError::Validation(format!(
                "cannot merge {} into its descendant {}",
                display_path(&src_path),
                display_path(&dst_path)
            )));
        }
        // Records live on labeled nodes only; children may be lifted to the
        // top level, direct records may not.
        if dst_id == ROOT && !self.records_at(src_id).is_empty() {
            return Err(KeypathError::Validation(format!(
                "cannot merge {} into the taxonomy root: it holds records directly",
                display_path(&src_path)
            )));
        }

        let src_parent = self.parent(src_id);
        if let Some(parent_id) = src_parent {
            let label = self.node_mut(src_id)?.label.clone();
            self.node_mut(parent_id)?.children.remove(&label);
        }

        let mut pending = vec![(src_id, dst_id)];
        while let Some((from, into)) = pending.pop() {
            let Some(source) = self.nodes.get_mut(from.0).and_then(Option::take) else {
                continue;
            };
            for record in source.records {
                self.attachments.insert(record.clone(), into);
                self.node_mut(into)?.records.insert(record);
            }
            for (label, child) in source.children {
                let existing = self.node_mut(into)?.children.get(&label).copied();
                match existing {
                    Some(target) => pending.push((child, target)),
                    None => {
                        self.node_mut(child)?.parent = Some(into);
                        self.node_mut(into)?.children.insert(label, child);
                    }
                }
            }
        }

        if let Some(parent_id) = src_parent {
            self.prune_upward(parent_id);
        }
        Ok(dst_id)
    }

    /// Drops the node at `path` with its whole subtree and prunes emptied
    /// ancestors. Returns the ids of the records that were filed beneath it;
    /// they are no longer attached anywhere.
    pub fn remove_subtree<S: AsRef<str>>(&mut self, path: &[S]) -> Result<Vec<Arc<str>>> {
        let path = normalize_path(path)?;
        let node_id = self.resolve_strict(&path)?;
        if node_id == ROOT {
            return Err(KeypathError::Validation(
                "the taxonomy root cannot be removed".to_string(),
            ));
        }

        let records = self.records_under(node_id);
        let parent = self.parent(node_id);
        let label = self.node_mut(node_id)?.label.clone();
        if let Some(parent_id) = parent {
            self.node_mut(parent_id)?.children.remove(&label);
        }

        let mut pending = vec![node_id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) else {
                continue;
            };
            for record in &node.records {
                self.attachments.remove(record);
            }
            pending.extend(node.children.into_values());
        }

        if let Some(parent_id) = parent {
            self.prune_upward(parent_id);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::KeypathError;
    use crate::taxonomy::TaxonomyTree;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn rename_preserves_identity_and_records() {
        let mut tree = TaxonomyTree::new();
        let node = tree.attach("a", &["lang", "golang"]).expect("attach");
        let renamed = tree.rename(&["lang"], "golang", "Go").expect("rename");
        assert_eq!(renamed, node);
        assert_eq!(tree.record_path("a"), Some(path(&["lang", "go"])));
        assert!(tree.resolve(&path(&["lang", "golang"])).is_none());
    }

    #[test]
    fn rename_onto_existing_sibling_collides() {
        let mut tree = TaxonomyTree::new();
        tree.ensure_path(&["lang", "go"]).expect("ensure");
        tree.ensure_path(&["lang", "python"]).expect("ensure");
        assert!(matches!(
            tree.rename(&["lang"], "go", "python"),
            Err(KeypathError::NameCollision(_))
        ));
        assert!(tree.resolve(&path(&["lang", "go"])).is_some());
    }

    #[test]
    fn rename_missing_child_is_path_not_found() {
        let mut tree = TaxonomyTree::new();
        tree.ensure_path(&["lang"]).expect("ensure");
        assert!(matches!(
            tree.rename(&["lang"], "rust", "rs"),
            Err(KeypathError::PathNotFound(_))
        ));
    }

    #[test]
    fn merge_moves_records_and_removes_source() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["lang", "python"]).expect("attach");
        tree.attach("b", &["lang", "go"]).expect("attach");

        tree.merge(&["lang", "go"], &["lang", "python"])
            .expect("merge");

        assert!(tree.resolve(&path(&["lang", "go"])).is_none());
        assert_eq!(tree.record_path("b"), Some(path(&["lang", "python"])));
        let children = tree.children(&path(&["lang"])).expect("children");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].count, 2);
        tree.validate().expect("valid after merge");
    }

    #[test]
    fn merge_recurses_on_colliding_children() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["old", "web", "flask"]).expect("attach");
        tree.attach("b", &["old", "cli"]).expect("attach");
        tree.attach("c", &["new", "web", "django"]).expect("attach");

        tree.merge(&["old"], &["new"]).expect("merge");

        assert!(tree.resolve(&path(&["old"])).is_none());
        assert_eq!(tree.record_path("a"), Some(path(&["new", "web", "flask"])));
        assert_eq!(tree.record_path("b"), Some(path(&["new", "cli"])));
        let web = tree.children(&path(&["new", "web"])).expect("web");
        assert_eq!(web.len(), 2);
        tree.validate().expect("valid after recursive merge");
    }

    #[test]
    fn merge_prunes_emptied_source_ancestors() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["legacy", "tools", "git"]).expect("attach");
        tree.attach("b", &["vcs"]).expect("attach");

        tree.merge(&["legacy", "tools", "git"], &["vcs"])
            .expect("merge");

        assert!(tree.resolve(&path(&["legacy"])).is_none());
        assert_eq!(tree.record_path("a"), Some(path(&["vcs"])));
    }

    #[test]
    fn merge_into_parent_lifts_children() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["lang", "go", "go"]).expect("attach");
        tree.attach("b", &["lang", "rust"]).expect("attach");

        tree.merge(&["lang", "go"], &["lang"]).expect("merge");

        assert_eq!(tree.record_path("a"), Some(path(&["lang", "go"])));
        assert_eq!(tree.record_path("b"), Some(path(&["lang", "rust"])));
        tree.validate().expect("valid");
    }

    #[test]
    fn merge_rejects_cycles_and_missing_paths_without_mutation() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["lang", "python"]).expect("attach");
        let before = tree.paths();

        assert!(matches!(
            tree.merge(&["lang"], &["lang", "python"]),
            Err(KeypathError::Validation(_))
        ));
        assert!(matches!(
            tree.merge(&["lang", "ruby"], &["lang"]),
            Err(KeypathError::PathNotFound(_))
        ));
        assert!(matches!(
            tree.merge(&["lang"], &["ops"]),
            Err(KeypathError::PathNotFound(_))
        ));
        assert_eq!(tree.paths(), before);
    }

    #[test]
    fn merge_into_root_refuses_direct_records() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["lang"]).expect("attach");
        tree.attach("b", &["lang", "go"]).expect("attach");
        let before = tree.paths();

        assert!(matches!(
            tree.merge(&["lang"], &[] as &[&str]),
            Err(KeypathError::Validation(_))
        ));
        assert_eq!(tree.paths(), before);
        assert_eq!(tree.record_path("a"), Some(path(&["lang"])));
        tree.validate().expect("unchanged tree is valid");
    }

    #[test]
    fn merge_into_root_lifts_children_of_an_empty_node() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["legacy", "go"]).expect("attach");
        tree.attach("b", &["legacy", "rust"]).expect("attach");

        tree.merge(&["legacy"], &[] as &[&str]).expect("merge");

        assert!(tree.resolve(&path(&["legacy"])).is_none());
        assert_eq!(tree.record_path("a"), Some(path(&["go"])));
        assert_eq!(tree.record_path("b"), Some(path(&["rust"])));
        tree.validate().expect("valid");
    }

    #[test]
    fn remove_subtree_detaches_every_record_beneath() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["old", "web"]).expect("attach");
        tree.attach("b", &["old", "web", "flask"]).expect("attach");
        tree.attach("c", &["lang", "go"]).expect("attach");

        let mut removed = tree
            .remove_subtree(&["old", "web"])
            .expect("remove subtree");
        removed.sort();

        assert_eq!(
            removed.iter().map(|id| &**id).collect::<Vec<&str>>(),
            vec!["a", "b"]
        );
        assert!(tree.resolve(&path(&["old"])).is_none());
        assert_eq!(tree.record_path("a"), None);
        assert_eq!(tree.record_count(), 1);
        assert_eq!(tree.paths(), vec![path(&["lang"]), path(&["lang", "go"])]);
        tree.validate().expect("valid after removal");
    }

    #[test]
    fn remove_subtree_rejects_root_and_missing_paths() {
        let mut tree = TaxonomyTree::new();
        tree.attach("a", &["lang"]).expect("attach");
        assert!(matches!(
            tree.remove_subtree(&[] as &[&str]),
            Err(KeypathError::Validation(_))
        ));
        assert!(matches!(
            tree.remove_subtree(&["ops"]),
            Err(KeypathError::PathNotFound(_))
        ));
        assert_eq!(tree.record_path("a"), Some(path(&["lang"])));
    }
}
