use tracing::info;

use crate::error::{KeypathError, Result, display_path};
use crate::models::KeywordListing;
use crate::text::normalize_path;

use super::Catalog;

impl Catalog {
    /// Children of the keyword node at `path` with reachable record counts.
    pub fn keywords<S: AsRef<str>>(&self, path: &[S]) -> Result<KeywordListing> {
        let path = normalize_path(path)?;
        let snapshot = self.snapshot()?;
        let children = snapshot.tree().children(&path)?;
        Ok(KeywordListing { path, children })
    }

    /// Relabels `path/old_label` and rewrites the paths of every record
    /// beneath it. Returns how many records moved.
    pub fn rename_keyword<S: AsRef<str>>(
        &self,
        path: &[S],
        old_label: &str,
        new_label: &str,
    ) -> Result<usize> {
        let path = normalize_path(path)?;
        let moved = self.mutate(|working| {
            working.tree_mut().rename(&path, old_label, new_label)?;
            working.sync_paths_from_tree()
        })?;
        info!(
            path = %display_path(&path),
            old_label,
            new_label,
            moved,
            "renamed keyword"
        );
        Ok(moved)
    }

    /// Removes the keyword node at `path` and everything below it. A node
    /// that still has records beneath it is refused unless `force` is set,
    /// in which case those records are deleted in the same commit. Returns
    /// the names of the deleted records.
    pub fn remove_keyword<S: AsRef<str>>(&self, path: &[S], force: bool) -> Result<Vec<String>> {
        let path = normalize_path(path)?;
        let removed = self.mutate(|working| {
            let node = working.tree().resolve_strict(&path)?;
            let reachable = working.tree().reachable_record_count(node);
            if reachable > 0 && !force {
                return Err(KeypathError::Validation(format!(
                    "{} still holds {reachable} record(s); pass force to delete them",
                    display_path(&path)
                )));
            }
            working.remove_subtree(&path)
        })?;
        let names = removed
            .into_iter()
            .map(|record| record.name)
            .collect::<Vec<_>>();
        info!(
            path = %display_path(&path),
            force,
            removed = names.len(),
            "removed keyword"
        );
        Ok(names)
    }

    /// Folds `src` into `dst`. Returns how many records moved.
    pub fn merge_keywords<S: AsRef<str>, D: AsRef<str>>(&self, src: &[S], dst: &[D]) -> Result<usize> {
        let src = normalize_path(src)?;
        let dst = normalize_path(dst)?;
        let moved = self.mutate(|working| {
            working.tree_mut().merge(&src, &dst)?;
            working.sync_paths_from_tree()
        })?;
        info!(
            src = %display_path(&src),
            dst = %display_path(&dst),
            moved,
            "merged keywords"
        );
        Ok(moved)
    }
}
