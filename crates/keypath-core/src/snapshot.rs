use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{KeypathError, Result, display_path};
use crate::index::InvertedIndex;
use crate::models::Record;
use crate::taxonomy::TaxonomyTree;
use crate::text::validate_record_name;

/// One consistent view of the collection: records, the keyword tree built
/// from their paths, and the text index over them. Readers share it behind
/// an `Arc`; writers clone it, mutate the clone and swap.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    generation: u64,
    records: BTreeMap<String, Record>,
    tree: TaxonomyTree,
    index: InvertedIndex,
    degraded: Option<String>,
}

impl Snapshot {
    #[must_use]
    pub fn empty() -> Self {
        let mut snapshot = Self::default();
        snapshot.index.build(std::iter::empty());
        snapshot
    }

    /// Normalizes records and builds the keyword tree. The text index is left
    /// unbuilt; see [`Self::ensure_indexed`].
    pub fn load(records: Vec<Record>, fallback_root: &str) -> Result<Self> {
        let mut snapshot = Self::default();
        for record in records {
            validate_record_name(&record.name)?;
            let raw_path = display_path(&record.keyword_path);
            let record = record
                .normalized(fallback_root)
                .map_err(|err| match err {
                    KeypathError::Validation(reason) => KeypathError::MalformedTaxonomy {
                        path: raw_path,
                        reason,
                    },
                    other => other,
                })?;
            if snapshot.records.contains_key(&record.name) {
                return Err(KeypathError::Validation(format!(
                    "duplicate record name: {}",
                    record.name
                )));
            }
            snapshot.tree.attach(&record.name, &record.keyword_path)?;
            snapshot.records.insert(record.name.clone(), record);
        }
        snapshot.tree.validate()?;
        Ok(snapshot)
    }

    /// [`Self::load`] followed by a full index build.
    pub fn build(records: Vec<Record>, fallback_root: &str) -> Result<Self> {
        let mut snapshot = Self::load(records, fallback_root)?;
        snapshot.ensure_indexed();
        Ok(snapshot)
    }

    /// Serves raw records through linear scans only. Used when [`Self::build`]
    /// fails so search keeps working.
    #[must_use]
    pub fn degraded(records: Vec<Record>, reason: impl Into<String>) -> Self {
        let mut snapshot = Self {
            degraded: Some(reason.into()),
            ..Self::default()
        };
        for record in records {
            snapshot.records.insert(record.name.clone(), record);
        }
        snapshot
    }

    pub fn ensure_indexed(&mut self) {
        if self.index.is_built() || self.degraded.is_some() {
            return;
        }
        self.index.build(self.records.values());
        debug!(
            records = self.records.len(),
            terms = self.index.term_count(),
            "built text index"
        );
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    #[must_use]
    pub const fn records(&self) -> &BTreeMap<String, Record> {
        &self.records
    }

    #[must_use]
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub const fn tree(&self) -> &TaxonomyTree {
        &self.tree
    }

    #[must_use]
    pub const fn index(&self) -> &InvertedIndex {
        &self.index
    }

    #[must_use]
    pub const fn is_indexed(&self) -> bool {
        self.index.is_built()
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    #[must_use]
    pub fn degraded_reason(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// Inserts or replaces a normalized record, refiling it in the tree and
    /// re-indexing it.
    pub(crate) fn upsert(&mut self, record: Record) -> Result<()> {
        self.tree.attach(&record.name, &record.keyword_path)?;
        if self.index.is_built() {
            self.index.update(&record);
        }
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<Record> {
        let Some(record) = self.records.remove(name) else {
            return Err(KeypathError::RecordNotFound(name.to_string()));
        };
        self.tree.remove(name, &record.keyword_path)?;
        self.index.remove(name);
        Ok(record)
    }

    /// Drops the keyword subtree at `path` together with every record filed
    /// beneath it. Returns the removed records in name order.
    pub(crate) fn remove_subtree(&mut self, path: &[String]) -> Result<Vec<Record>> {
        let ids = self.tree.remove_subtree(path)?;
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(record) = self.records.remove(id.as_ref()) else {
                return Err(KeypathError::Internal(format!(
                    "keyword node held unknown record {id}"
                )));
            };
            self.index.remove(&record.name);
            removed.push(record);
        }
        removed.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        Ok(removed)
    }

    pub(crate) fn tree_mut(&mut self) -> &mut TaxonomyTree {
        &mut self.tree
    }

    /// Splits the snapshot into mutable records and tree for operations that
    /// update both in one pass.
    pub(crate) fn parts_mut(&mut self) -> (&mut BTreeMap<String, Record>, &mut TaxonomyTree) {
        (&mut self.records, &mut self.tree)
    }

    /// Copies tree paths back onto records after a restructure and
    /// re-indexes the records whose path changed. Returns how many moved.
    pub(crate) fn sync_paths_from_tree(&mut self) -> Result<usize> {
        let mut moved = 0usize;
        for record in self.records.values_mut() {
            let Some(path) = self.tree.record_path(&record.name) else {
                return Err(KeypathError::Internal(format!(
                    "record {} lost its keyword node",
                    record.name
                )));
            };
            if path == record.keyword_path {
                continue;
            }
            record.keyword_path = path;
            if self.index.is_built() {
                self.index.update(record);
            }
            moved += 1;
        }
        Ok(moved)
    }

    /// Re-indexes records touched outside [`Self::upsert`].
    pub(crate) fn reindex<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        if !self.index.is_built() {
            return;
        }
        for name in names {
            if let Some(record) = self.records.get(name) {
                self.index.update(record);
            }
        }
    }
}
