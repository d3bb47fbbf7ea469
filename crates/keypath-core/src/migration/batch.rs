use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ContentHint;
use crate::error::{KeypathError, Result, display_path};
use crate::models::{PathOrigin, Record};
use crate::taxonomy::TaxonomyTree;
use crate::text::{normalize_label, normalize_path};

use super::{CollisionPolicy, MigrationAdvisor, ProposedTaxonomy, SuggestionSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateOptions {
    /// Report what would change without touching records or the tree.
    pub dry_run: bool,
    /// Consider only records still parked under the fallback root.
    pub only_unmigrated: bool,
    /// Overrides the configured policy for this batch.
    pub collision: Option<CollisionPolicy>,
    /// Explicit tag → path assignments that win over inferred ones.
    pub defaults: BTreeMap<String, Vec<String>>,
    /// Replaces the configured content hints for this batch.
    pub content_hints: Option<Vec<ContentHint>>,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            only_unmigrated: true,
            collision: None,
            defaults: BTreeMap::new(),
            content_hints: None,
        }
    }
}

impl MigrateOptions {
    /// Options that write the migration through.
    #[must_use]
    pub fn commit() -> Self {
        Self {
            dry_run: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub const fn with_only_unmigrated(mut self, only_unmigrated: bool) -> Self {
        self.only_unmigrated = only_unmigrated;
        self
    }

    #[must_use]
    pub const fn with_collision(mut self, policy: CollisionPolicy) -> Self {
        self.collision = Some(policy);
        self
    }

    #[must_use]
    pub fn with_default<S: AsRef<str>>(mut self, tag: &str, path: &[S]) -> Self {
        self.defaults.insert(
            tag.to_string(),
            path.iter().map(|seg| seg.as_ref().to_string()).collect(),
        );
        self
    }

    #[must_use]
    pub fn with_content_hint<S: AsRef<str>>(mut self, keyword: &str, path: &[S]) -> Self {
        self.content_hints
            .get_or_insert_with(Vec::new)
            .push(ContentHint::new(keyword, path));
        self
    }

    fn normalized(&self) -> Result<Self> {
        Ok(Self {
            dry_run: self.dry_run,
            only_unmigrated: self.only_unmigrated,
            collision: self.collision,
            defaults: normalize_assignments(&self.defaults)?,
            content_hints: self
                .content_hints
                .as_deref()
                .map(|hints| hints.iter().map(ContentHint::normalized).collect())
                .transpose()?,
        })
    }
}

fn normalize_assignments(
    raw: &BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<String, Vec<String>>> {
    raw.iter()
        .map(|(tag, path)| Ok((normalize_label(tag)?, checked_path(path)?)))
        .collect()
}

fn checked_path(path: &[String]) -> Result<Vec<String>> {
    let path = normalize_path(path)?;
    if path.is_empty() {
        return Err(KeypathError::Validation(
            "migration target path is empty".to_string(),
        ));
    }
    Ok(path)
}

/// One record that moves (or would move).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationEntry {
    pub name: String,
    pub old_path: Vec<String>,
    pub tags: Vec<String>,
    pub new_path: Vec<String>,
    pub source: SuggestionSource,
    /// The target already held curated records; set only under
    /// [`CollisionPolicy::Merge`].
    pub collision: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Path was set by a person or an earlier migration.
    AlreadyFiled,
    /// Suggested path equals the current one.
    Unchanged,
    /// Suggested path collides with curated records under the skip policy.
    Collision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub entries: Vec<MigrationEntry>,
    pub skipped: Vec<SkippedRecord>,
}

impl MigrationReport {
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&MigrationEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    #[must_use]
    pub fn collisions(&self) -> usize {
        self.entries.iter().filter(|entry| entry.collision).count()
    }

    /// `old path → new path` for every moved record.
    #[must_use]
    pub fn path_mapping(&self) -> BTreeMap<String, (Vec<String>, Vec<String>)> {
        self.entries
            .iter()
            .map(|entry| {
                (
                    entry.name.clone(),
                    (entry.old_path.clone(), entry.new_path.clone()),
                )
            })
            .collect()
    }
}

impl MigrationAdvisor {
    /// Computes the migration without touching anything. Collisions under
    /// [`CollisionPolicy::Reject`] fail here, before any mutation.
    pub fn plan<'a>(
        &self,
        records: impl IntoIterator<Item = &'a Record>,
        tree: &TaxonomyTree,
        taxonomy: &ProposedTaxonomy,
        options: &MigrateOptions,
    ) -> Result<MigrationReport> {
        let options = options.normalized()?;
        let policy = options.collision.unwrap_or(self.config.collision);
        let records = records.into_iter().collect::<Vec<_>>();
        let by_name = records
            .iter()
            .copied()
            .map(|record| (record.name.as_str(), record))
            .collect::<HashMap<_, _>>();

        let mut report = MigrationReport {
            dry_run: options.dry_run,
            ..MigrationReport::default()
        };
        for record in records {
            if options.only_unmigrated && record.path_origin != PathOrigin::Fallback {
                report.skipped.push(SkippedRecord {
                    name: record.name.clone(),
                    reason: SkipReason::AlreadyFiled,
                });
                continue;
            }

            let suggestion = self.suggest_path_with(record, taxonomy, &options);
            if suggestion.path == record.keyword_path {
                report.skipped.push(SkippedRecord {
                    name: record.name.clone(),
                    reason: SkipReason::Unchanged,
                });
                continue;
            }

            let collision = collides_with_curated(tree, &by_name, &record.name, &suggestion.path);
            if collision {
                match policy {
                    CollisionPolicy::Reject => {
                        return Err(KeypathError::NameCollision(format!(
                            "migrating {} to {} collides with curated records",
                            record.name,
                            display_path(&suggestion.path)
                        )));
                    }
                    CollisionPolicy::Skip => {
                        debug!(
                            record = %record.name,
                            path = %display_path(&suggestion.path),
                            "migration target holds curated records; skipping"
                        );
                        report.skipped.push(SkippedRecord {
                            name: record.name.clone(),
                            reason: SkipReason::Collision,
                        });
                        continue;
                    }
                    CollisionPolicy::Merge => {
                        warn!(
                            record = %record.name,
                            path = %display_path(&suggestion.path),
                            "migration merges into a curated keyword path"
                        );
                    }
                }
            }

            report.entries.push(MigrationEntry {
                name: record.name.clone(),
                old_path: record.keyword_path.clone(),
                tags: record.tags.clone(),
                new_path: suggestion.path,
                source: suggestion.source,
                collision,
            });
        }
        Ok(report)
    }

    /// Writes a planned migration onto `records` and `tree`. Tags are left
    /// alone so legacy lookups keep working. Returns the number of records
    /// moved.
    pub fn apply<'a>(
        &self,
        report: &MigrationReport,
        records: impl IntoIterator<Item = &'a mut Record>,
        tree: &mut TaxonomyTree,
    ) -> Result<usize> {
        let entries = report
            .entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry))
            .collect::<HashMap<_, _>>();
        let now = Utc::now();
        let mut moved = 0usize;
        for record in records {
            let Some(entry) = entries.get(record.name.as_str()) else {
                continue;
            };
            tree.attach(&record.name, &entry.new_path)?;
            record.keyword_path.clone_from(&entry.new_path);
            record.path_origin = PathOrigin::Migrated;
            record.updated_at = now;
            moved += 1;
        }
        Ok(moved)
    }

    /// Plans and, unless `options.dry_run`, applies in one call.
    pub fn batch_migrate(
        &self,
        records: &mut [Record],
        tree: &mut TaxonomyTree,
        taxonomy: &ProposedTaxonomy,
        options: &MigrateOptions,
    ) -> Result<MigrationReport> {
        let report = self.plan(records.iter(), tree, taxonomy, options)?;
        if !report.dry_run {
            self.apply(&report, records.iter_mut(), tree)?;
        }
        Ok(report)
    }
}

fn collides_with_curated(
    tree: &TaxonomyTree,
    by_name: &HashMap<&str, &Record>,
    name: &str,
    path: &[String],
) -> bool {
    let Some(node) = tree.resolve(path) else {
        return false;
    };
    tree.records_under(node).iter().any(|id| {
        id.as_ref() != name
            && by_name
                .get(id.as_ref())
                .is_some_and(|record| record.path_origin == PathOrigin::Curated)
    })
}
