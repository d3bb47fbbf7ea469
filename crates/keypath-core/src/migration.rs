use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::MigrationConfig;
use crate::error::{KeypathError, Result};
use crate::models::Record;

mod batch;
mod cooccurrence;
mod hierarchy;

pub use batch::{MigrateOptions, MigrationEntry, MigrationReport, SkipReason, SkippedRecord};
pub use cooccurrence::CooccurrenceGraph;
pub use hierarchy::{ProposedTaxonomy, TagGroup};

/// What a migration does when a suggested path already holds records a
/// person filed there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// File the record next to the curated ones and report the collision.
    #[default]
    Merge,
    /// Leave the record where it is and report it as skipped.
    Skip,
    /// Abort the whole batch with `NameCollision`.
    Reject,
}

impl CollisionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Skip => "skip",
            Self::Reject => "reject",
        }
    }
}

impl Display for CollisionPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollisionPolicy {
    type Err = KeypathError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" | "force" | "force-merge" => Ok(Self::Merge),
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            other => Err(KeypathError::Validation(format!(
                "invalid collision policy: {other} (expected merge|skip|reject)"
            ))),
        }
    }
}

/// Where a suggested path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// Caller-supplied tag default.
    Default,
    /// Proposed taxonomy mapping of one of the record's tags.
    Taxonomy,
    /// Keyword found in the record content.
    ContentHint,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub path: Vec<String>,
    pub source: SuggestionSource,
}

/// Turns flat tag sets into a keyword hierarchy and files records into it.
/// Holds configuration only; every operation works on caller-owned data.
#[derive(Debug, Clone, Default)]
pub struct MigrationAdvisor {
    config: MigrationConfig,
}

impl MigrationAdvisor {
    #[must_use]
    pub const fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn suggest_hierarchy<I, T, S>(&self, tag_sets: I) -> ProposedTaxonomy
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let graph = CooccurrenceGraph::from_tag_sets(tag_sets);
        hierarchy::propose(
            &graph,
            self.config.cooccurrence_threshold,
            self.config.root.as_deref(),
        )
    }

    #[must_use]
    pub fn suggest_path(&self, record: &Record, taxonomy: &ProposedTaxonomy) -> Vec<String> {
        self.suggest_path_with(record, taxonomy, &MigrateOptions::default())
            .path
    }

    /// Caller defaults first, then the deepest taxonomy mapping among the
    /// record's tags (ties go to the more frequent tag), then the fallback
    /// root with the first tag, then content hints, then the bare fallback
    /// root.
    #[must_use]
    pub fn suggest_path_with(
        &self,
        record: &Record,
        taxonomy: &ProposedTaxonomy,
        options: &MigrateOptions,
    ) -> Suggestion {
        if let Some(path) = record
            .tags
            .iter()
            .find_map(|tag| options.defaults.get(tag))
        {
            return Suggestion {
                path: path.clone(),
                source: SuggestionSource::Default,
            };
        }

        let deepest = record
            .tags
            .iter()
            .filter_map(|tag| taxonomy.path_for(tag).map(|path| (tag, path)))
            .max_by(|(lhs_tag, lhs), (rhs_tag, rhs)| {
                lhs.len()
                    .cmp(&rhs.len())
                    .then_with(|| taxonomy.frequency(lhs_tag).cmp(&taxonomy.frequency(rhs_tag)))
                    .then_with(|| rhs.cmp(lhs))
            });
        if let Some((_, path)) = deepest {
            return Suggestion {
                path: path.to_vec(),
                source: SuggestionSource::Taxonomy,
            };
        }

        let fallback_root = self.config.fallback_root.clone();
        if let Some(first_tag) = record.tags.first() {
            return Suggestion {
                path: vec![fallback_root, first_tag.clone()],
                source: SuggestionSource::Fallback,
            };
        }

        let content = record.content.to_lowercase();
        let hints = options
            .content_hints
            .as_deref()
            .unwrap_or(&self.config.content_hints);
        if let Some(hint) = hints
            .iter()
            .find(|hint| content.contains(&hint.keyword.to_lowercase()))
        {
            return Suggestion {
                path: hint.path.clone(),
                source: SuggestionSource::ContentHint,
            };
        }

        Suggestion {
            path: vec![fallback_root],
            source: SuggestionSource::Fallback,
        }
    }
}
