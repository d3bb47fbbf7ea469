use serde::{Deserialize, Serialize};

use crate::error::{KeypathError, Result};
use crate::migration::CollisionPolicy;
use crate::text::{normalize_label, normalize_path};

use super::env::{Lookup, read_env_usize, read_non_empty_env};

const ENV_COOCCURRENCE_THRESHOLD: &str = "KEYPATH_COOCCURRENCE_THRESHOLD";
const ENV_MIGRATION_ROOT: &str = "KEYPATH_MIGRATION_ROOT";
const ENV_FALLBACK_ROOT: &str = "KEYPATH_FALLBACK_ROOT";
const ENV_COLLISION_POLICY: &str = "KEYPATH_COLLISION_POLICY";

const DEFAULT_COOCCURRENCE_THRESHOLD: usize = 1;
pub const DEFAULT_FALLBACK_ROOT: &str = "uncategorized";

/// Keyword looked up in the content of untagged records. Checked in order,
/// as a case-folded substring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHint {
    pub keyword: String,
    pub path: Vec<String>,
}

impl ContentHint {
    #[must_use]
    pub fn new<S: AsRef<str>>(keyword: &str, path: &[S]) -> Self {
        Self {
            keyword: keyword.to_string(),
            path: path.iter().map(|seg| seg.as_ref().to_string()).collect(),
        }
    }

    /// Lowercased keyword and normalized, non-empty path.
    pub(crate) fn normalized(&self) -> Result<Self> {
        let keyword = self.keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Err(KeypathError::Validation(
                "content hint keyword is empty".to_string(),
            ));
        }
        let path = normalize_path(&self.path)?;
        if path.is_empty() {
            return Err(KeypathError::Validation(format!(
                "content hint {keyword} has an empty path"
            )));
        }
        Ok(Self { keyword, path })
    }
}

const PROGRAMMING_LANGUAGES: [&str; 9] = [
    "python",
    "javascript",
    "java",
    "c++",
    "c#",
    "ruby",
    "php",
    "go",
    "rust",
];

const DOMAINS: [(&str, [&str; 2]); 6] = [
    ("git", ["version control", "git"]),
    ("docker", ["containerization", "docker"]),
    ("linux", ["operating systems", "linux"]),
    ("windows", ["operating systems", "windows"]),
    ("bash", ["shell", "bash"]),
    ("sql", ["databases", "sql"]),
];

/// Languages first, then tool and platform domains, all under `computers`.
#[must_use]
pub fn default_content_hints() -> Vec<ContentHint> {
    let languages = PROGRAMMING_LANGUAGES
        .iter()
        .map(|&lang| ContentHint::new(lang, &["computers", "programming", lang]));
    let domains = DOMAINS
        .iter()
        .map(|&(keyword, [area, leaf])| ContentHint::new(keyword, &["computers", area, leaf]));
    languages.chain(domains).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Two tags are grouped as siblings once more than this many records
    /// carry both.
    pub cooccurrence_threshold: usize,
    /// Parent for every inferred group instead of the group's own head tag.
    pub root: Option<String>,
    /// Where records without a usable tag or path end up.
    pub fallback_root: String,
    pub collision: CollisionPolicy,
    /// Paths for untagged records whose content mentions a known keyword.
    pub content_hints: Vec<ContentHint>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            cooccurrence_threshold: DEFAULT_COOCCURRENCE_THRESHOLD,
            root: None,
            fallback_root: DEFAULT_FALLBACK_ROOT.to_string(),
            collision: CollisionPolicy::default(),
            content_hints: default_content_hints(),
        }
    }
}

impl MigrationConfig {
    pub(super) fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        let collision = match read_non_empty_env(lookup, ENV_COLLISION_POLICY) {
            Some(raw) => raw.parse::<CollisionPolicy>().map_err(|_| {
                KeypathError::Validation(format!(
                    "invalid {ENV_COLLISION_POLICY}: {raw} (expected merge|skip|reject)"
                ))
            })?,
            None => defaults.collision,
        };
        let mut config = Self {
            cooccurrence_threshold: read_env_usize(
                lookup,
                ENV_COOCCURRENCE_THRESHOLD,
                defaults.cooccurrence_threshold,
                0,
            ),
            root: read_non_empty_env(lookup, ENV_MIGRATION_ROOT),
            fallback_root: read_non_empty_env(lookup, ENV_FALLBACK_ROOT)
                .unwrap_or(defaults.fallback_root),
            collision,
            content_hints: defaults.content_hints,
        };
        config.normalize()?;
        Ok(config)
    }

    /// Canonicalizes the configured labels so they address the same nodes
    /// as user input does.
    pub(super) fn normalize(&mut self) -> Result<()> {
        self.fallback_root = normalize_label(&self.fallback_root)?;
        self.root = self.root.as_deref().map(normalize_label).transpose()?;
        self.content_hints = self
            .content_hints
            .iter()
            .map(ContentHint::normalized)
            .collect::<Result<_>>()?;
        Ok(())
    }
}
