use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{KeypathError, Result};
use crate::text::{normalize_path, normalize_tags, validate_record_name};

/// How a record obtained its keyword path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOrigin {
    /// Filed by a person; migration treats these paths as authoritative.
    #[default]
    Curated,
    /// Legacy record that had no path and was parked under the fallback root.
    Fallback,
    /// Written by a committed migration.
    Migrated,
}

impl PathOrigin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Curated => "curated",
            Self::Fallback => "fallback",
            Self::Migrated => "migrated",
        }
    }
}

impl FromStr for PathOrigin {
    type Err = KeypathError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "curated" => Ok(Self::Curated),
            "fallback" => Ok(Self::Fallback),
            "migrated" => Ok(Self::Migrated),
            other => Err(KeypathError::Validation(format!(
                "invalid path origin: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: String,
    /// Legacy flat tags. Older documents call them `categories`.
    #[serde(default, alias = "categories")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub keyword_path: Vec<String>,
    #[serde(default)]
    pub path_origin: PathOrigin,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// RFC 3339, or a naive ISO-8601 timestamp read as UTC.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

impl Record {
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            content: content.into(),
            description: String::new(),
            tags: Vec::new(),
            keyword_path: Vec::new(),
            path_origin: PathOrigin::Curated,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.tags = tags.iter().map(|tag| tag.as_ref().to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_path<S: AsRef<str>>(mut self, path: &[S]) -> Self {
        self.keyword_path = path.iter().map(|seg| seg.as_ref().to_string()).collect();
        self
    }

    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Validates the name and canonicalizes path and tags. A missing path is
    /// replaced by `[fallback_root]` and marked [`PathOrigin::Fallback`].
    pub fn normalized(mut self, fallback_root: &str) -> Result<Self> {
        validate_record_name(&self.name)?;
        self.tags = normalize_tags(&self.tags);
        if self.keyword_path.is_empty() {
            self.keyword_path = normalize_path(&[fallback_root])?;
            self.path_origin = PathOrigin::Fallback;
        } else {
            self.keyword_path = normalize_path(&self.keyword_path)?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn has_path_prefix(&self, prefix: &[String]) -> bool {
        self.keyword_path.len() >= prefix.len()
            && self
                .keyword_path
                .iter()
                .zip(prefix.iter())
                .all(|(segment, wanted)| segment == wanted)
    }
}

/// Indexed record fields, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Description,
    Path,
    Tags,
    Content,
}

impl Field {
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::Description,
        Self::Path,
        Self::Tags,
        Self::Content,
    ];

    #[must_use]
    pub const fn weight(self) -> f32 {
        match self {
            Self::Name => 3.0,
            Self::Description => 2.0,
            Self::Path => 1.5,
            Self::Tags | Self::Content => 1.0,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Path => "path",
            Self::Tags => "tags",
            Self::Content => "content",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Name => 1,
            Self::Description => 1 << 1,
            Self::Path => 1 << 2,
            Self::Tags => 1 << 3,
            Self::Content => 1 << 4,
        }
    }
}

/// Compact set of [`Field`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldSet(u8);

impl FieldSet {
    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn extend(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[must_use]
    pub const fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn to_vec(self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.contains(*field))
            .collect()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = Self::default();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Auto,
    Exact,
    FullText,
    Fuzzy,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Exact => "exact",
            Self::FullText => "fulltext",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = KeypathError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "exact" => Ok(Self::Exact),
            "fulltext" | "full_text" | "full-text" => Ok(Self::FullText),
            "fuzzy" => Ok(Self::Fuzzy),
            other => Err(KeypathError::Validation(format!(
                "invalid search strategy: {other} (expected auto|exact|fulltext|fuzzy)"
            ))),
        }
    }
}

/// Which signal admitted a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    FullText,
    Fuzzy,
    /// Linear substring scan used while the index is unavailable.
    Scan,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub path_filter: Option<Vec<String>>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl SearchOptions {
    #[must_use]
    pub fn with_path_filter<S: AsRef<str>>(mut self, path: &[S]) -> Self {
        self.path_filter = Some(path.iter().map(|seg| seg.as_ref().to_string()).collect());
        self
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub score: f32,
    pub kind: MatchKind,
    pub fields: Vec<Field>,
    pub keyword_path: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SearchPage {
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.hits.iter().map(|hit| hit.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordChild {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordListing {
    pub path: Vec<String>,
    pub children: Vec<KeywordChild>,
}

impl KeywordListing {
    #[must_use]
    pub fn count_of(&self, label: &str) -> Option<usize> {
        self.children
            .iter()
            .find(|child| child.label == label)
            .map(|child| child.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_record_parks_missing_path_under_fallback_root() {
        let record = Record::new("git_tips", "rebase")
            .with_tags(&["Git", "git", "VCS"])
            .normalized("Uncategorized")
            .expect("normalize");
        assert_eq!(record.keyword_path, vec!["uncategorized".to_string()]);
        assert_eq!(record.path_origin, PathOrigin::Fallback);
        assert_eq!(record.tags, vec!["git".to_string(), "vcs".to_string()]);
    }

    #[test]
    fn normalized_record_rejects_bad_name_and_segment() {
        assert!(Record::new("bad name", "").normalized("x").is_err());
        assert!(
            Record::new("ok", "")
                .with_path(&["lang", " "])
                .normalized("x")
                .is_err()
        );
    }

    #[test]
    fn path_prefix_matches_ancestor_or_equal() {
        let record = Record::new("a", "").with_path(&["lang", "python"]);
        assert!(record.has_path_prefix(&[]));
        assert!(record.has_path_prefix(&["lang".to_string()]));
        assert!(record.has_path_prefix(&["lang".to_string(), "python".to_string()]));
        assert!(!record.has_path_prefix(&["lang".to_string(), "go".to_string()]));
    }

    #[test]
    fn field_set_keeps_field_order() {
        let set = [Field::Content, Field::Name].into_iter().collect::<FieldSet>();
        assert_eq!(set.to_vec(), vec![Field::Name, Field::Content]);
        assert!(!set.contains(Field::Tags));
    }

    #[test]
    fn legacy_document_fields_deserialize() {
        let record: Record = serde_json::from_str(
            r#"{
                "name": "git_tips",
                "content": "git stash",
                "categories": ["git"],
                "created_at": "2023-04-01T10:20:30.123456",
                "updated_at": "2023-04-02T10:20:30+02:00"
            }"#,
        )
        .expect("legacy record");
        assert_eq!(record.tags, vec!["git".to_string()]);
        assert!(record.keyword_path.is_empty());
        assert_eq!(record.created_at.to_rfc3339(), "2023-04-01T10:20:30.123456+00:00");
        assert_eq!(record.updated_at.to_rfc3339(), "2023-04-02T08:20:30+00:00");
    }

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!("full-text".parse::<Strategy>().expect("parse"), Strategy::FullText);
        assert!("fast".parse::<Strategy>().is_err());
    }
}
