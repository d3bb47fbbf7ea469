use serde::{Deserialize, Serialize};

use crate::error::Result;

mod env;
mod migration;
mod search;

pub use migration::{ContentHint, DEFAULT_FALLBACK_ROOT, MigrationConfig, default_content_hints};
pub use search::SearchConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeypathConfig {
    pub search: SearchConfig,
    pub migration: MigrationConfig,
}

impl KeypathConfig {
    /// Reads `KEYPATH_*` variables; unset or unparsable numeric values keep
    /// their defaults, out-of-range values are rejected.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env::process_env)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config = toml::from_str::<Self>(raw)?;
        config.search.validate()?;
        config.migration.normalize()?;
        Ok(config)
    }

    fn from_lookup(lookup: env::Lookup<'_>) -> Result<Self> {
        Ok(Self {
            search: SearchConfig::from_lookup(lookup)?,
            migration: MigrationConfig::from_lookup(lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::KeypathError;
    use crate::migration::CollisionPolicy;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = KeypathConfig::default();
        assert_eq!(config.search.min_results, 3);
        assert!((config.search.fuzzy_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.migration.fallback_root, "uncategorized");
        assert_eq!(config.migration.collision, CollisionPolicy::Merge);
        assert_eq!(config.migration.cooccurrence_threshold, 1);
        let git = config
            .migration
            .content_hints
            .iter()
            .find(|hint| hint.keyword == "git")
            .expect("git hint");
        assert_eq!(git.path, vec!["computers", "version control", "git"]);
    }

    #[test]
    fn zero_cooccurrence_threshold_is_accepted() {
        let lookup = lookup_from(&[("KEYPATH_COOCCURRENCE_THRESHOLD", "0")]);
        let config = KeypathConfig::from_lookup(&lookup).expect("config");
        assert_eq!(config.migration.cooccurrence_threshold, 0);
    }

    #[test]
    fn toml_content_hints_are_normalized() {
        let config = KeypathConfig::from_toml_str(
            r#"
[[migration.content_hints]]
keyword = "Terraform"
path = ["Ops", "IaC"]
"#,
        )
        .expect("toml");
        assert_eq!(
            config.migration.content_hints,
            vec![ContentHint::new("terraform", &["ops", "iac"])]
        );
        let err = KeypathConfig::from_toml_str(
            r#"
[[migration.content_hints]]
keyword = "x"
path = []
"#,
        )
        .expect_err("empty path");
        assert!(matches!(err, KeypathError::Validation(_)));
    }

    #[test]
    fn lookup_overrides_and_normalizes() {
        let lookup = lookup_from(&[
            ("KEYPATH_MIN_RESULTS", "5"),
            ("KEYPATH_FUZZY_THRESHOLD", "0.8"),
            ("KEYPATH_FALLBACK_ROOT", " Misc "),
            ("KEYPATH_COLLISION_POLICY", "Skip"),
        ]);
        let config = KeypathConfig::from_lookup(&lookup).expect("config");
        assert_eq!(config.search.min_results, 5);
        assert!((config.search.fuzzy_threshold - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.migration.fallback_root, "misc");
        assert_eq!(config.migration.collision, CollisionPolicy::Skip);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let lookup = lookup_from(&[("KEYPATH_FUZZY_THRESHOLD", "1.5")]);
        assert!(matches!(
            KeypathConfig::from_lookup(&lookup),
            Err(KeypathError::Validation(_))
        ));
        let lookup = lookup_from(&[("KEYPATH_FUZZY_THRESHOLD", "high")]);
        assert!(KeypathConfig::from_lookup(&lookup).is_err());
    }

    #[test]
    fn unknown_collision_policy_is_rejected() {
        let lookup = lookup_from(&[("KEYPATH_COLLISION_POLICY", "overwrite")]);
        assert!(matches!(
            KeypathConfig::from_lookup(&lookup),
            Err(KeypathError::Validation(_))
        ));
    }

    #[test]
    fn toml_fills_missing_sections_with_defaults() {
        let config = KeypathConfig::from_toml_str(
            r#"
[search]
fuzzy_threshold = 0.6

[migration]
root = "Topics"
collision = "reject"
"#,
        )
        .expect("toml");
        assert!((config.search.fuzzy_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.search.min_results, 3);
        assert_eq!(config.migration.root.as_deref(), Some("topics"));
        assert_eq!(config.migration.collision, CollisionPolicy::Reject);
    }

    #[test]
    fn malformed_toml_surfaces_toml_error() {
        assert!(matches!(
            KeypathConfig::from_toml_str("[search\n"),
            Err(KeypathError::Toml(_))
        ));
    }
}
