use serde::{Deserialize, Serialize};

use crate::error::{KeypathError, Result};

use super::env::{Lookup, read_env_f32, read_env_usize};

const ENV_MIN_RESULTS: &str = "KEYPATH_MIN_RESULTS";
const ENV_FUZZY_THRESHOLD: &str = "KEYPATH_FUZZY_THRESHOLD";
const ENV_MAX_RESULTS: &str = "KEYPATH_MAX_RESULTS";

const DEFAULT_MIN_RESULTS: usize = 3;
const DEFAULT_FUZZY_THRESHOLD: f32 = 0.7;
const DEFAULT_MAX_RESULTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Below this many exact + full-text hits, the fuzzy stage runs.
    pub min_results: usize,
    /// Minimum normalized Levenshtein ratio for a fuzzy hit.
    pub fuzzy_threshold: f32,
    /// Page size when the caller does not pass one.
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_results: DEFAULT_MIN_RESULTS,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl SearchConfig {
    pub(super) fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            min_results: read_env_usize(lookup, ENV_MIN_RESULTS, defaults.min_results, 0),
            fuzzy_threshold: match lookup(ENV_FUZZY_THRESHOLD) {
                None => defaults.fuzzy_threshold,
                Some(raw) => read_env_f32(lookup, ENV_FUZZY_THRESHOLD).ok_or_else(|| {
                    KeypathError::Validation(format!(
                        "invalid {ENV_FUZZY_THRESHOLD}: {raw} (expected a number in (0, 1])"
                    ))
                })?,
            },
            max_results: read_env_usize(lookup, ENV_MAX_RESULTS, defaults.max_results, 1),
        };
        config.validate()?;
        Ok(config)
    }

    pub(super) fn validate(&self) -> Result<()> {
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(KeypathError::Validation(format!(
                "fuzzy_threshold must be in (0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        if self.max_results == 0 {
            return Err(KeypathError::Validation(
                "max_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
