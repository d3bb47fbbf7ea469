use crate::error::{KeypathError, Result};
use crate::models::Strategy;

const FINGERPRINT_HEX_LEN: usize = 16;

/// Binds a continuation offset to the query it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CursorKey {
    fingerprint: String,
}

impl CursorKey {
    pub(super) fn new(
        generation: u64,
        query: &str,
        path_filter: Option<&[String]>,
        strategy: Strategy,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&generation.to_le_bytes());
        hasher.update(query.as_bytes());
        hasher.update(&[0]);
        if let Some(path) = path_filter {
            for segment in path {
                hasher.update(segment.as_bytes());
                hasher.update(&[0x1f]);
            }
        }
        hasher.update(&[0]);
        hasher.update(strategy.as_str().as_bytes());
        let mut fingerprint = hasher.finalize().to_hex().to_string();
        fingerprint.truncate(FINGERPRINT_HEX_LEN);
        Self { fingerprint }
    }

    pub(super) fn encode(&self, offset: usize) -> String {
        format!("{offset}.{}", self.fingerprint)
    }

    /// Offset carried by `raw`, or `Validation` when the cursor is garbled or
    /// was issued for another query or snapshot.
    pub(super) fn decode(&self, raw: &str) -> Result<usize> {
        let invalid = || KeypathError::Validation(format!("invalid search cursor: {raw}"));
        let (offset, fingerprint) = raw.trim().split_once('.').ok_or_else(invalid)?;
        let offset = offset.parse::<usize>().map_err(|_| invalid())?;
        if fingerprint != self.fingerprint {
            return Err(KeypathError::Validation(
                "search cursor does not belong to this query or snapshot".to_string(),
            ));
        }
        Ok(offset)
    }
}
