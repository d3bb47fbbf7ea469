use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, KeypathError>;

#[derive(Debug, Error)]
pub enum KeypathError {
    #[error("keyword path not found: {0}")]
    PathNotFound(String),

    #[error("name collision: {0}")]
    NameCollision(String),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("malformed taxonomy at {path}: {reason}")]
    MalformedTaxonomy { path: String, reason: String },

    #[error("index has not been built yet")]
    IndexStale,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite-store")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl KeypathError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathNotFound(_) => "PATH_NOT_FOUND",
            Self::NameCollision(_) => "NAME_COLLISION",
            Self::RecordNotFound(_) => "RECORD_NOT_FOUND",
            Self::MalformedTaxonomy { .. } => "MALFORMED_TAXONOMY",
            Self::IndexStale => "INDEX_STALE",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "sqlite-store")]
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Toml(_) => "TOML_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn lock_poisoned(name: &str) -> Self {
        Self::Internal(format!("{name} lock poisoned"))
    }

    pub(crate) fn path_not_found(path: &[String]) -> Self {
        Self::PathNotFound(display_path(path))
    }

    pub fn to_payload(&self, operation: impl Into<String>, path: Option<String>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            path,
        }
    }
}

/// Renders a keyword path the way it appears in error messages and logs.
#[must_use]
pub fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_stable_code_and_path() {
        let err = KeypathError::path_not_found(&["lang".to_string(), "go".to_string()]);
        let payload = err.to_payload("keywords", Some("lang/go".to_string()));
        assert_eq!(payload.code, "PATH_NOT_FOUND");
        assert_eq!(payload.message, "keyword path not found: lang/go");
        assert_eq!(payload.path.as_deref(), Some("lang/go"));
        assert!(!payload.trace_id.is_empty());
    }

    #[test]
    fn root_path_displays_as_slash() {
        assert_eq!(display_path(&[]), "/");
    }
}
