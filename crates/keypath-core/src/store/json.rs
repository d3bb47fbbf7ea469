use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KeypathError, Result};
use crate::models::Record;

use super::Store;

const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    #[serde(default = "legacy_version")]
    version: u32,
    /// Older documents keep the collection under `cheatsheets`.
    #[serde(default, alias = "cheatsheets")]
    records: Vec<Record>,
}

const fn legacy_version() -> u32 {
    0
}

/// Whole collection in a single pretty-printed JSON document, replaced
/// atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Vec<Record>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let document: Document = serde_json::from_str(&raw)?;
        if document.version > DOCUMENT_VERSION {
            return Err(KeypathError::Validation(format!(
                "unsupported document version {} in {}",
                document.version,
                self.path.display()
            )));
        }
        debug!(
            path = %self.path.display(),
            version = document.version,
            records = document.records.len(),
            "loaded record document"
        );
        Ok(document.records)
    }

    fn save(&self, records: &[Record]) -> Result<()> {
        let document = Document {
            version: DOCUMENT_VERSION,
            records: records.to_vec(),
        };
        let mut content = serde_json::to_string_pretty(&document)?;
        content.push('\n');
        write_atomic(&self.path, content.as_bytes())
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file_name = path.file_name().and_then(|x| x.to_str()).ok_or_else(|| {
        KeypathError::Validation(format!("invalid store filename: {}", path.display()))
    })?;
    let tmp_path = parent.join(format!(
        ".{file_name}.keypath.tmp.{}",
        uuid::Uuid::new_v4().simple()
    ));

    {
        let mut tmp = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;
        tmp.write_all(content)?;
        tmp.sync_all()?;
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(KeypathError::from(err));
    }

    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}
