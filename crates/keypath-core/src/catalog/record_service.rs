use chrono::Utc;
use tracing::info;

use crate::error::{KeypathError, Result, display_path};
use crate::models::Record;

use super::Catalog;

impl Catalog {
    pub fn record(&self, name: &str) -> Result<Record> {
        self.snapshot()?
            .record(name)
            .cloned()
            .ok_or_else(|| KeypathError::RecordNotFound(name.to_string()))
    }

    /// Adds a new record. Records without a keyword path are filed under the
    /// fallback root.
    pub fn add_record(&self, record: Record) -> Result<Record> {
        let record = record.normalized(&self.config.migration.fallback_root)?;
        let stored = record.clone();
        self.mutate(|working| {
            if working.record(&record.name).is_some() {
                return Err(KeypathError::Validation(format!(
                    "record already exists: {}",
                    record.name
                )));
            }
            working.upsert(record)
        })?;
        info!(
            name = %stored.name,
            path = %display_path(&stored.keyword_path),
            "added record"
        );
        Ok(stored)
    }

    /// Replaces an existing record, keeping its creation time.
    pub fn update_record(&self, record: Record) -> Result<Record> {
        let mut record = record.normalized(&self.config.migration.fallback_root)?;
        record.updated_at = Utc::now();
        let stored = self.mutate(|working| {
            let Some(existing) = working.record(&record.name) else {
                return Err(KeypathError::RecordNotFound(record.name.clone()));
            };
            record.created_at = existing.created_at;
            working.upsert(record.clone())?;
            Ok(record)
        })?;
        info!(
            name = %stored.name,
            path = %display_path(&stored.keyword_path),
            "updated record"
        );
        Ok(stored)
    }

    pub fn remove_record(&self, name: &str) -> Result<Record> {
        let removed = self.mutate(|working| working.remove(name))?;
        info!(name, "removed record");
        Ok(removed)
    }
}
