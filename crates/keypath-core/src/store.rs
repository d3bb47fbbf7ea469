use std::sync::{Arc, Mutex};

use crate::error::{KeypathError, Result};
use crate::models::Record;

mod json;
#[cfg(feature = "sqlite-store")]
mod sqlite;

pub use json::JsonFileStore;
#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;

/// Durable home of the record collection. `save` replaces the whole
/// collection; a failed save must leave the previous contents readable.
pub trait Store: Send + Sync {
    fn load(&self) -> Result<Vec<Record>>;
    fn save(&self, records: &[Record]) -> Result<()>;
}

impl<T: Store + ?Sized> Store for Arc<T> {
    fn load(&self) -> Result<Vec<Record>> {
        (**self).load()
    }

    fn save(&self, records: &[Record]) -> Result<()> {
        (**self).save(records)
    }
}

impl<T: Store + ?Sized> Store for Box<T> {
    fn load(&self) -> Result<Vec<Record>> {
        (**self).load()
    }

    fn save(&self, records: &[Record]) -> Result<()> {
        (**self).save(records)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Vec<Record>> {
        let records = self
            .records
            .lock()
            .map_err(|_| KeypathError::lock_poisoned("memory store"))?;
        Ok(records.clone())
    }

    fn save(&self, records: &[Record]) -> Result<()> {
        let mut stored = self
            .records
            .lock()
            .map_err(|_| KeypathError::lock_poisoned("memory store"))?;
        *stored = records.to_vec();
        Ok(())
    }
}
