use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};

use crate::config::KeypathConfig;
use crate::error::{KeypathError, Result};
use crate::migration::MigrationAdvisor;
use crate::models::Record;
use crate::router::QueryRouter;
use crate::snapshot::Snapshot;
use crate::store::Store;

mod keyword_service;
mod migration_service;
mod record_service;
mod search_service;

/// Owns the current [`Snapshot`] and its store. Readers clone the snapshot
/// `Arc` and never block each other; writers are serialized, mutate a private
/// copy, persist it and only then swap it in.
pub struct Catalog {
    store: Arc<dyn Store>,
    config: KeypathConfig,
    router: QueryRouter,
    advisor: MigrationAdvisor,
    snapshot: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

impl Catalog {
    /// Loads the collection from `store`. The text index is built on first
    /// search. Records that cannot form a valid taxonomy put the catalog in
    /// degraded mode instead of failing.
    pub fn open(store: impl Store + 'static, config: KeypathConfig) -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(store);
        let snapshot = load_snapshot(store.as_ref(), &config)?.with_generation(1);
        Ok(Self {
            store,
            router: QueryRouter::new(&config.search),
            advisor: MigrationAdvisor::new(config.migration.clone()),
            config,
            snapshot: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &KeypathConfig {
        &self.config
    }

    /// The snapshot currently served to readers.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        let guard = self
            .snapshot
            .read()
            .map_err(|_| KeypathError::lock_poisoned("catalog snapshot"))?;
        Ok(Arc::clone(&guard))
    }

    /// Re-reads the store and replaces the snapshot. Also the way out of
    /// degraded mode once the stored records are fixed.
    pub fn reload(&self) -> Result<()> {
        let _gate = self
            .writer
            .lock()
            .map_err(|_| KeypathError::lock_poisoned("catalog writer"))?;
        let generation = self.snapshot()?.generation();
        let snapshot = load_snapshot(self.store.as_ref(), &self.config)?;
        self.swap(snapshot.with_generation(generation + 1))
    }

    /// Builds the text index if the served snapshot lacks one. The build runs
    /// outside every lock; the result is published only if the served
    /// snapshot is still the same unindexed generation, and keeps that
    /// generation since the content is unchanged.
    fn indexed_snapshot(&self) -> Result<Arc<Snapshot>> {
        let current = self.snapshot()?;
        if current.is_indexed() || current.is_degraded() {
            return Ok(current);
        }
        let mut working = Snapshot::clone(&current);
        working.ensure_indexed();
        let working = Arc::new(working);

        let mut served = self
            .snapshot
            .write()
            .map_err(|_| KeypathError::lock_poisoned("catalog snapshot"))?;
        if served.is_indexed() {
            return Ok(Arc::clone(&served));
        }
        if served.generation() != current.generation() {
            // A writer published in the meantime; answer from the snapshot
            // the query started on.
            debug!(
                built = current.generation(),
                served = served.generation(),
                "served snapshot moved during index build"
            );
            return Ok(working);
        }
        *served = Arc::clone(&working);
        Ok(working)
    }

    /// Runs `f` against a copy of the current snapshot, persists the result
    /// and publishes it. Nothing is published when `f` or the save fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut Snapshot) -> Result<T>) -> Result<T> {
        let _gate = self
            .writer
            .lock()
            .map_err(|_| KeypathError::lock_poisoned("catalog writer"))?;
        let current = self.snapshot()?;
        if let Some(reason) = current.degraded_reason() {
            return Err(KeypathError::Validation(format!(
                "catalog is read-only while degraded: {reason}"
            )));
        }

        let mut working = Snapshot::clone(&current);
        working.ensure_indexed();
        let value = f(&mut working)?;

        let records = working.records().values().cloned().collect::<Vec<Record>>();
        self.store.save(&records)?;
        self.swap(working.with_generation(current.generation() + 1))?;
        Ok(value)
    }

    fn swap(&self, snapshot: Snapshot) -> Result<()> {
        let generation = snapshot.generation();
        let records = snapshot.len();
        *self
            .snapshot
            .write()
            .map_err(|_| KeypathError::lock_poisoned("catalog snapshot"))? = Arc::new(snapshot);
        debug!(generation, records, "published snapshot");
        Ok(())
    }
}

fn load_snapshot(store: &dyn Store, config: &KeypathConfig) -> Result<Snapshot> {
    let records = store.load()?;
    match Snapshot::load(records.clone(), &config.migration.fallback_root) {
        Ok(snapshot) => Ok(snapshot),
        Err(err) => {
            warn!(
                error = %err,
                code = err.code(),
                records = records.len(),
                "taxonomy build failed; serving linear-scan search"
            );
            Ok(Snapshot::degraded(records, err.to_string()))
        }
    }
}
