// Public fallible APIs in this crate share one concrete error contract (`KeypathError`).
// Repeating per-function `# Errors` boilerplate obscures behavior more than it clarifies.
#![allow(
    clippy::missing_errors_doc,
    reason = "crate-wide fallible API uses one explicit error type; per-item boilerplate would duplicate contract"
)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod migration;
pub mod models;
pub mod ranking;
pub mod router;
pub mod snapshot;
pub mod store;
pub mod taxonomy;
pub(crate) mod text;

pub use catalog::Catalog;
pub use config::{ContentHint, KeypathConfig, MigrationConfig, SearchConfig};
pub use error::{ErrorPayload, KeypathError, Result};
pub use migration::{CollisionPolicy, MigrateOptions, MigrationAdvisor, MigrationReport};
pub use models::{
    KeywordListing, MatchKind, PathOrigin, Record, SearchHit, SearchOptions, SearchPage, Strategy,
};
pub use router::QueryRouter;
pub use snapshot::Snapshot;
#[cfg(feature = "sqlite-store")]
pub use store::SqliteStore;
pub use store::{JsonFileStore, MemoryStore, Store};
pub use taxonomy::{NodeId, TaxonomyTree};
