use crate::error::{KeypathError, Result};
use crate::models::{Record, SearchOptions, SearchPage};

use super::Catalog;

impl Catalog {
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchPage> {
        let snapshot = self.snapshot()?;
        match self.router.search(&snapshot, query, options) {
            Err(KeypathError::IndexStale) => {
                let snapshot = self.indexed_snapshot()?;
                self.router.search(&snapshot, query, options)
            }
            other => other,
        }
    }

    pub fn search_by_path<S: AsRef<str>>(&self, path: &[S], exact: bool) -> Result<Vec<Record>> {
        let snapshot = self.snapshot()?;
        self.router.search_by_path(&snapshot, path, exact)
    }
}
