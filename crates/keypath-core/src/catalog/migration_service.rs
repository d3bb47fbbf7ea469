use tracing::info;

use crate::error::Result;
use crate::migration::{MigrateOptions, MigrationReport, ProposedTaxonomy};
use crate::snapshot::Snapshot;

use super::Catalog;

impl Catalog {
    /// Keyword hierarchy inferred from the tags of every stored record.
    pub fn suggest_hierarchy(&self) -> Result<ProposedTaxonomy> {
        let snapshot = self.snapshot()?;
        Ok(self.proposed_taxonomy(&snapshot))
    }

    /// Files legacy records into the inferred hierarchy. A dry run only
    /// reports; a commit persists the new paths and re-indexes the moved
    /// records before publishing them.
    pub fn migrate(&self, options: &MigrateOptions) -> Result<MigrationReport> {
        if options.dry_run {
            let snapshot = self.snapshot()?;
            let taxonomy = self.proposed_taxonomy(&snapshot);
            return self.advisor.plan(
                snapshot.records().values(),
                snapshot.tree(),
                &taxonomy,
                options,
            );
        }

        let (report, moved) = self.mutate(|working| {
            let taxonomy = self.proposed_taxonomy(working);
            let report =
                self.advisor
                    .plan(working.records().values(), working.tree(), &taxonomy, options)?;
            let (records, tree) = working.parts_mut();
            let moved = self.advisor.apply(&report, records.values_mut(), tree)?;
            working.reindex(report.entries.iter().map(|entry| entry.name.as_str()));
            Ok((report, moved))
        })?;
        info!(
            moved,
            skipped = report.skipped.len(),
            collisions = report.collisions(),
            "committed migration"
        );
        Ok(report)
    }

    fn proposed_taxonomy(&self, snapshot: &Snapshot) -> ProposedTaxonomy {
        self.advisor
            .suggest_hierarchy(snapshot.records().values().map(|record| &record.tags))
    }
}
