use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{KeypathError, Result};
use crate::models::{
    Field, FieldSet, MatchKind, Record, SearchHit, SearchOptions, SearchPage, Strategy,
};
use crate::ranking::{Ranked, RankingEngine, hit_ordering};
use crate::snapshot::Snapshot;
use crate::text::{normalize_path, tokenize};

mod cursor;

use cursor::CursorKey;

const SCAN_SCORE: f32 = 1.0;

/// Entry point for queries against one [`Snapshot`]. Stateless apart from
/// configuration.
#[derive(Debug, Clone, Copy)]
pub struct QueryRouter {
    engine: RankingEngine,
    default_max_results: usize,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

/// Records a query may return. `None` means the whole collection.
struct Scope(Option<HashSet<Arc<str>>>);

impl Scope {
    fn admits(&self, name: &str) -> bool {
        self.0.as_ref().is_none_or(|names| names.contains(name))
    }
}

impl QueryRouter {
    #[must_use]
    pub const fn new(config: &SearchConfig) -> Self {
        Self {
            engine: RankingEngine::new(config),
            default_max_results: config.max_results,
        }
    }

    /// Ranked, paginated search. An empty query yields an empty page. Fails
    /// with [`KeypathError::IndexStale`] when the snapshot has no index yet,
    /// so the owner can build one and retry.
    pub fn search(
        &self,
        snapshot: &Snapshot,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchPage> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchPage::default());
        }
        let limit = options.max_results.unwrap_or(self.default_max_results);
        if limit == 0 {
            return Err(KeypathError::Validation(
                "max_results must be at least 1".to_string(),
            ));
        }
        let path_filter = options
            .path_filter
            .as_deref()
            .map(normalize_path)
            .transpose()?;
        let key = CursorKey::new(
            snapshot.generation(),
            &query.to_lowercase(),
            path_filter.as_deref(),
            options.strategy,
        );
        let offset = options
            .cursor
            .as_deref()
            .map(|raw| key.decode(raw))
            .transpose()?
            .unwrap_or(0);

        let mut warnings = Vec::new();
        let ranked = if let Some(reason) = snapshot.degraded_reason() {
            warnings.push(format!(
                "index unavailable, results come from a linear scan: {reason}"
            ));
            scan(snapshot, query, path_filter.as_deref())
        } else {
            if !snapshot.is_indexed() {
                return Err(KeypathError::IndexStale);
            }
            let scope = scope_for(snapshot, path_filter.as_deref())?;
            self.rank(snapshot, query, options.strategy, &scope)
        };

        let mut hits = ranked
            .into_iter()
            .filter_map(|ranked| materialize(snapshot, ranked))
            .collect::<Vec<_>>();
        hits.sort_by(hit_ordering);

        let total = hits.len();
        let end = offset.saturating_add(limit).min(total);
        let next_cursor = (end < total).then(|| key.encode(end));
        let hits = if offset >= total {
            Vec::new()
        } else {
            hits.drain(offset..end).collect()
        };
        debug!(
            query,
            strategy = %options.strategy,
            total,
            returned = hits.len(),
            "search completed"
        );
        Ok(SearchPage {
            hits,
            total,
            next_cursor,
            warnings,
        })
    }

    /// Records filed exactly at `path`, or anywhere under it when `exact` is
    /// false, ordered by name.
    pub fn search_by_path<S: AsRef<str>>(
        &self,
        snapshot: &Snapshot,
        path: &[S],
        exact: bool,
    ) -> Result<Vec<Record>> {
        let path = normalize_path(path)?;
        if snapshot.is_degraded() {
            return Ok(snapshot
                .records()
                .values()
                .filter(|record| {
                    if exact {
                        record.keyword_path == path
                    } else {
                        record.has_path_prefix(&path)
                    }
                })
                .cloned()
                .collect());
        }
        let tree = snapshot.tree();
        let node = tree.resolve_strict(&path)?;
        let mut names = if exact {
            tree.records_at(node)
        } else {
            tree.records_under(node)
        };
        names.sort();
        Ok(names
            .iter()
            .filter_map(|name| snapshot.record(name))
            .cloned()
            .collect())
    }

    fn rank(
        &self,
        snapshot: &Snapshot,
        query: &str,
        strategy: Strategy,
        scope: &Scope,
    ) -> Vec<Ranked> {
        let in_scope = move || {
            snapshot
                .records()
                .values()
                .filter(move |record| scope.admits(&record.name))
        };
        let full_text = |exclude: &HashSet<Arc<str>>| {
            let terms = tokenize(query);
            let candidates = snapshot
                .index()
                .query(&terms)
                .into_iter()
                .filter(|candidate| {
                    scope.admits(&candidate.id) && !exclude.contains(&candidate.id)
                })
                .collect();
            self.engine.relevance(&terms, candidates, snapshot.index())
        };

        match strategy {
            Strategy::Exact => self.engine.exact(query, in_scope()),
            Strategy::FullText => full_text(&HashSet::new()),
            Strategy::Fuzzy => self.engine.fuzzy(query, in_scope()),
            Strategy::Auto => {
                let mut ranked = self.engine.exact(query, in_scope());
                let mut seen = ranked
                    .iter()
                    .map(|hit| hit.id.clone())
                    .collect::<HashSet<_>>();
                ranked.extend(full_text(&seen));
                if self.engine.needs_fuzzy(ranked.len()) {
                    seen.extend(ranked.iter().map(|hit| hit.id.clone()));
                    let remaining =
                        in_scope().filter(|record| !seen.contains(record.name.as_str()));
                    ranked.extend(self.engine.fuzzy(query, remaining));
                }
                ranked
            }
        }
    }
}

fn scope_for(snapshot: &Snapshot, path_filter: Option<&[String]>) -> Result<Scope> {
    let Some(path) = path_filter else {
        return Ok(Scope(None));
    };
    let tree = snapshot.tree();
    let node = tree.resolve_strict(path)?;
    Ok(Scope(Some(tree.records_under(node).into_iter().collect())))
}

/// Case-folded substring match over name, description and content, used
/// while no index is available.
fn scan(snapshot: &Snapshot, query: &str, path_filter: Option<&[String]>) -> Vec<Ranked> {
    let needle = query.to_lowercase();
    snapshot
        .records()
        .values()
        .filter(|record| path_filter.is_none_or(|path| record.has_path_prefix(path)))
        .filter_map(|record| {
            let mut fields = FieldSet::default();
            for (field, text) in [
                (Field::Name, &record.name),
                (Field::Description, &record.description),
                (Field::Content, &record.content),
            ] {
                if text.to_lowercase().contains(&needle) {
                    fields.insert(field);
                }
            }
            (!fields.is_empty()).then(|| Ranked {
                id: Arc::from(record.name.as_str()),
                score: SCAN_SCORE,
                kind: MatchKind::Scan,
                fields,
            })
        })
        .collect()
}

fn materialize(snapshot: &Snapshot, ranked: Ranked) -> Option<SearchHit> {
    let record = snapshot.record(&ranked.id)?;
    Some(SearchHit {
        name: record.name.clone(),
        score: ranked.score,
        kind: ranked.kind,
        fields: ranked.fields.to_vec(),
        keyword_path: record.keyword_path.clone(),
        updated_at: record.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn snapshot() -> Snapshot {
        let now = Utc::now();
        Snapshot::build(
            vec![
                Record::new("python_basics", "print hello world")
                    .with_description("Python language intro")
                    .with_path(&["lang", "python"])
                    .with_updated_at(now - Duration::days(3)),
                Record::new("go_basics", "fmt.Println hello")
                    .with_description("Go language intro")
                    .with_path(&["lang", "go"])
                    .with_updated_at(now - Duration::days(1)),
                Record::new("git_rebase", "git rebase -i HEAD~3")
                    .with_description("rewrite history")
                    .with_path(&["vcs", "git"])
                    .with_updated_at(now),
            ],
            "uncategorized",
        )
        .expect("build")
    }

    #[test]
    fn empty_query_returns_empty_page() {
        let page = QueryRouter::default()
            .search(&snapshot(), "   ", &SearchOptions::default())
            .expect("search");
        assert!(page.hits.is_empty());
        assert_eq!(page.total, 0);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn exact_hits_outrank_full_text_hits() {
        let page = QueryRouter::default()
            .search(&snapshot(), "language intro", &SearchOptions::default())
            .expect("search");
        assert_eq!(page.names(), vec!["go_basics", "python_basics"]);
        assert!(page.hits.iter().all(|hit| hit.kind == MatchKind::Exact));
    }

    #[test]
    fn path_filter_restricts_and_rejects_unknown_paths() {
        let router = QueryRouter::default();
        let snapshot = snapshot();
        let page = router
            .search(
                &snapshot,
                "hello",
                &SearchOptions::default().with_path_filter(&["Lang", "Python"]),
            )
            .expect("search");
        assert_eq!(page.names(), vec!["python_basics"]);

        let err = router
            .search(
                &snapshot,
                "hello",
                &SearchOptions::default().with_path_filter(&["lang", "rust"]),
            )
            .expect_err("unknown filter");
        assert!(matches!(err, KeypathError::PathNotFound(_)));
    }

    #[test]
    fn auto_falls_back_to_fuzzy_for_typos() {
        let page = QueryRouter::default()
            .search(&snapshot(), "pythn", &SearchOptions::default())
            .expect("search");
        assert_eq!(page.names(), vec!["python_basics"]);
        assert_eq!(page.hits[0].kind, MatchKind::Fuzzy);
    }

    #[test]
    fn pinned_strategy_runs_single_stage() {
        let router = QueryRouter::default();
        let snapshot = snapshot();
        let exact = router
            .search(
                &snapshot,
                "pythn",
                &SearchOptions::default().with_strategy(Strategy::Exact),
            )
            .expect("search");
        assert!(exact.hits.is_empty());

        let full_text = router
            .search(
                &snapshot,
                "hello",
                &SearchOptions::default().with_strategy(Strategy::FullText),
            )
            .expect("search");
        assert_eq!(full_text.total, 2);
        assert!(full_text.hits.iter().all(|hit| hit.kind == MatchKind::FullText));
    }

    #[test]
    fn pagination_walks_pages_with_cursor() {
        let router = QueryRouter::default();
        let snapshot = snapshot();
        let options = SearchOptions::default()
            .with_strategy(Strategy::FullText)
            .with_max_results(1);
        let first = router.search(&snapshot, "hello", &options).expect("first");
        assert_eq!(first.hits.len(), 1);
        assert_eq!(first.total, 2);
        let cursor = first.next_cursor.clone().expect("cursor");

        let second = router
            .search(&snapshot, "hello", &options.clone().with_cursor(cursor.clone()))
            .expect("second");
        assert_eq!(second.hits.len(), 1);
        assert_ne!(second.hits[0].name, first.hits[0].name);
        assert!(second.next_cursor.is_none());

        let err = router
            .search(&snapshot, "world", &options.with_cursor(cursor))
            .expect_err("foreign cursor");
        assert!(matches!(err, KeypathError::Validation(_)));
    }

    #[test]
    fn unindexed_snapshot_reports_index_stale() {
        let snapshot = Snapshot::load(vec![Record::new("a", "alpha")], "uncategorized")
            .expect("load");
        let err = QueryRouter::default()
            .search(&snapshot, "alpha", &SearchOptions::default())
            .expect_err("stale");
        assert!(matches!(err, KeypathError::IndexStale));
    }

    #[test]
    fn degraded_snapshot_scans_and_warns() {
        let snapshot = Snapshot::degraded(
            vec![
                Record::new("a", "contains needle").with_path(&["x"]),
                Record::new("b", "nothing").with_path(&["y"]),
            ],
            "bad segment",
        );
        let page = QueryRouter::default()
            .search(&snapshot, "NEEDLE", &SearchOptions::default())
            .expect("scan");
        assert_eq!(page.names(), vec!["a"]);
        assert_eq!(page.hits[0].kind, MatchKind::Scan);
        assert_eq!(page.warnings.len(), 1);
    }

    #[test]
    fn search_by_path_exact_and_prefix() {
        let router = QueryRouter::default();
        let snapshot = snapshot();
        let under = router
            .search_by_path(&snapshot, &["lang"], false)
            .expect("prefix");
        let names = under.iter().map(|record| record.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["go_basics", "python_basics"]);
        assert!(
            router
                .search_by_path(&snapshot, &["lang"], true)
                .expect("exact")
                .is_empty()
        );
        assert!(matches!(
            router.search_by_path(&snapshot, &["ops"], false),
            Err(KeypathError::PathNotFound(_))
        ));
    }
}
