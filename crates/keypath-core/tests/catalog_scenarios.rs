use keypath_core::error::KeypathError;
use keypath_core::models::{MatchKind, Record, SearchOptions, Strategy};
use keypath_core::store::MemoryStore;
use keypath_core::taxonomy::TaxonomyTree;
use keypath_core::{Catalog, KeypathConfig};

fn lang_catalog() -> Catalog {
    let store = MemoryStore::new(vec![
        Record::new("pandas_basics", "df.describe() summarizes columns")
            .with_path(&["lang", "python"]),
        Record::new("goroutines", "go func() runs concurrently").with_path(&["lang", "go"]),
    ]);
    Catalog::open(store, KeypathConfig::default()).expect("open catalog")
}

#[test]
fn merge_go_into_python_keeps_both_records_findable() {
    let catalog = lang_catalog();
    let listing = catalog.keywords(&["lang"]).expect("list lang");
    assert_eq!(listing.children.len(), 2);
    assert_eq!(listing.count_of("python"), Some(1));
    assert_eq!(listing.count_of("go"), Some(1));

    catalog
        .merge_keywords(&["lang", "go"], &["lang", "python"])
        .expect("merge");

    let listing = catalog.keywords(&["lang"]).expect("list lang after merge");
    assert_eq!(listing.children.len(), 1);
    assert_eq!(listing.count_of("python"), Some(2));

    let page = catalog
        .search(
            "lang",
            &SearchOptions::default().with_path_filter(&["lang", "python"]),
        )
        .expect("filtered search");
    let mut names = page.names();
    names.sort_unstable();
    assert_eq!(names, vec!["goroutines", "pandas_basics"]);

    let err = catalog
        .search("go", &SearchOptions::default().with_path_filter(&["lang", "go"]))
        .expect_err("merged source no longer resolves");
    assert!(matches!(err, KeypathError::PathNotFound(_)));
}

#[test]
fn misspelled_query_falls_back_to_fuzzy_match() {
    let store = MemoryStore::new(vec![
        Record::new("python_basics", "list comprehensions").with_path(&["lang", "python"]),
    ]);
    let catalog = Catalog::open(store, KeypathConfig::default()).expect("open catalog");

    let page = catalog
        .search("pythn", &SearchOptions::default())
        .expect("auto search");
    assert_eq!(page.names(), vec!["python_basics"]);
    assert_eq!(page.hits[0].kind, MatchKind::Fuzzy);
    assert!(page.hits[0].score >= 0.7);

    let pinned = catalog
        .search(
            "pythn",
            &SearchOptions::default().with_strategy(Strategy::FullText),
        )
        .expect("full text only");
    assert!(pinned.hits.is_empty());
}

#[test]
fn empty_query_returns_nothing() {
    let catalog = lang_catalog();
    for query in ["", "   "] {
        let page = catalog
            .search(query, &SearchOptions::default())
            .expect("empty query");
        assert!(page.hits.is_empty());
        assert_eq!(page.total, 0);
        assert!(page.next_cursor.is_none());
    }
}

#[test]
fn every_record_is_found_under_its_exact_path() {
    let catalog = lang_catalog();
    catalog
        .add_record(
            Record::new("serde_derive", "derive Serialize for structs")
                .with_path(&["lang", "rust", "serde"]),
        )
        .expect("add");

    let snapshot = catalog.snapshot().expect("snapshot");
    for record in snapshot.records().values() {
        let term = record
            .content
            .split_whitespace()
            .next()
            .expect("content has a word");
        let page = catalog
            .search(
                term,
                &SearchOptions::default().with_path_filter(&record.keyword_path),
            )
            .expect("filtered search");
        assert!(
            page.names().contains(&record.name.as_str()),
            "{} missing under its own path",
            record.name
        );
    }
}

#[test]
fn ensure_path_is_idempotent() {
    let mut tree = TaxonomyTree::new();
    let first = tree.ensure_path(&["Lang", "Python"]).expect("first");
    let nodes = tree.node_count();
    let second = tree.ensure_path(&["lang", "python"]).expect("second");
    assert_eq!(first, second);
    assert_eq!(tree.node_count(), nodes);
    assert_eq!(
        tree.children(&["lang".to_string()])
            .expect("children")
            .len(),
        1
    );
}

#[test]
fn pagination_walks_all_hits_once() {
    let records = (0..7)
        .map(|i| Record::new(format!("docker_{i}"), "docker compose up").with_path(&["ops"]))
        .collect::<Vec<_>>();
    let catalog =
        Catalog::open(MemoryStore::new(records), KeypathConfig::default()).expect("open catalog");

    let mut seen = Vec::new();
    let mut options = SearchOptions::default().with_max_results(3);
    loop {
        let page = catalog.search("compose", &options).expect("page");
        assert_eq!(page.total, 7);
        seen.extend(page.hits.iter().map(|hit| hit.name.clone()));
        match page.next_cursor {
            Some(cursor) => options = options.with_cursor(cursor),
            None => break,
        }
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 7);
}
