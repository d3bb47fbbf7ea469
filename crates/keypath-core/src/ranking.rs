use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::index::{Candidate, InvertedIndex};
use crate::models::{Field, FieldSet, MatchKind, Record, SearchHit};
use crate::text::usize_to_f32;

mod fuzzy;

/// Fixed score of an exact substring hit. Every other tier stays below it.
pub const EXACT_SCORE: f32 = 3.0;
/// Lower bound of the full-text tier; relevance maps into `(1, 2)`.
pub const FULL_TEXT_FLOOR: f32 = 1.0;
const LENGTH_NORM_B: f32 = 0.75;

/// A scored, not yet materialized, hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub id: Arc<str>,
    pub score: f32,
    pub kind: MatchKind,
    pub fields: FieldSet,
}

#[derive(Debug, Clone, Copy)]
pub struct RankingEngine {
    min_results: usize,
    fuzzy_threshold: f32,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl RankingEngine {
    #[must_use]
    pub const fn new(config: &SearchConfig) -> Self {
        Self {
            min_results: config.min_results,
            fuzzy_threshold: config.fuzzy_threshold,
        }
    }

    #[must_use]
    pub const fn min_results(&self) -> usize {
        self.min_results
    }

    /// Whether the approximate stage should run after `found` stronger hits.
    #[must_use]
    pub const fn needs_fuzzy(&self, found: usize) -> bool {
        found < self.min_results
    }

    /// Case-folded substring match of the whole query against name and
    /// description.
    #[must_use]
    pub fn exact<'a>(&self, query: &str, records: impl IntoIterator<Item = &'a Record>) -> Vec<Ranked> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        records
            .into_iter()
            .filter_map(|record| {
                let mut fields = FieldSet::default();
                if record.name.to_lowercase().contains(&needle) {
                    fields.insert(Field::Name);
                }
                if record.description.to_lowercase().contains(&needle) {
                    fields.insert(Field::Description);
                }
                (!fields.is_empty()).then(|| Ranked {
                    id: Arc::from(record.name.as_str()),
                    score: EXACT_SCORE,
                    kind: MatchKind::Exact,
                    fields,
                })
            })
            .collect()
    }

    /// Length-normalized, idf-weighted relevance of index candidates.
    #[must_use]
    pub fn relevance(
        &self,
        terms: &[String],
        candidates: Vec<Candidate>,
        index: &InvertedIndex,
    ) -> Vec<Ranked> {
        candidates
            .into_iter()
            .map(|candidate| {
                let raw = relevance_score(terms, &candidate.id, index);
                Ranked {
                    score: FULL_TEXT_FLOOR + raw / (raw + 1.0),
                    id: candidate.id,
                    kind: MatchKind::FullText,
                    fields: candidate.fields,
                }
            })
            .collect()
    }

    /// Approximate matches for typos. Scores are the similarity ratio, so
    /// they always rank below exact and full-text hits.
    #[must_use]
    pub fn fuzzy<'a>(&self, query: &str, records: impl IntoIterator<Item = &'a Record>) -> Vec<Ranked> {
        let variants = fuzzy::variants(query);
        if variants.is_empty() {
            return Vec::new();
        }
        records
            .into_iter()
            .filter_map(|record| {
                let (ratio, fields) = fuzzy::best_match(&variants, record);
                (ratio >= self.fuzzy_threshold).then(|| Ranked {
                    id: Arc::from(record.name.as_str()),
                    score: ratio,
                    kind: MatchKind::Fuzzy,
                    fields,
                })
            })
            .collect()
    }
}

/// `Σ weighted_tf / length_norm × idf` over the distinct query terms.
#[must_use]
pub fn relevance_score(terms: &[String], id: &str, index: &InvertedIndex) -> f32 {
    let total_docs = index.doc_count();
    if terms.is_empty() || total_docs == 0 {
        return 0.0;
    }
    let n = usize_to_f32(total_docs);
    let length_norm = LENGTH_NORM_B.mul_add(
        usize_to_f32(index.doc_len(id)) / index.avg_doc_len(),
        1.0 - LENGTH_NORM_B,
    );
    let mut seen = HashSet::new();
    let mut score = 0.0;
    for term in terms {
        if !seen.insert(term.as_str()) {
            continue;
        }
        let weighted_tf = index.weighted_term_freq(term, id);
        if weighted_tf <= 0.0 {
            continue;
        }
        let df = usize_to_f32(index.doc_freq(term));
        let idf = ((n - df + 0.5) / (df + 0.5)).ln_1p().max(0.0);
        if length_norm > 0.0 {
            score += weighted_tf / length_norm * idf;
        }
    }
    score
}

/// Score desc, then most recently updated, then name.
pub fn hit_ordering(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
        .then_with(|| a.name.cmp(&b.name))
}
