use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::models::{Field, FieldSet, Record};
use crate::text::{tokenize, usize_to_f32};

mod lifecycle;

/// Per-document, per-field occurrence counts of one term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Posting {
    freqs: [u32; Field::ALL.len()],
}

impl Posting {
    #[must_use]
    pub const fn frequency(&self, field: Field) -> u32 {
        self.freqs[field_slot(field)]
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.freqs.iter().sum()
    }

    /// Frequency with each occurrence scaled by its field weight.
    #[must_use]
    pub fn weighted(&self) -> f32 {
        Field::ALL
            .into_iter()
            .map(|field| u32_to_f32(self.frequency(field)) * field.weight())
            .sum()
    }

    #[must_use]
    pub fn fields(&self) -> FieldSet {
        Field::ALL
            .into_iter()
            .filter(|field| self.frequency(*field) > 0)
            .collect()
    }

    fn bump(&mut self, field: Field) {
        self.freqs[field_slot(field)] += 1;
    }
}

/// A document that matched at least one query term. Unranked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: Arc<str>,
    /// Distinct query terms present in the document.
    pub matched_terms: usize,
    /// Sum of raw occurrences of the matched terms.
    pub hits: u32,
    pub fields: FieldSet,
}

#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    postings: HashMap<String, BTreeMap<Arc<str>, Posting>>,
    doc_terms: HashMap<Arc<str>, Vec<String>>,
    doc_lengths: HashMap<Arc<str>, usize>,
    total_doc_length: usize,
    built: bool,
}

impl InvertedIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards all postings and indexes `records` from scratch.
    pub fn build<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) {
        self.clear();
        for record in records {
            self.update(record);
        }
        self.built = true;
    }

    /// Re-indexes one record in place, replacing any earlier postings.
    pub fn update(&mut self, record: &Record) {
        let key: Arc<str> = Arc::from(record.name.as_str());
        if self.doc_terms.contains_key(key.as_ref()) {
            self.remove_document_stats(key.as_ref());
        }

        let mut per_term = HashMap::<String, Posting>::new();
        for (field, text) in field_texts(record) {
            for token in tokenize(&text) {
                per_term.entry(token).or_default().bump(field);
            }
        }

        let doc_len = per_term
            .values()
            .map(|posting| posting.total() as usize)
            .sum::<usize>();
        let mut terms = Vec::with_capacity(per_term.len());
        for (term, posting) in per_term {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(key.clone(), posting);
            terms.push(term);
        }
        terms.sort_unstable();
        self.total_doc_length += doc_len;
        self.doc_lengths.insert(key.clone(), doc_len);
        self.doc_terms.insert(key, terms);
    }

    /// Drops every posting of `id`. Returns whether the document was indexed.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.doc_terms.contains_key(id) {
            return false;
        }
        self.remove_document_stats(id);
        true
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.doc_terms.clear();
        self.doc_lengths.clear();
        self.total_doc_length = 0;
        self.built = false;
    }

    #[must_use]
    pub const fn is_built(&self) -> bool {
        self.built
    }

    /// OR-query over already-normalized terms. Results are ordered by id and
    /// carry raw counts only; ranking happens elsewhere.
    #[must_use]
    pub fn query(&self, terms: &[String]) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut by_doc = BTreeMap::<Arc<str>, Candidate>::new();
        for term in terms {
            if !seen.insert(term.as_str()) {
                continue;
            }
            let Some(docs) = self.postings.get(term) else {
                continue;
            };
            for (id, posting) in docs {
                let candidate = by_doc.entry(id.clone()).or_insert_with(|| Candidate {
                    id: id.clone(),
                    matched_terms: 0,
                    hits: 0,
                    fields: FieldSet::default(),
                });
                candidate.matched_terms += 1;
                candidate.hits += posting.total();
                candidate.fields.extend(posting.fields());
            }
        }
        by_doc.into_values().collect()
    }

    /// Tokenizes free text the same way documents are tokenized, then queries.
    #[must_use]
    pub fn query_text(&self, text: &str) -> Vec<Candidate> {
        self.query(&tokenize(text))
    }

    #[must_use]
    pub fn posting(&self, term: &str, id: &str) -> Option<&Posting> {
        self.postings.get(term).and_then(|docs| docs.get(id))
    }

    #[must_use]
    pub fn weighted_term_freq(&self, term: &str, id: &str) -> f32 {
        self.posting(term, id).map_or(0.0, Posting::weighted)
    }

    #[must_use]
    pub fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    #[must_use]
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn doc_len(&self, id: &str) -> usize {
        self.doc_lengths.get(id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn avg_doc_len(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 1.0;
        }
        (usize_to_f32(self.total_doc_length) / usize_to_f32(self.doc_lengths.len())).max(1.0)
    }

    #[must_use]
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.doc_terms.contains_key(id)
    }
}

fn field_texts(record: &Record) -> [(Field, String); 5] {
    [
        (Field::Name, record.name.clone()),
        (Field::Description, record.description.clone()),
        (Field::Path, record.keyword_path.join(" ")),
        (Field::Tags, record.tags.join(" ")),
        (Field::Content, record.content.clone()),
    ]
}

const fn field_slot(field: Field) -> usize {
    match field {
        Field::Name => 0,
        Field::Description => 1,
        Field::Path => 2,
        Field::Tags => 3,
        Field::Content => 4,
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "term frequencies are small and feed lossy ranking arithmetic"
)]
pub(crate) const fn u32_to_f32(value: u32) -> f32 {
    value as f32
}
