use super::InvertedIndex;

impl InvertedIndex {
    pub(super) fn remove_document_stats(&mut self, id: &str) {
        if let Some(terms) = self.doc_terms.remove(id) {
            for term in terms {
                let mut remove_term = false;
                if let Some(docs) = self.postings.get_mut(&term) {
                    docs.remove(id);
                    remove_term = docs.is_empty();
                }
                if remove_term {
                    self.postings.remove(&term);
                }
            }
        }
        if let Some(doc_len) = self.doc_lengths.remove(id) {
            self.total_doc_length = self.total_doc_length.saturating_sub(doc_len);
        }
    }
}
