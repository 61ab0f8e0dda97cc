use related_core::types::{Corpus, Document};

/// A document eligible for ranking against some query, with its corpus position.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub position: usize,
    pub doc: &'a Document,
}

/// Every other document sharing at least one category with `target`, in corpus order.
///
/// The target is excluded by identifier, so distinct documents with identical
/// titles remain candidates for each other.
pub fn filter_candidates<'a>(target: &Document, corpus: &'a Corpus) -> Vec<Candidate<'a>> {
    if target.categories.is_empty() {
        return Vec::new();
    }
    corpus
        .iter()
        .enumerate()
        .filter(|(_, doc)| doc.id != target.id && doc.shares_category_with(target))
        .map(|(position, doc)| Candidate { position, doc })
        .collect()
}
