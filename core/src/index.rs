use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub type DocId = u32;
pub type Position = u32;

/// Per-term postings: document id -> ascending token positions in that document.
#[derive(Debug, Clone, Default)]
pub struct PostingsList {
    docs: BTreeMap<DocId, Vec<Position>>,
    total: u64,
}

impl PostingsList {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, doc_id: DocId, position: Position) {
        let positions = self.docs.entry(doc_id).or_default();
        debug_assert!(positions.last().map_or(true, |&last| last < position));
        positions.push(position);
        self.total += 1;
    }

    /// Total number of occurrences across all documents.
    pub fn term_frequency(&self) -> u64 { self.total }

    pub fn document_frequency(&self) -> usize { self.docs.len() }

    pub fn contains(&self, doc_id: DocId) -> bool { self.docs.contains_key(&doc_id) }

    pub fn positions(&self, doc_id: DocId) -> Option<&[Position]> {
        self.docs.get(&doc_id).map(Vec::as_slice)
    }

    /// Occurrences of the term in one document, 0 when the document lacks it.
    pub fn frequency_in(&self, doc_id: DocId) -> u32 {
        self.docs.get(&doc_id).map_or(0, |p| p.len() as u32)
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ { self.docs.keys().copied() }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &[Position])> + '_ {
        self.docs.iter().map(|(&doc_id, positions)| (doc_id, positions.as_slice()))
    }
}

#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, PostingsList>,
    collection_length: u64,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Record one occurrence of `term` at `position` within `doc_id`.
    /// Positions for a given (term, doc) pair must arrive in increasing order.
    pub fn add_occurrence(&mut self, term: &str, doc_id: DocId, position: Position) {
        match self.postings.get_mut(term) {
            Some(list) => list.add(doc_id, position),
            None => {
                let mut list = PostingsList::new();
                list.add(doc_id, position);
                self.postings.insert(term.to_string(), list);
            }
        }
        self.collection_length += 1;
    }

    pub fn term_frequency(&self, term: &str) -> Result<u64> {
        self.postings
            .get(term)
            .map(PostingsList::term_frequency)
            .ok_or_else(|| Error::NotFound(term.to_string()))
    }

    pub fn document_frequency(&self, term: &str) -> Result<usize> {
        self.postings
            .get(term)
            .map(PostingsList::document_frequency)
            .ok_or_else(|| Error::NotFound(term.to_string()))
    }

    pub fn postings(&self, term: &str) -> Option<&PostingsList> { self.postings.get(term) }

    pub fn vocabulary_size(&self) -> usize { self.postings.len() }

    pub fn vocabulary(&self) -> BTreeSet<&str> {
        self.postings.keys().map(String::as_str).collect()
    }

    /// Total token occurrences across the whole vocabulary.
    pub fn collection_length(&self) -> u64 { self.collection_length }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InvertedIndex {
        let mut idx = InvertedIndex::new();
        for (pos, term) in ["to", "be", "or", "not", "to", "be"].iter().enumerate() {
            idx.add_occurrence(term, 0, pos as Position);
        }
        idx.add_occurrence("the", 1, 0);
        idx.add_occurrence("king", 1, 1);
        idx
    }

    #[test]
    fn positions_are_kept_per_document() {
        let idx = sample();
        let to = idx.postings("to").unwrap();
        assert_eq!(to.positions(0), Some(&[0, 4][..]));
        assert_eq!(to.positions(1), None);
        assert_eq!(to.frequency_in(0), 2);
        assert_eq!(to.frequency_in(1), 0);
    }

    #[test]
    fn frequencies_and_vocabulary() {
        let idx = sample();
        assert_eq!(idx.term_frequency("be").unwrap(), 2);
        assert_eq!(idx.document_frequency("be").unwrap(), 1);
        assert_eq!(idx.vocabulary_size(), 6);
        assert_eq!(idx.collection_length(), 8);
        let vocab: Vec<&str> = idx.vocabulary().into_iter().collect();
        assert_eq!(vocab, vec!["be", "king", "not", "or", "the", "to"]);
    }

    #[test]
    fn missing_term_is_not_found() {
        let idx = sample();
        assert!(matches!(idx.term_frequency("queen"), Err(Error::NotFound(t)) if t == "queen"));
        assert!(idx.document_frequency("queen").is_err());
        assert!(idx.postings("queen").is_none());
    }

    #[test]
    fn term_frequency_sums_position_lists() {
        let mut idx = InvertedIndex::new();
        idx.add_occurrence("ghost", 0, 3);
        idx.add_occurrence("ghost", 2, 0);
        idx.add_occurrence("ghost", 2, 7);
        let list = idx.postings("ghost").unwrap();
        let summed: usize = list.iter().map(|(_, p)| p.len()).sum();
        assert_eq!(list.term_frequency(), summed as u64);
        assert_eq!(list.doc_ids().collect::<Vec<_>>(), vec![0, 2]);
    }
}
