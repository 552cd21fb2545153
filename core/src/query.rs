//! Boolean match queries over the positional index.
//!
//! Three modes are supported: any-term (disjunctive) match, exact phrase
//! match, and a frequency comparison between two groups of terms. Matches are
//! reported as sorted, deduplicated scene or play identifiers.

use crate::index::{DocId, PostingsList};
use crate::store::IndexStore;
use std::collections::{BTreeMap, BTreeSet};

/// Marker separating the "greater" terms from the "lesser" terms of a threshold query.
pub const THRESHOLD_SEPARATOR: &str = "-gt";

/// Which identifier a matched document is reported as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Scene,
    Play,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchQuery {
    /// Documents containing any of the terms.
    Terms(Vec<String>),
    /// Documents containing the terms at consecutive positions, in order.
    Phrase(Vec<String>),
    /// Documents where some `greater` term occurs more often than every `lesser` term.
    Threshold { greater: Vec<String>, lesser: Vec<String> },
}

impl MatchQuery {
    /// Split a term stream at the first [`THRESHOLD_SEPARATOR`]. Terms before it
    /// form the greater group, terms after it the lesser group; repeated
    /// separators are dropped.
    pub fn threshold_from_terms<S: AsRef<str>>(terms: &[S]) -> Self {
        let mut greater = Vec::new();
        let mut lesser = Vec::new();
        let mut seen_separator = false;
        for term in terms.iter().map(|t| t.as_ref()) {
            if term == THRESHOLD_SEPARATOR {
                seen_separator = true;
            } else if seen_separator {
                lesser.push(term.to_string());
            } else {
                greater.push(term.to_string());
            }
        }
        MatchQuery::Threshold { greater, lesser }
    }

    pub fn execute(&self, store: &IndexStore) -> BTreeSet<DocId> {
        let matches = match self {
            MatchQuery::Terms(terms) => match_any(store, terms),
            MatchQuery::Phrase(terms) => match_phrase(store, terms),
            MatchQuery::Threshold { greater, lesser } => match_threshold(store, greater, lesser),
        };
        tracing::debug!(query = ?self, matches = matches.len(), "match query executed");
        matches
    }
}

/// Run `query` and report matches as sorted, unique scene or play ids.
pub fn run_match(store: &IndexStore, query: &MatchQuery, granularity: Granularity) -> Vec<String> {
    resolve_ids(store, &query.execute(store), granularity)
}

pub fn resolve_ids(store: &IndexStore, docs: &BTreeSet<DocId>, granularity: Granularity) -> Vec<String> {
    let ids: BTreeSet<&str> = docs
        .iter()
        .filter_map(|&doc_id| match granularity {
            Granularity::Scene => store.scene_id(doc_id),
            Granularity::Play => store.play_id(doc_id),
        })
        .collect();
    ids.into_iter().map(str::to_string).collect()
}

fn match_any(store: &IndexStore, terms: &[String]) -> BTreeSet<DocId> {
    terms
        .iter()
        .filter_map(|term| store.index().postings(term))
        .flat_map(PostingsList::doc_ids)
        .collect()
}

fn match_phrase(store: &IndexStore, terms: &[String]) -> BTreeSet<DocId> {
    let mut lists = Vec::with_capacity(terms.len());
    for term in terms {
        match store.index().postings(term) {
            Some(list) => lists.push(list),
            // a missing term can never be part of a match
            None => return BTreeSet::new(),
        }
    }
    let Some((first, rest)) = lists.split_first() else {
        return BTreeSet::new();
    };

    first
        .iter()
        .filter(|&(doc_id, _)| rest.iter().all(|list| list.contains(doc_id)))
        .filter(|&(doc_id, starts)| {
            starts.iter().any(|&start| {
                rest.iter().enumerate().all(|(i, list)| {
                    let wanted = start + i as u32 + 1;
                    list.positions(doc_id)
                        .map_or(false, |positions| positions.binary_search(&wanted).is_ok())
                })
            })
        })
        .map(|(doc_id, _)| doc_id)
        .collect()
}

fn match_threshold(store: &IndexStore, greater: &[String], lesser: &[String]) -> BTreeSet<DocId> {
    let mut max_greater: BTreeMap<DocId, u32> = BTreeMap::new();
    for list in greater.iter().filter_map(|term| store.index().postings(term)) {
        for (doc_id, positions) in list.iter() {
            let freq = positions.len() as u32;
            let entry = max_greater.entry(doc_id).or_insert(0);
            *entry = (*entry).max(freq);
        }
    }

    let lesser_lists: Vec<&PostingsList> =
        lesser.iter().filter_map(|term| store.index().postings(term)).collect();

    max_greater
        .into_iter()
        .filter(|&(doc_id, max_freq)| {
            lesser_lists.iter().all(|list| list.frequency_in(doc_id) < max_freq)
        })
        .map(|(doc_id, _)| doc_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::SceneRecord;

    fn store() -> IndexStore {
        IndexStore::from_records(vec![
            SceneRecord::new("hamlet", "hamlet:3.1", 0, "to be or not to be"),
            SceneRecord::new("lear", "lear:1.1", 1, "the king"),
            SceneRecord::new("lear", "lear:1.2", 2, "the king the fool the king"),
            SceneRecord::new("hamlet", "hamlet:1.1", 3, "be to the ghost"),
        ])
        .unwrap()
    }

    fn words(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    fn docs(ids: &[DocId]) -> BTreeSet<DocId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn disjunctive_match_unions_postings() {
        let s = store();
        assert_eq!(MatchQuery::Terms(words(&["to", "fool"])).execute(&s), docs(&[0, 2, 3]));
        assert_eq!(MatchQuery::Terms(words(&["queen"])).execute(&s), docs(&[]));
        assert_eq!(MatchQuery::Terms(words(&["queen", "ghost"])).execute(&s), docs(&[3]));
    }

    #[test]
    fn phrase_requires_consecutive_positions_in_order() {
        let s = store();
        assert_eq!(MatchQuery::Phrase(words(&["to", "be"])).execute(&s), docs(&[0]));
        assert_eq!(MatchQuery::Phrase(words(&["be", "to"])).execute(&s), docs(&[3]));
        assert_eq!(MatchQuery::Phrase(words(&["not", "to", "be"])).execute(&s), docs(&[0]));
        assert_eq!(MatchQuery::Phrase(words(&["to", "the", "king"])).execute(&s), docs(&[]));
        assert_eq!(MatchQuery::Phrase(words(&["the", "queen"])).execute(&s), docs(&[]));
        assert_eq!(MatchQuery::Phrase(Vec::new()).execute(&s), docs(&[]));
    }

    #[test]
    fn single_term_phrase_equals_term_match() {
        let s = store();
        for term in ["to", "the", "king", "ghost", "queen"] {
            assert_eq!(
                MatchQuery::Phrase(words(&[term])).execute(&s),
                MatchQuery::Terms(words(&[term])).execute(&s),
            );
        }
    }

    #[test]
    fn threshold_compares_group_frequencies() {
        let s = store();
        // doc1: the=1 king=1 -> excluded; doc2: the=3 king=2 -> kept; doc3: the=1, no king -> kept
        let q = MatchQuery::threshold_from_terms(&["the", "-gt", "king"]);
        assert_eq!(q.execute(&s), docs(&[2, 3]));

        // greater group uses its max: doc2 has king=2 the=3, so fool=1 stays below
        let q = MatchQuery::threshold_from_terms(&["king", "the", "-gt", "fool"]);
        assert_eq!(q.execute(&s), docs(&[1, 2, 3]));

        let q = MatchQuery::threshold_from_terms(&["king", "-gt", "fool"]);
        assert_eq!(q.execute(&s), docs(&[1, 2]));

        let q = MatchQuery::threshold_from_terms(&["fool", "-gt", "king"]);
        assert_eq!(q.execute(&s), docs(&[]));
    }

    #[test]
    fn threshold_without_lesser_group_keeps_every_greater_doc() {
        let s = store();
        let q = MatchQuery::threshold_from_terms(&["be"]);
        assert_eq!(q, MatchQuery::Threshold { greater: words(&["be"]), lesser: vec![] });
        assert_eq!(q.execute(&s), docs(&[0, 3]));
    }

    #[test]
    fn threshold_ignores_absent_terms() {
        let s = store();
        let q = MatchQuery::threshold_from_terms(&["ghost", "-gt", "queen", "-gt"]);
        assert_eq!(q, MatchQuery::Threshold { greater: words(&["ghost"]), lesser: words(&["queen"]) });
        assert_eq!(q.execute(&s), docs(&[3]));
        let q = MatchQuery::threshold_from_terms(&["queen", "-gt", "ghost"]);
        assert_eq!(q.execute(&s), docs(&[]));
    }

    #[test]
    fn ids_are_sorted_and_deduplicated() {
        let s = store();
        let q = MatchQuery::Terms(words(&["the"]));
        assert_eq!(run_match(&s, &q, Granularity::Scene), vec!["hamlet:1.1", "lear:1.1", "lear:1.2"]);
        assert_eq!(run_match(&s, &q, Granularity::Play), vec!["hamlet", "lear"]);
    }
}
