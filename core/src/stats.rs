use crate::error::{Error, Result};
use crate::index::DocId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One scene of a play. `length` is its token count (the scene length).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocId,
    pub scene_id: String,
    pub play_id: String,
    pub length: u32,
}

/// Dense document table plus running play lengths.
#[derive(Debug, Default)]
pub struct DocumentStats {
    documents: Vec<Document>,
    play_lengths: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthExtreme {
    pub id: String,
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusSummary {
    pub num_docs: usize,
    pub num_plays: usize,
    pub vocabulary_size: usize,
    pub collection_length: u64,
    pub avg_scene_length: f64,
    pub shortest_scene: Option<LengthExtreme>,
    pub longest_scene: Option<LengthExtreme>,
    pub avg_play_length: f64,
    pub shortest_play: Option<LengthExtreme>,
    pub longest_play: Option<LengthExtreme>,
}

impl DocumentStats {
    pub fn new() -> Self { Self::default() }

    /// Append a document; its id must equal the number of documents already held.
    pub fn push(&mut self, document: Document) -> Result<()> {
        let expected = self.documents.len() as DocId;
        if document.id != expected {
            return Err(Error::NonContiguousDocId { expected, found: document.id as i64 });
        }
        *self.play_lengths.entry(document.play_id.clone()).or_insert(0) += document.length as u64;
        self.documents.push(document);
        Ok(())
    }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> { self.documents.get(doc_id as usize) }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn scene_length(&self, doc_id: DocId) -> Option<u32> { self.document(doc_id).map(|d| d.length) }

    pub fn play_length(&self, play_id: &str) -> Option<u64> { self.play_lengths.get(play_id).copied() }

    pub fn play_lengths(&self) -> &BTreeMap<String, u64> { &self.play_lengths }

    pub fn average_scene_length(&self) -> f64 {
        if self.documents.is_empty() {
            return 0.0;
        }
        let total: u64 = self.documents.iter().map(|d| d.length as u64).sum();
        total as f64 / self.documents.len() as f64
    }

    pub fn average_play_length(&self) -> f64 {
        if self.play_lengths.is_empty() {
            return 0.0;
        }
        let total: u64 = self.play_lengths.values().sum();
        total as f64 / self.play_lengths.len() as f64
    }

    pub fn shortest_scene(&self) -> Option<LengthExtreme> {
        extreme(self.scene_entries(), Ordering::Less)
    }

    pub fn longest_scene(&self) -> Option<LengthExtreme> {
        extreme(self.scene_entries(), Ordering::Greater)
    }

    pub fn shortest_play(&self) -> Option<LengthExtreme> {
        extreme(self.play_entries(), Ordering::Less)
    }

    pub fn longest_play(&self) -> Option<LengthExtreme> {
        extreme(self.play_entries(), Ordering::Greater)
    }

    fn scene_entries(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.documents.iter().map(|d| (d.scene_id.as_str(), d.length as u64))
    }

    fn play_entries(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.play_lengths.iter().map(|(id, &len)| (id.as_str(), len))
    }
}

// Picks the entry whose length compares as `want` against all others;
// equal lengths resolve to the smallest id.
fn extreme<'a>(entries: impl Iterator<Item = (&'a str, u64)>, want: Ordering) -> Option<LengthExtreme> {
    let mut best: Option<(&str, u64)> = None;
    for (id, length) in entries {
        best = match best {
            None => Some((id, length)),
            Some((best_id, best_len)) => {
                let cmp = length.cmp(&best_len);
                if cmp == want || (cmp == Ordering::Equal && id < best_id) {
                    Some((id, length))
                } else {
                    Some((best_id, best_len))
                }
            }
        };
    }
    best.map(|(id, length)| LengthExtreme { id: id.to_string(), length })
}
