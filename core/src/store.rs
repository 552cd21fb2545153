use crate::index::{DocId, InvertedIndex};
use crate::stats::{CorpusSummary, Document, DocumentStats};

/// The positional index and document statistics built from one corpus.
/// Constructed once by the corpus loader, read-only afterwards.
#[derive(Debug, Default)]
pub struct IndexStore {
    pub(crate) index: InvertedIndex,
    pub(crate) stats: DocumentStats,
}

impl IndexStore {
    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn stats(&self) -> &DocumentStats { &self.stats }

    pub fn num_docs(&self) -> usize { self.stats.len() }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> { self.stats.document(doc_id) }

    pub fn scene_id(&self, doc_id: DocId) -> Option<&str> {
        self.document(doc_id).map(|d| d.scene_id.as_str())
    }

    pub fn play_id(&self, doc_id: DocId) -> Option<&str> {
        self.document(doc_id).map(|d| d.play_id.as_str())
    }

    pub fn doc_length(&self, doc_id: DocId) -> Option<u32> { self.stats.scene_length(doc_id) }

    pub fn summary(&self) -> CorpusSummary {
        CorpusSummary {
            num_docs: self.stats.len(),
            num_plays: self.stats.play_lengths().len(),
            vocabulary_size: self.index.vocabulary_size(),
            collection_length: self.index.collection_length(),
            avg_scene_length: self.stats.average_scene_length(),
            shortest_scene: self.stats.shortest_scene(),
            longest_scene: self.stats.longest_scene(),
            avg_play_length: self.stats.average_play_length(),
            shortest_play: self.stats.shortest_play(),
            longest_play: self.stats.longest_play(),
        }
    }
}
