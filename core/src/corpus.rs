//! Corpus loading: reads the `{"corpus": [...]}` scene file and builds an [`IndexStore`].

use crate::error::{Error, Result};
use crate::index::{DocId, Position};
use crate::stats::Document;
use crate::store::IndexStore;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CorpusFile {
    corpus: Vec<SceneRecord>,
}

/// One entry of the corpus array. `text` is already tokenized and space-delimited.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    pub play_id: String,
    pub scene_id: String,
    pub scene_num: i64,
    pub text: String,
}

impl SceneRecord {
    pub fn new(play_id: &str, scene_id: &str, scene_num: i64, text: &str) -> Self {
        Self { play_id: play_id.into(), scene_id: scene_id.into(), scene_num, text: text.into() }
    }
}

/// Terms of a pre-tokenized text: split on single spaces, empty segments dropped.
pub fn terms(text: &str) -> impl Iterator<Item = &str> {
    text.split(' ').filter(|t| !t.is_empty())
}

impl IndexStore {
    /// Load a corpus file and build the index over it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| Error::io(path, e))?;
        let reader = BufReader::new(f);
        let file: CorpusFile = serde_json::from_reader(reader)
            .map_err(|source| Error::Parse { path: path.to_path_buf(), source })?;
        let store = Self::from_records(file.corpus)?;
        tracing::info!(
            path = %path.display(),
            num_docs = store.num_docs(),
            num_terms = store.index().vocabulary_size(),
            "corpus indexed"
        );
        Ok(store)
    }

    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = SceneRecord>,
    {
        let mut store = IndexStore::default();
        for record in records {
            store.ingest_scene(record)?;
        }
        Ok(store)
    }

    fn ingest_scene(&mut self, record: SceneRecord) -> Result<()> {
        let expected = self.stats.len() as DocId;
        if record.scene_num != expected as i64 {
            return Err(Error::NonContiguousDocId { expected, found: record.scene_num });
        }
        let doc_id = expected;

        let mut pos: Position = 0;
        for term in terms(&record.text) {
            self.index.add_occurrence(term, doc_id, pos);
            pos += 1;
        }

        self.stats.push(Document {
            id: doc_id,
            scene_id: record.scene_id,
            play_id: record.play_id,
            length: pos,
        })
    }
}
