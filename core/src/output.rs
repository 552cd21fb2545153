//! Writers for match lists and TREC-style run files.
//!
//! Run line format: `queryId skip sceneId rank score runTag`, ranks 1-based,
//! one block per query in the order the queries were ranked. Scores are
//! written in shortest round-trip form so distinct scores never print alike.

use crate::error::{Error, Result};
use crate::rank::RankedList;
use crate::store::IndexStore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_matches<W: Write>(mut w: W, ids: &[String]) -> std::io::Result<()> {
    for id in ids {
        writeln!(w, "{id}")?;
    }
    w.flush()
}

pub fn write_run<W: Write>(mut w: W, store: &IndexStore, runs: &[RankedList], run_tag: &str) -> std::io::Result<()> {
    for run in runs {
        for (rank, hit) in run.results.iter().enumerate() {
            let scene_id = store.scene_id(hit.doc_id).unwrap_or_default();
            writeln!(w, "{} skip {} {} {} {}", run.query_id, scene_id, rank + 1, hit.score, run_tag)?;
        }
    }
    w.flush()
}

/// Write the match list to `path`, replacing any previous content.
pub fn save_matches<P: AsRef<Path>>(path: P, ids: &[String]) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).map_err(|e| Error::io(path, e))?;
    write_matches(BufWriter::new(f), ids).map_err(|e| Error::io(path, e))?;
    tracing::info!(path = %path.display(), matches = ids.len(), "match list written");
    Ok(())
}

/// Write a complete run file to `path`, replacing any previous content.
pub fn save_run<P: AsRef<Path>>(path: P, store: &IndexStore, runs: &[RankedList], run_tag: &str) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).map_err(|e| Error::io(path, e))?;
    write_run(BufWriter::new(f), store, runs, run_tag).map_err(|e| Error::io(path, e))?;
    tracing::info!(path = %path.display(), queries = runs.len(), run_tag, "run file written");
    Ok(())
}
