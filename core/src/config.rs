//! Ranking run configuration: the query set and the base run tag.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_RUN_TAG: &str = "scenedex";

fn default_run_tag() -> String { DEFAULT_RUN_TAG.to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_run_tag")]
    pub run_tag: String,
    pub queries: Vec<QueryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEntry {
    /// Defaults to `Q<n>` with `n` the 1-based position in the file.
    #[serde(default)]
    pub id: Option<String>,
    pub terms: Vec<String>,
}

/// A validated query ready for ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingQuery {
    pub id: String,
    pub terms: Vec<String>,
}

impl RankingConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| Error::io(path, e))?;
        let config: RankingConfig = serde_json::from_reader(BufReader::new(f))
            .map_err(|source| Error::Parse { path: path.to_path_buf(), source })?;
        tracing::info!(path = %path.display(), queries = config.queries.len(), "ranking config loaded");
        Ok(config)
    }

    /// Resolve ids and reject queries without terms.
    pub fn queries(&self) -> Result<Vec<RankingQuery>> {
        self.queries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let id = entry.id.clone().unwrap_or_else(|| format!("Q{}", i + 1));
                if entry.terms.is_empty() {
                    return Err(Error::EmptyQuery(id));
                }
                Ok(RankingQuery { id, terms: entry.terms.clone() })
            })
            .collect()
    }
}
