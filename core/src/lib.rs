//! In-memory positional index over a corpus of play scenes, with boolean
//! match queries, BM25 / query-likelihood ranking and run evaluation.

pub mod config;
pub mod corpus;
pub mod error;
pub mod eval;
pub mod index;
pub mod output;
pub mod query;
pub mod rank;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
pub use index::{DocId, InvertedIndex, Position, PostingsList};
pub use stats::{CorpusSummary, Document, DocumentStats};
pub use store::IndexStore;
