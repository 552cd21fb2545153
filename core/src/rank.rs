//! Probabilistic ranking: BM25 and Dirichlet-smoothed query likelihood.
//!
//! Both models score every document that contains at least one query term and
//! return the documents by descending score. Ties are broken by ascending
//! document id so identical input always produces identical runs.

use crate::config::RankingQuery;
use crate::error::{Error, Result};
use crate::index::DocId;
use crate::store::IndexStore;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f64,
    /// Query term frequency saturation.
    pub k2: f64,
    /// Document length normalization, 0 disables it.
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.2, k2: 100.0, b: 0.75 } }
}

impl Bm25Params {
    pub fn validate(&self) -> Result<()> {
        check_finite("k1", self.k1)?;
        check_finite("k2", self.k2)?;
        check_finite("b", self.b)?;
        if self.k1 < 0.0 {
            return Err(Error::InvalidParameter { name: "k1", value: self.k1, reason: "must be >= 0" });
        }
        if self.k2 < 0.0 {
            return Err(Error::InvalidParameter { name: "k2", value: self.k2, reason: "must be >= 0" });
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::InvalidParameter { name: "b", value: self.b, reason: "must be within [0, 1]" });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirichletParams {
    pub mu: f64,
}

impl Default for DirichletParams {
    fn default() -> Self { Self { mu: 2000.0 } }
}

impl DirichletParams {
    pub fn validate(&self) -> Result<()> {
        check_finite("mu", self.mu)?;
        if self.mu <= 0.0 {
            return Err(Error::InvalidParameter { name: "mu", value: self.mu, reason: "must be > 0" });
        }
        Ok(())
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value, reason: "must be finite" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankingModel {
    Bm25(Bm25Params),
    QueryLikelihood(DirichletParams),
}

impl RankingModel {
    pub fn validate(&self) -> Result<()> {
        match self {
            RankingModel::Bm25(p) => p.validate(),
            RankingModel::QueryLikelihood(p) => p.validate(),
        }
    }

    /// Run tag naming the model and its parameters, e.g. `bard_BM-1.200000-100.000000-0.750000`.
    pub fn run_tag(&self, base: &str) -> String {
        match self {
            RankingModel::Bm25(p) => format!("{base}_BM-{:.6}-{:.6}-{:.6}", p.k1, p.k2, p.b),
            RankingModel::QueryLikelihood(p) => format!("{base}_QL-{:.6}", p.mu),
        }
    }

    pub fn default_output(&self) -> &'static str {
        match self {
            RankingModel::Bm25(_) => "bm25.trecrun",
            RankingModel::QueryLikelihood(_) => "ql.trecrun",
        }
    }

    pub fn score(&self, store: &IndexStore, terms: &[String]) -> HashMap<DocId, f64> {
        match self {
            RankingModel::Bm25(p) => bm25_scores(store, terms, p),
            RankingModel::QueryLikelihood(p) => ql_scores(store, terms, p),
        }
    }

    pub fn rank(&self, store: &IndexStore, terms: &[String]) -> Vec<ScoredDoc> {
        sort_scores(self.score(store, terms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Ranked documents for one query, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedList {
    pub query_id: String,
    pub results: Vec<ScoredDoc>,
}

/// Rank every query independently, preserving the supplied order.
pub fn rank_queries(store: &IndexStore, model: &RankingModel, queries: &[RankingQuery]) -> Vec<RankedList> {
    queries
        .iter()
        .map(|query| {
            let results = model.rank(store, &query.terms);
            if results.is_empty() {
                tracing::warn!(query = %query.id, "query produced no candidates");
            } else {
                tracing::debug!(query = %query.id, hits = results.len(), "query ranked");
            }
            RankedList { query_id: query.id.clone(), results }
        })
        .collect()
}

/// BM25 contribution of one term in one document.
///
/// `fi` is the term's frequency in the document and `qf` its frequency in the query.
pub fn bm25_term_weight(params: &Bm25Params, idf: f64, fi: f64, qf: f64, doc_len: f64, avdl: f64) -> f64 {
    let k = params.k1 * ((1.0 - params.b) + params.b * (doc_len / avdl));
    idf * (fi * (params.k1 + 1.0) / (k + fi)) * (qf * (params.k2 + 1.0) / (params.k2 + qf))
}

pub fn bm25_idf(num_docs: f64, doc_freq: f64) -> f64 {
    ((num_docs - doc_freq + 0.5) / (doc_freq + 0.5)).ln()
}

fn bm25_scores(store: &IndexStore, terms: &[String], params: &Bm25Params) -> HashMap<DocId, f64> {
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    let n = store.num_docs() as f64;
    let avdl = store.stats().average_scene_length();
    if n == 0.0 || avdl <= 0.0 {
        return scores;
    }

    // every occurrence contributes, each weighted by the term's full query frequency
    for term in terms {
        let Some(postings) = store.index().postings(term) else {
            continue;
        };
        let qf = terms.iter().filter(|t| *t == term).count() as f64;
        let idf = bm25_idf(n, postings.document_frequency() as f64);

        for (doc_id, positions) in postings.iter() {
            let doc_len = store.doc_length(doc_id).unwrap_or(0) as f64;
            let fi = positions.len() as f64;
            *scores.entry(doc_id).or_insert(0.0) += bm25_term_weight(params, idf, fi, qf, doc_len, avdl);
        }
    }
    scores
}

fn ql_scores(store: &IndexStore, terms: &[String], params: &DirichletParams) -> HashMap<DocId, f64> {
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    let collection_len = store.index().collection_length() as f64;
    if collection_len == 0.0 {
        return scores;
    }

    let candidates: BTreeSet<DocId> = terms
        .iter()
        .filter_map(|t| store.index().postings(t))
        .flat_map(|p| p.doc_ids())
        .collect();

    for term in terms {
        // a term missing from the collection has zero probability in every
        // candidate and cannot change their order
        let Some(postings) = store.index().postings(term) else {
            tracing::debug!(term = %term, "query term not in vocabulary");
            continue;
        };
        let background = params.mu * postings.term_frequency() as f64 / collection_len;

        for &doc_id in &candidates {
            let doc_len = store.doc_length(doc_id).unwrap_or(0) as f64;
            let fqid = postings.frequency_in(doc_id) as f64;
            *scores.entry(doc_id).or_insert(0.0) += ((fqid + background) / (doc_len + params.mu)).ln();
        }
    }
    scores
}

fn sort_scores(scores: HashMap<DocId, f64>) -> Vec<ScoredDoc> {
    let mut ranked: Vec<ScoredDoc> = scores.into_iter().map(|(doc_id, score)| ScoredDoc { doc_id, score }).collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
    ranked
}
