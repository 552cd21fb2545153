//! Retrieval quality metrics over a run file and a qrels file.
//!
//! Qrels lines are `queryId iteration docId grade`; a document is relevant to
//! a query when its grade is above zero. Run lines are the ones produced by
//! [`crate::output::write_run`].
//!
//! NDCG uses linear gain with the first rank undiscounted and rank `i >= 2`
//! discounted by `log2(i)`.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;

/// How much of a ranking average precision looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApCutoff {
    /// The whole ranked list.
    Full,
    /// Only the top `k` entries.
    At(usize),
}

/// Relevant documents per query, with their grades.
#[derive(Debug, Default)]
pub struct Qrels {
    by_query: HashMap<String, HashMap<String, u32>>,
}

impl Qrels {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut qrels = Qrels::default();
        for (line_no, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let [query_id, _iteration, doc_id, grade] = fields[..] else {
                return Err(malformed(path, line_no, format!("expected 4 fields, found {}", fields.len())));
            };
            let grade: i64 = grade
                .parse()
                .map_err(|_| malformed(path, line_no, format!("invalid relevance grade {grade:?}")))?;
            let judged = qrels.by_query.entry(query_id.to_string()).or_default();
            if grade > 0 {
                judged.insert(doc_id.to_string(), grade as u32);
            }
        }
        Ok(qrels)
    }

    /// Relevant documents for `query_id`, `None` when the query was never judged.
    pub fn relevant(&self, query_id: &str) -> Option<&HashMap<String, u32>> { self.by_query.get(query_id) }
}

/// Ranked document ids per query, in rank order.
#[derive(Debug, Default)]
pub struct Run {
    by_query: BTreeMap<String, Vec<String>>,
}

impl Run {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let mut entries: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();
        for (line_no, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let [query_id, _skip, doc_id, rank, score, _tag] = fields[..] else {
                return Err(malformed(path, line_no, format!("expected 6 fields, found {}", fields.len())));
            };
            let rank: usize = rank
                .parse()
                .map_err(|_| malformed(path, line_no, format!("invalid rank {rank:?}")))?;
            score
                .parse::<f64>()
                .map_err(|_| malformed(path, line_no, format!("invalid score {score:?}")))?;
            entries.entry(query_id.to_string()).or_default().push((rank, doc_id.to_string()));
        }

        let by_query = entries
            .into_iter()
            .map(|(query_id, mut ranked)| {
                ranked.sort_by_key(|(rank, _)| *rank);
                (query_id, ranked.into_iter().map(|(_, doc_id)| doc_id).collect())
            })
            .collect();
        Ok(Run { by_query })
    }

    pub fn num_queries(&self) -> usize { self.by_query.len() }

    pub fn ranking(&self, query_id: &str) -> Option<&[String]> { self.by_query.get(query_id).map(Vec::as_slice) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> + '_ {
        self.by_query.iter().map(|(q, docs)| (q.as_str(), docs.as_slice()))
    }
}

fn malformed(path: &Path, line_no: usize, reason: String) -> Error {
    Error::MalformedLine { path: path.to_path_buf(), line: line_no + 1, reason }
}

pub fn ndcg_at(ranked: &[String], relevant: &HashMap<String, u32>, k: usize) -> f64 {
    let k = k.min(ranked.len());
    let actual = dcg(ranked.iter().take(k).map(|doc| relevant.get(doc).copied().unwrap_or(0)));

    let mut ideal: Vec<u32> = relevant.values().copied().collect();
    ideal.sort_unstable_by(|a, b| b.cmp(a));
    let idcg = dcg(ideal.into_iter().take(k));

    if idcg == 0.0 {
        0.0
    } else {
        actual / idcg
    }
}

fn dcg(grades: impl Iterator<Item = u32>) -> f64 {
    grades
        .enumerate()
        .map(|(i, grade)| if i == 0 { grade as f64 } else { grade as f64 / ((i + 1) as f64).log2() })
        .sum()
}

pub fn reciprocal_rank(ranked: &[String], relevant: &HashMap<String, u32>) -> f64 {
    ranked
        .iter()
        .position(|doc| relevant.contains_key(doc))
        .map_or(0.0, |i| 1.0 / (i + 1) as f64)
}

/// Fraction of the top `k` positions holding a relevant document.
pub fn precision_at(ranked: &[String], relevant: &HashMap<String, u32>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|doc| relevant.contains_key(*doc)).count();
    hits as f64 / k as f64
}

pub fn recall_at(ranked: &[String], relevant: &HashMap<String, u32>, k: usize) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let hits = ranked.iter().take(k).filter(|doc| relevant.contains_key(*doc)).count();
    hits as f64 / relevant.len() as f64
}

pub fn average_precision(ranked: &[String], relevant: &HashMap<String, u32>, cutoff: ApCutoff) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let depth = match cutoff {
        ApCutoff::Full => ranked.len(),
        ApCutoff::At(k) => k.min(ranked.len()),
    };
    let mut seen = 0usize;
    let mut sum = 0.0;
    for (i, doc) in ranked.iter().take(depth).enumerate() {
        if relevant.contains_key(doc) {
            seen += 1;
            sum += seen as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

pub fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Metrics averaged over every query of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    pub num_queries: usize,
    pub ndcg_10: f64,
    pub mrr: f64,
    pub precision_5: f64,
    pub precision_20: f64,
    pub recall_20: f64,
    pub f1_20: f64,
    pub map: f64,
}

impl RunMetrics {
    pub fn write_report<W: Write>(&self, mut w: W, run_name: &str) -> std::io::Result<()> {
        let rows = [
            ("NDCG", self.ndcg_10),
            ("MRR", self.mrr),
            ("P@5", self.precision_5),
            ("P@20", self.precision_20),
            ("recall@20", self.recall_20),
            ("F1@20", self.f1_20),
            ("MAP", self.map),
        ];
        for (name, value) in rows {
            writeln!(w, "{run_name} {name} {value:.6}")?;
        }
        w.flush()
    }
}

pub fn evaluate(run: &Run, qrels: &Qrels) -> RunMetrics {
    let empty = HashMap::new();
    let mut m = RunMetrics { num_queries: run.num_queries(), ..Default::default() };
    if m.num_queries == 0 {
        return m;
    }

    for (query_id, ranked) in run.iter() {
        let relevant = qrels.relevant(query_id).unwrap_or(&empty);
        if relevant.is_empty() {
            tracing::warn!(query = query_id, "no relevant documents judged for query");
        }
        m.ndcg_10 += ndcg_at(ranked, relevant, 10);
        m.mrr += reciprocal_rank(ranked, relevant);
        m.precision_5 += precision_at(ranked, relevant, 5);
        m.precision_20 += precision_at(ranked, relevant, 20);
        m.recall_20 += recall_at(ranked, relevant, 20);
        m.map += average_precision(ranked, relevant, ApCutoff::Full);
    }

    let n = m.num_queries as f64;
    m.ndcg_10 /= n;
    m.mrr /= n;
    m.precision_5 /= n;
    m.precision_20 /= n;
    m.recall_20 /= n;
    m.map /= n;
    m.f1_20 = f1(m.precision_20, m.recall_20);
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn judged(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
        pairs.iter().map(|(d, g)| (d.to_string(), *g)).collect()
    }

    #[test]
    fn average_precision_respects_cutoff() {
        let r = ranked(&["a", "x", "b", "y", "c"]);
        let rel = judged(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        let full = (1.0 + 2.0 / 3.0 + 3.0 / 5.0) / 4.0;
        assert!((average_precision(&r, &rel, ApCutoff::Full) - full).abs() < 1e-12);
        let top3 = (1.0 + 2.0 / 3.0) / 4.0;
        assert!((average_precision(&r, &rel, ApCutoff::At(3)) - top3).abs() < 1e-12);
        assert_eq!(average_precision(&r, &judged(&[]), ApCutoff::Full), 0.0);
    }

    #[test]
    fn precision_recall_and_rr() {
        let r = ranked(&["x", "a", "y", "b"]);
        let rel = judged(&[("a", 2), ("b", 1), ("c", 1)]);
        assert!((precision_at(&r, &rel, 2) - 0.5).abs() < 1e-12);
        assert!((precision_at(&r, &rel, 5) - 0.4).abs() < 1e-12);
        assert!((recall_at(&r, &rel, 20) - 2.0 / 3.0).abs() < 1e-12);
        assert!((reciprocal_rank(&r, &rel) - 0.5).abs() < 1e-12);
        assert_eq!(reciprocal_rank(&ranked(&["x"]), &rel), 0.0);
        assert_eq!(precision_at(&r, &rel, 0), 0.0);
    }

    #[test]
    fn recall_ignores_hits_below_the_cutoff() {
        let mut docs: Vec<&str> = vec!["x"; 20];
        docs.push("a");
        let rel = judged(&[("a", 1)]);
        assert_eq!(recall_at(&ranked(&docs), &rel, 20), 0.0);
        assert_eq!(recall_at(&ranked(&docs), &rel, 21), 1.0);
    }

    #[test]
    fn ndcg_is_one_for_ideal_ordering() {
        let rel = judged(&[("a", 3), ("b", 2), ("c", 1)]);
        assert!((ndcg_at(&ranked(&["a", "b", "c"]), &rel, 10) - 1.0).abs() < 1e-12);
        let swapped = ndcg_at(&ranked(&["c", "b", "a"]), &rel, 10);
        assert!(swapped < 1.0 && swapped > 0.0);
        assert_eq!(ndcg_at(&ranked(&["a"]), &judged(&[]), 10), 0.0);
    }

    #[test]
    fn ndcg_hand_computed() {
        let rel = judged(&[("a", 2), ("b", 1)]);
        let got = ndcg_at(&ranked(&["b", "a"]), &rel, 10);
        let expected = (1.0 + 2.0 / 2f64.log2()) / (2.0 + 1.0 / 2f64.log2());
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn f1_guards_zero() {
        assert_eq!(f1(0.0, 0.0), 0.0);
        assert!((f1(0.5, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn parses_and_evaluates_files() {
        let qrels = Qrels::parse(
            Path::new("qrels"),
            "Q1 0 lear:1.1 2\nQ1 0 lear:1.2 0\nQ1 0 hamlet:1.1 1\n\nQ2 0 macbeth:1.1 1\n",
        )
        .unwrap();
        assert_eq!(qrels.relevant("Q1").unwrap().len(), 2);

        let run = Run::parse(
            Path::new("run"),
            "Q1 skip hamlet:1.1 2 0.5 t\nQ1 skip lear:1.1 1 0.9 t\nQ2 skip lear:1.2 1 0.3 t\n",
        )
        .unwrap();
        assert_eq!(run.ranking("Q1").unwrap(), &ranked(&["lear:1.1", "hamlet:1.1"])[..]);

        let m = evaluate(&run, &qrels);
        assert_eq!(m.num_queries, 2);
        assert!((m.mrr - 0.5).abs() < 1e-12);
        assert!((m.map - 0.5).abs() < 1e-12);
        assert!((m.ndcg_10 - 0.5).abs() < 1e-12);
        assert!((m.recall_20 - 0.5).abs() < 1e-12);
        assert!((m.precision_5 - 0.2).abs() < 1e-12);

        let mut out = Vec::new();
        m.write_report(&mut out, "bm25.trecrun").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 7);
        assert!(text.starts_with("bm25.trecrun NDCG 0.500000\n"));
        assert!(text.ends_with("bm25.trecrun MAP 0.500000\n"));
    }

    #[test]
    fn malformed_lines_are_reported() {
        let err = Run::parse(Path::new("run"), "Q1 skip doc 1 0.5\n").unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line: 1, .. }));
        let err = Qrels::parse(Path::new("qrels"), "Q1 0 doc 1\nQ1 0 doc high\n").unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn empty_run_has_zero_metrics() {
        let m = evaluate(&Run::default(), &Qrels::default());
        assert_eq!(m, RunMetrics::default());
    }
}
