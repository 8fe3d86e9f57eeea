use crate::error::{Result, SearchError};
use crate::index::Index;
use crate::vector::SparseVector;
use crate::{DocId, TermId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Number of results returned when the caller does not ask for a specific count.
pub const DEFAULT_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub document_id: DocId,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankOptions {
    pub k: usize,
    /// Drop results scoring below this. `None` keeps zero-score documents
    /// so that `k` results come back whenever the corpus has them.
    pub min_score: Option<f32>,
}

impl Default for RankOptions {
    fn default() -> Self { Self { k: DEFAULT_K, min_score: None } }
}

impl RankOptions {
    pub fn top(k: usize) -> Self { Self { k, ..Self::default() } }
}

/// Score ordering: higher score first, then lower document id.
fn by_score_then_id(a: &RankedResult, b: &RankedResult) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.document_id.cmp(&b.document_id))
}

impl Index {
    /// Project a query into this index's vocabulary as a unit tf-idf vector.
    ///
    /// Out-of-vocabulary terms are dropped; if none remain the vector is zero.
    pub fn query_vector(&self, query: &str) -> SparseVector {
        let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
        for term in self.normalizer.normalize(query) {
            if let Some(tid) = self.term_id(&term) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }
        SparseVector::tfidf(&counts, &self.idf)
    }

    /// Top `k` documents by cosine similarity to `query`.
    pub fn rank(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
        self.rank_with(query, RankOptions::top(k))
    }

    pub fn rank_with(&self, query: &str, opts: RankOptions) -> Result<Vec<RankedResult>> {
        if opts.k == 0 {
            return Err(SearchError::InvalidArgument("k must be positive".into()));
        }
        if self.is_empty() {
            return Err(SearchError::EmptyIndex);
        }

        let q = self.query_vector(query);
        let mut scores = vec![0.0f32; self.documents.len()];
        for &(tid, qw) in q.entries() {
            for p in &self.postings[tid as usize] {
                scores[p.doc as usize] += qw * p.weight;
            }
        }
        tracing::debug!(query, query_terms = q.entries().len(), k = opts.k, "ranking");

        let mut scored: Vec<RankedResult> = self
            .documents
            .iter()
            .zip(scores)
            // float error can push a perfect match a hair above 1
            .map(|(doc, score)| RankedResult { document_id: doc.id, score: score.clamp(0.0, 1.0) })
            .filter(|r| opts.min_score.map_or(true, |min| r.score >= min))
            .collect();

        let k = opts.k.min(scored.len());
        if k < scored.len() {
            scored.select_nth_unstable_by(k, by_score_then_id);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_score_then_id);
        Ok(scored)
    }
}

/// Rank `query` against `index` and return at most `k` results.
pub fn rank(index: &Index, query: &str, k: usize) -> Result<Vec<RankedResult>> {
    index.rank(query, k)
}
