use crate::document::Document;
use crate::error::{Result, SearchError};
use crate::normalizer::{Normalizer, NormalizerConfig};
use crate::vector::SparseVector;
use crate::{DocId, TermId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// One entry of a term's postings list: a document position and its
/// normalized tf-idf weight for that term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub doc: u32,
    pub weight: f32,
}

/// Write-once, read-many TF-IDF index over a fixed corpus.
///
/// Holds the normalizer it was built with so queries can never be
/// normalized differently from the documents.
#[derive(Debug)]
pub struct Index {
    pub(crate) normalizer: Arc<Normalizer>,
    pub(crate) vocabulary: HashMap<String, TermId>,
    pub(crate) terms: Vec<String>,
    pub(crate) idf: Vec<f32>,
    pub(crate) documents: Vec<Document>,
    pub(crate) vectors: Vec<SparseVector>,
    pub(crate) postings: Vec<Vec<Posting>>,
    positions: HashMap<DocId, usize>,
}

/// Smoothed idf: `ln((1 + n) / (1 + df)) + 1`.
pub fn smoothed_idf(num_docs: usize, df: u32) -> f32 {
    ((1.0 + num_docs as f32) / (1.0 + df as f32)).ln() + 1.0
}

/// Builds an [`Index`] with a fixed normalizer.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    normalizer: Arc<Normalizer>,
}

impl IndexBuilder {
    pub fn new(normalizer: Arc<Normalizer>) -> Self { Self { normalizer } }

    pub fn with_config(config: NormalizerConfig) -> Self { Self::new(Arc::new(Normalizer::new(config))) }

    /// Normalize every document, assign vocabulary in first-seen order and
    /// weight each document as an L2-normalized tf-idf vector.
    ///
    /// Fails with `InvalidCorpus` on an empty collection or on repeated ids.
    pub fn build(&self, documents: Vec<Document>) -> Result<Index> {
        if documents.is_empty() {
            return Err(SearchError::InvalidCorpus("no documents to index".into()));
        }
        u32::try_from(documents.len())
            .map_err(|_| SearchError::InvalidCorpus(format!("too many documents: {}", documents.len())))?;

        let mut vocabulary: HashMap<String, TermId> = HashMap::new();
        let mut terms: Vec<String> = Vec::new();
        let mut df: Vec<u32> = Vec::new();
        let mut doc_counts: Vec<BTreeMap<TermId, u32>> = Vec::with_capacity(documents.len());
        let mut seen_ids: HashSet<DocId> = HashSet::with_capacity(documents.len());
        let mut normalized_docs = Vec::with_capacity(documents.len());

        for mut doc in documents {
            if !seen_ids.insert(doc.id) {
                return Err(SearchError::InvalidCorpus(format!("duplicate document id {}", doc.id)));
            }
            doc.normalized_terms = self.normalizer.normalize(&doc.raw_text);

            let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
            for term in &doc.normalized_terms {
                let tid = match vocabulary.get(term) {
                    Some(&tid) => tid,
                    None => {
                        let tid = terms.len() as TermId;
                        vocabulary.insert(term.clone(), tid);
                        terms.push(term.clone());
                        df.push(0);
                        tid
                    }
                };
                let tf = counts.entry(tid).or_insert(0);
                if *tf == 0 { df[tid as usize] += 1; }
                *tf += 1;
            }
            if counts.is_empty() {
                tracing::debug!(doc_id = doc.id, "document has no indexable terms");
            }
            doc_counts.push(counts);
            normalized_docs.push(doc);
        }

        let n = normalized_docs.len();
        let idf: Vec<f32> = df.iter().map(|&d| smoothed_idf(n, d)).collect();
        let vectors = doc_counts.iter().map(|counts| SparseVector::tfidf(counts, &idf)).collect();

        tracing::info!(num_docs = n, num_terms = terms.len(), "index built");
        Ok(Index::assemble(self.normalizer.clone(), terms, idf, normalized_docs, vectors))
    }
}

impl Index {
    /// Build with the default normalizer configuration.
    pub fn build(documents: Vec<Document>) -> Result<Index> {
        IndexBuilder::default().build(documents)
    }

    fn assemble(
        normalizer: Arc<Normalizer>,
        terms: Vec<String>,
        idf: Vec<f32>,
        documents: Vec<Document>,
        vectors: Vec<SparseVector>,
    ) -> Index {
        let vocabulary = terms.iter().enumerate().map(|(i, t)| (t.clone(), i as TermId)).collect();
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); terms.len()];
        for (pos, vector) in vectors.iter().enumerate() {
            for &(tid, weight) in vector.entries() {
                postings[tid as usize].push(Posting { doc: pos as u32, weight });
            }
        }
        let positions = documents.iter().enumerate().map(|(pos, d)| (d.id, pos)).collect();
        Index { normalizer, vocabulary, terms, idf, documents, vectors, postings, positions }
    }

    /// Reassemble an index from stored parts, checking that they agree.
    pub(crate) fn from_parts(
        config: NormalizerConfig,
        terms: Vec<String>,
        idf: Vec<f32>,
        documents: Vec<Document>,
        vectors: Vec<SparseVector>,
    ) -> Result<Index> {
        if documents.is_empty() {
            return Err(SearchError::InvalidCorpus("stored index has no documents".into()));
        }
        if idf.len() != terms.len() {
            return Err(SearchError::InvalidCorpus(format!("{} idf weights for {} terms", idf.len(), terms.len())));
        }
        if vectors.len() != documents.len() {
            return Err(SearchError::InvalidCorpus(format!("{} vectors for {} documents", vectors.len(), documents.len())));
        }
        if vectors.iter().filter_map(SparseVector::max_term).any(|t| t as usize >= terms.len()) {
            return Err(SearchError::InvalidCorpus("vector references a term outside the vocabulary".into()));
        }
        let unique: HashSet<&String> = terms.iter().collect();
        if unique.len() != terms.len() {
            return Err(SearchError::InvalidCorpus("vocabulary has repeated terms".into()));
        }
        let ids: HashSet<DocId> = documents.iter().map(|d| d.id).collect();
        if ids.len() != documents.len() {
            return Err(SearchError::InvalidCorpus("stored index has repeated document ids".into()));
        }
        Ok(Index::assemble(Arc::new(Normalizer::new(config)), terms, idf, documents, vectors))
    }

    pub fn normalizer(&self) -> &Normalizer { &self.normalizer }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    pub fn vocabulary_size(&self) -> usize { self.terms.len() }

    pub fn term_id(&self, term: &str) -> Option<TermId> { self.vocabulary.get(term).copied() }

    pub fn idf(&self, term: &str) -> Option<f32> { self.term_id(term).map(|t| self.idf[t as usize]) }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn document(&self, id: DocId) -> Option<&Document> { self.positions.get(&id).map(|&p| &self.documents[p]) }

    pub fn vector(&self, id: DocId) -> Option<&SparseVector> { self.positions.get(&id).map(|&p| &self.vectors[p]) }
}
