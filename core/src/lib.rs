//! TF-IDF similarity search over a fixed collection of short documents.
//!
//! Text goes through a [`Normalizer`], the corpus is turned into an
//! [`Index`] once, and queries are answered by cosine similarity against it.

pub mod chat;
pub mod document;
pub mod error;
pub mod handle;
pub mod index;
pub mod lemmatizer;
pub mod normalizer;
pub mod persist;
pub mod rank;
pub mod stats;
pub mod vector;

pub type TermId = u32;
pub type DocId = u32;

pub use document::{ingest, Corpus, DocMeta, Document, TextField};
pub use error::{Result, SearchError};
pub use handle::IndexHandle;
pub use index::{Index, IndexBuilder};
pub use normalizer::{Normalizer, NormalizerConfig, Stopwords, TermReducer};
pub use rank::{RankOptions, RankedResult, DEFAULT_K};
pub use stats::CorpusStats;

/// Build an index over `documents` with the default normalizer.
pub fn build_index(documents: Vec<Document>) -> Result<Index> {
    Index::build(documents)
}

/// Top `k` documents for `query_text`, best first, ties by ascending id.
pub fn rank(index: &Index, query_text: &str, k: usize) -> Result<Vec<RankedResult>> {
    rank::rank(index, query_text, k)
}
