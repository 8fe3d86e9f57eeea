use crate::document::DocMeta;
use crate::index::Index;
use crate::DocId;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Summary figures for an index and its catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub num_docs: usize,
    pub vocabulary_size: usize,
    pub unique_authors: usize,
    pub unique_publishers: usize,
    /// Smallest and largest publication year among records whose year is a
    /// number. Year `0`, the catalog's marker for an unknown year, counts.
    pub year_range: Option<(i32, i32)>,
}

impl CorpusStats {
    pub fn collect(index: &Index, docs: &HashMap<DocId, DocMeta>) -> Self {
        let authors: HashSet<&str> = docs.values().map(|m| m.author.as_str()).filter(|a| !a.is_empty()).collect();
        let publishers: HashSet<&str> = docs.values().filter_map(|m| m.publisher.as_deref()).collect();
        let years = docs.values().filter_map(|m| m.year.as_deref()?.trim().parse::<i32>().ok());
        let year_range = years.fold(None, |range, y| match range {
            None => Some((y, y)),
            Some((lo, hi)) => Some((y.min(lo), y.max(hi))),
        });
        Self {
            num_docs: index.len(),
            vocabulary_size: index.vocabulary_size(),
            unique_authors: authors.len(),
            unique_publishers: publishers.len(),
            year_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ingest, TextField};
    use serde_json::json;

    fn stats_for(rows: &[serde_json::Value]) -> CorpusStats {
        let corpus = ingest(rows, TextField::TitleAuthor).unwrap();
        let index = Index::build(corpus.documents).unwrap();
        CorpusStats::collect(&index, &corpus.catalog)
    }

    #[test]
    fn counts_authors_publishers_and_years() {
        let stats = stats_for(&[
            json!({"title": "Dune", "author": "Frank Herbert", "year": 1965, "publisher": "Chilton"}),
            json!({"title": "Dune Messiah", "author": "Frank Herbert", "year": "1969", "publisher": "Putnam"}),
            json!({"title": "Emma", "author": "Jane Austen", "year": "unknown"}),
        ]);
        assert_eq!(stats.num_docs, 3);
        assert_eq!(stats.unique_authors, 2);
        assert_eq!(stats.unique_publishers, 2);
        assert_eq!(stats.year_range, Some((1965, 1969)));
    }

    #[test]
    fn year_zero_is_part_of_the_range() {
        let stats = stats_for(&[
            json!({"title": "Dune", "year": 1965}),
            json!({"title": "Untitled", "year": "0"}),
        ]);
        assert_eq!(stats.year_range, Some((0, 1965)));
    }

    #[test]
    fn no_numeric_year_means_no_range() {
        let stats = stats_for(&[json!({"title": "Dune"}), json!({"title": "Emma", "year": "n/a"})]);
        assert_eq!(stats.year_range, None);
    }
}
