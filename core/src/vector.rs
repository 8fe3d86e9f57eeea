use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sparse weight vector over the vocabulary, entries sorted by term id.
///
/// Absent terms have weight 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(TermId, f32)>,
}

impl SparseVector {
    /// Weight raw term counts by `idf` and scale to unit length.
    ///
    /// Yields the zero vector when there are no counts.
    pub fn tfidf(counts: &BTreeMap<TermId, u32>, idf: &[f32]) -> Self {
        let mut entries: Vec<(TermId, f32)> = counts
            .iter()
            .map(|(&tid, &tf)| (tid, tf as f32 * idf[tid as usize]))
            .collect();
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() { *w /= norm; }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(TermId, f32)] { &self.entries }

    pub fn is_zero(&self) -> bool { self.entries.iter().all(|(_, w)| *w == 0.0) }

    pub fn l2_norm(&self) -> f32 { self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt() }

    pub fn max_term(&self) -> Option<TermId> { self.entries.last().map(|(t, _)| *t) }

    /// Dot product by merging the two sorted entry lists.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0f32);
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tfidf_is_unit_length() {
        let counts: BTreeMap<TermId, u32> = [(0, 2), (2, 1)].into_iter().collect();
        let v = SparseVector::tfidf(&counts, &[1.5, 1.0, 2.0]);
        assert!((v.l2_norm() - 1.0).abs() < 1e-6);
        assert!((v.dot(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_counts_give_zero_vector() {
        let v = SparseVector::tfidf(&BTreeMap::new(), &[1.0]);
        assert!(v.is_zero());
        assert_eq!(v.l2_norm(), 0.0);
    }

    #[test]
    fn dot_skips_disjoint_terms() {
        let a = SparseVector::tfidf(&[(0, 1)].into_iter().collect(), &[1.0, 1.0]);
        let b = SparseVector::tfidf(&[(1, 1)].into_iter().collect(), &[1.0, 1.0]);
        assert_eq!(a.dot(&b), 0.0);
    }
}
