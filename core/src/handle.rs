use crate::document::Document;
use crate::error::{Result, SearchError};
use crate::index::{Index, IndexBuilder};
use crate::rank::{RankOptions, RankedResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// Slot holding the currently published value, typically an [`Index`].
///
/// Readers take a cheap `Arc` clone and work lock-free afterwards. A new value
/// is fully built before `publish` swaps it in, so nobody observes a partial one.
#[derive(Debug)]
pub struct IndexHandle<T = Index> {
    current: RwLock<Option<Arc<T>>>,
}

impl<T> Default for IndexHandle<T> {
    fn default() -> Self { Self { current: RwLock::new(None) } }
}

impl<T> IndexHandle<T> {
    pub fn new() -> Self { Self::default() }

    pub fn with(value: T) -> Self { Self { current: RwLock::new(Some(Arc::new(value))) } }

    /// Replace the published value, returning the previous one.
    pub fn publish(&self, value: T) -> Option<Arc<T>> {
        let next = Arc::new(value);
        self.current.write().replace(next)
    }

    pub fn current(&self) -> Option<Arc<T>> { self.current.read().clone() }

    pub fn is_published(&self) -> bool { self.current.read().is_some() }
}

impl<T: AsRef<Index>> IndexHandle<T> {
    /// Rank against whatever is published right now.
    pub fn rank_with(&self, query: &str, opts: RankOptions) -> Result<Vec<RankedResult>> {
        let snapshot = self.current().ok_or(SearchError::EmptyIndex)?;
        let index: &Index = (*snapshot).as_ref();
        index.rank_with(query, opts)
    }

    pub fn rank(&self, query: &str, k: usize) -> Result<Vec<RankedResult>> {
        self.rank_with(query, RankOptions::top(k))
    }
}

impl IndexHandle<Index> {
    /// Build a fresh index and publish it only if the build succeeds.
    pub fn rebuild(&self, builder: &IndexBuilder, documents: Vec<Document>) -> Result<()> {
        let index = builder.build(documents)?;
        self.publish(index);
        Ok(())
    }
}

impl AsRef<Index> for Index {
    fn as_ref(&self) -> &Index { self }
}
