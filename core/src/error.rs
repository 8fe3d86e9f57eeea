pub type Result<T> = std::result::Result<T, SearchError>;

/// Failures surfaced by building or querying an index.
///
/// All of these are caller-recoverable; none of them poison shared state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The document collection handed to the builder is empty or malformed.
    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),

    /// A caller broke the contract of an operation, e.g. asked for zero results.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Ranking was attempted before any index was built or published.
    #[error("index is empty: no documents have been indexed")]
    EmptyIndex,
}
