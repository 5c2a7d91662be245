//! Error types for the feedback loop.

/// A feedback operation failed.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    /// The backing feedback log failed.
    #[error(transparent)]
    Storage(#[from] vigil_storage::StorageError),
}

/// Result alias for feedback operations.
pub type FeedbackResult<T> = Result<T, FeedbackError>;
