//! Error types for the approval engine.

use vigil_core::RequestId;

/// An engine operation failed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The request id is not tracked by this engine.
    #[error("unknown request {id}")]
    UnknownRequest {
        /// The unrecognized id.
        id: RequestId,
    },

    /// The requested status change is not allowed by the state machine.
    ///
    /// Typically a late or duplicate resolution racing the timeout path;
    /// the stored decision stands.
    #[error(transparent)]
    InvalidTransition(#[from] vigil_core::InvalidTransition),

    /// The history store failed.
    #[error(transparent)]
    Storage(#[from] vigil_storage::StorageError),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
