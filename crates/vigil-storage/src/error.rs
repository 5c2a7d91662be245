//! Error types for history and feedback persistence.

use std::path::PathBuf;

use vigil_core::RequestId;

/// A storage operation failed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem I/O failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("serialization failed: {source}")]
    Serialize {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A snapshot was appended for a request already in a terminal state.
    ///
    /// Terminal history is immutable; this indicates a logic error or a
    /// racing duplicate resolution upstream.
    #[error("request {id} is already terminal; refusing further history")]
    AlreadyTerminal {
        /// The request whose history is closed.
        id: RequestId,
    },
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
