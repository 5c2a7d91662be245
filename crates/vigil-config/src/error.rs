//! Configuration errors.

use std::path::PathBuf;

/// Errors raised while loading or validating the rule document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The rule file could not be read.
    #[error("cannot read rule file {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The rule file (or embedded defaults) is not valid TOML.
    #[error("malformed rule document {path}: {source}")]
    Parse {
        /// The file that failed, or `<embedded defaults>`.
        path: String,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// The merged document failed a semantic check.
    #[error("invalid rule document: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
