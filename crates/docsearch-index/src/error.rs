//! Index error types.

use thiserror::Error;

/// Errors surfaced by index queries and document sources.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index has not been built (or holds no entries) yet
    #[error("Search index is not ready")]
    NotReady,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document source failure
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Errors produced while turning one file into a document record.
#[derive(Debug, Error)]
pub enum SourceError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Frontmatter block was present but not parseable
    #[error("Invalid frontmatter in {path}: {message}")]
    Frontmatter { path: String, message: String },

    /// File lies outside the documentation root
    #[error("Path {0} is not under the documentation root")]
    OutsideRoot(String),
}
