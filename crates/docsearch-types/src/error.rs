//! Error types shared across docsearch crates.

use thiserror::Error;

/// Unified error type for settings and model operations.
#[derive(Debug, Error)]
pub enum DocsError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
