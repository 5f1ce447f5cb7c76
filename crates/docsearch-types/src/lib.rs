//! # docsearch-types
//!
//! Shared domain types for docsearch.
//!
//! - [`DocumentRecord`]: one parsed documentation page
//! - [`Settings`]: layered configuration
//! - [`DocsError`]: configuration and model errors

pub mod config;
pub mod document;
pub mod error;

pub use config::{Settings, DEFAULT_CACHE_MAX_AGE_MS, DEFAULT_MAX_RESULTS};
pub use document::{DocumentRecord, Metadata};
pub use error::DocsError;
