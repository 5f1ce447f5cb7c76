//! # docsearch-index
//!
//! In-memory keyword index over a documentation tree.
//!
//! The index is a flat, ordered sequence of [`DocumentRecord`]s held by an
//! [`IndexStore`]. An [`IndexBuilder`] fills the store from a
//! [`DocumentSource`], optionally warm-starting from a [`DiskCache`]
//! snapshot, and guarantees at most one build runs at a time. Lookups and
//! ranked search go through [`QueryEngine`].
//!
//! ## Features
//! - Single-flight builds shared by concurrent callers
//! - Versioned, age-limited JSON snapshot cache
//! - Weighted multi-field ranking with phrase bonuses and whole-word term counts
//! - Section listing and path lookup with slash normalization
//!
//! [`DocumentRecord`]: docsearch_types::DocumentRecord

pub mod builder;
pub mod cache;
pub mod error;
pub mod query;
pub mod ranking;
pub mod source;
pub mod store;

pub use builder::{collect_documents, BuildOrigin, BuildOutcome, IndexBuilder, RebuildStats};
pub use cache::{
    CacheMiss, CacheStatus, DiskCache, IndexSnapshot, SnapshotCache, INDEX_FILE_NAME,
    SCHEMA_VERSION,
};
pub use error::{IndexError, SourceError};
pub use query::{documents_in_section, find_by_path, sections, QueryEngine, SectionSummary};
pub use ranking::{
    count_word_matches, Field, FieldWeight, NormalizedQuery, RankingEngine, ScoringTable,
    DEFAULT_WEIGHTS,
};
pub use source::{
    parse_frontmatter_lines, strip_mdx, DocumentSource, MdxDocumentSource, DEFAULT_EXTENSION,
};
pub use store::IndexStore;
