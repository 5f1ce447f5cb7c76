//! Indexed document records.
//!
//! A `DocumentRecord` is one parsed documentation page as held by the index.
//! Records are produced by a document source, owned by the index store once
//! published, and cloned out (with a score) by ranking queries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary structured attributes taken from a page's frontmatter.
pub type Metadata = Map<String, Value>;

/// A single documentation page in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    /// Page title (frontmatter `title` or derived from the filename)
    pub title: String,

    /// Short description from frontmatter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Normalized plain text with markup stripped
    #[serde(default)]
    pub content: String,

    /// Canonical URL-style path, e.g. `/sdk/camera`
    pub path: String,

    /// Back-reference to the file the record was parsed from
    #[serde(default)]
    pub source_location: String,

    /// Frontmatter attributes (platforms, packageName, ...)
    #[serde(default)]
    pub metadata: Metadata,

    /// Relevance score, only set on query results
    #[serde(skip)]
    pub score: Option<u64>,
}

impl DocumentRecord {
    /// Create a record with empty content and metadata.
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            content: String::new(),
            path: path.into(),
            source_location: String::new(),
            metadata: Metadata::new(),
            score: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_source_location(mut self, source_location: impl Into<String>) -> Self {
        self.source_location = source_location.into();
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Copy of this record carrying the given score.
    pub fn scored(&self, score: u64) -> Self {
        Self {
            score: Some(score),
            ..self.clone()
        }
    }

    /// First non-empty segment of the path, if any.
    pub fn section(&self) -> Option<&str> {
        self.path.split('/').find(|segment| !segment.is_empty())
    }

    /// Leading slice of the content, suffixed with an ellipsis when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let mut chars = self.content.char_indices();
        match chars.nth(max_chars) {
            Some((cut, _)) => format!("{}…", &self.content[..cut]),
            None => self.content.clone(),
        }
    }
}
