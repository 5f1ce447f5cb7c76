//! Read-only lookups over the published index.
//!
//! The free functions work on any slice of entries; [`QueryEngine`] applies
//! them to the current [`IndexStore`] generation and reports
//! [`IndexError::NotReady`] until a build has published one.

use std::sync::Arc;

use serde::Serialize;

use docsearch_types::DocumentRecord;

use crate::error::IndexError;
use crate::ranking::RankingEngine;
use crate::store::IndexStore;

/// Document count for one top-level section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub count: usize,
    pub path: String,
}

/// First entry whose path matches `path`, tolerating a leading slash
/// omission and a single trailing slash on either side.
pub fn find_by_path<'a>(entries: &'a [DocumentRecord], path: &str) -> Option<&'a DocumentRecord> {
    let normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    let without_slash = normalized.strip_suffix('/').unwrap_or(&normalized);

    entries.iter().find(|entry| {
        entry.path == normalized
            || entry.path == without_slash
            || entry.path.strip_suffix('/') == Some(normalized.as_str())
    })
}

/// Sections by descending document count; ties keep first-seen order.
pub fn sections(entries: &[DocumentRecord]) -> Vec<SectionSummary> {
    let mut summaries: Vec<SectionSummary> = Vec::new();
    for section in entries.iter().filter_map(DocumentRecord::section) {
        match summaries.iter_mut().find(|s| s.name == section) {
            Some(summary) => summary.count += 1,
            None => summaries.push(SectionSummary {
                name: section.to_string(),
                count: 1,
                path: format!("/{}", section),
            }),
        }
    }
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

fn in_section(entry: &DocumentRecord, prefix: &str) -> bool {
    entry.path.to_lowercase().starts_with(prefix)
}

fn section_prefix(section: &str) -> String {
    format!("/{}/", section.to_lowercase())
}

/// Entries whose path starts with `/{section}/`, case-insensitively.
pub fn documents_in_section(entries: &[DocumentRecord], section: &str) -> Vec<DocumentRecord> {
    let prefix = section_prefix(section);
    entries
        .iter()
        .filter(|entry| in_section(entry, &prefix))
        .cloned()
        .collect()
}

/// Query surface over the live index.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<IndexStore>,
    ranking: RankingEngine,
}

impl QueryEngine {
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self::with_ranking(store, RankingEngine::default())
    }

    pub fn with_ranking(store: Arc<IndexStore>, ranking: RankingEngine) -> Self {
        Self { store, ranking }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    fn entries(&self) -> Result<Arc<Vec<DocumentRecord>>, IndexError> {
        let (entries, ready) = self.store.snapshot();
        if ready {
            Ok(entries)
        } else {
            Err(IndexError::NotReady)
        }
    }

    pub fn get_by_path(&self, path: &str) -> Result<Option<DocumentRecord>, IndexError> {
        let entries = self.entries()?;
        Ok(find_by_path(&entries, path).cloned())
    }

    pub fn list_sections(&self) -> Result<Vec<SectionSummary>, IndexError> {
        Ok(sections(&self.entries()?))
    }

    pub fn list_by_section(&self, section: &str) -> Result<Vec<DocumentRecord>, IndexError> {
        Ok(documents_in_section(&self.entries()?, section))
    }

    /// Ranked search over the whole index.
    pub fn search(&self, query: &str, max: usize) -> Result<Vec<DocumentRecord>, IndexError> {
        Ok(self.ranking.rank(&self.entries()?, query, max))
    }

    /// Ranked search whose results are then narrowed to one section.
    ///
    /// The section filter runs after truncation, so fewer than `max`
    /// results may come back even when the section holds more matches.
    pub fn search_in_section(
        &self,
        query: &str,
        section: &str,
        max: usize,
    ) -> Result<Vec<DocumentRecord>, IndexError> {
        let prefix = section_prefix(section);
        let mut results = self.search(query, max)?;
        results.retain(|entry| in_section(entry, &prefix));
        Ok(results)
    }
}
