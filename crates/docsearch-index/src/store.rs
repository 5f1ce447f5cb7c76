//! Live index state.
//!
//! `IndexStore` owns the current generation of entries and the readiness
//! flag. A new generation is published by swapping an `Arc` under a write
//! lock, so readers holding an older `Arc` keep a consistent view and never
//! observe a partially populated sequence.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use docsearch_types::DocumentRecord;

#[derive(Debug, Default)]
struct StoreState {
    entries: Arc<Vec<DocumentRecord>>,
    ready: bool,
}

/// Holder of the published index snapshot.
#[derive(Debug, Default)]
pub struct IndexStore {
    state: RwLock<StoreState>,
}

impl IndexStore {
    /// Create an empty, not-ready store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entries. The returned view is never mutated.
    pub fn get(&self) -> Arc<Vec<DocumentRecord>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&state.entries)
    }

    /// Current entries together with the readiness flag, read atomically.
    pub fn snapshot(&self) -> (Arc<Vec<DocumentRecord>>, bool) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (Arc::clone(&state.entries), state.ready)
    }

    /// Publish a new generation and mark the store ready.
    pub fn replace(&self, entries: impl Into<Arc<Vec<DocumentRecord>>>) {
        let entries = entries.into();
        let count = entries.len();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.entries = entries;
        state.ready = true;
        debug!(entries = count, "Published index generation");
    }

    pub fn is_ready(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ready
    }

    pub fn size(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Reset to empty and not ready.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = StoreState::default();
        debug!("Cleared index store");
    }
}
