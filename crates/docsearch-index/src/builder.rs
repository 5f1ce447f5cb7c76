//! Index build orchestration.
//!
//! A build publishes entries into the [`IndexStore`] from the first of:
//! 1. the store itself, when it is already ready and non-empty
//! 2. the snapshot cache, when one is attached and holds a usable snapshot
//! 3. a full pass over the document source, saved back to the cache
//!
//! Builds are single-flight. The first caller spawns the build as a task
//! and installs a shared handle to it in the in-flight slot; callers
//! arriving while it runs await that same handle and receive its outcome
//! instead of starting a second pass. The task runs to completion even if
//! every caller stops waiting.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tracing::{debug, info, warn};

use docsearch_types::DocumentRecord;

use crate::cache::SnapshotCache;
use crate::source::DocumentSource;
use crate::store::IndexStore;

/// Number of parsed files between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// Where the entries of a build came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOrigin {
    /// Store was already populated
    Memory,
    /// Loaded from the snapshot cache
    Cache,
    /// Parsed from the document source
    Rebuild,
    /// Nothing could be produced; the store is not ready
    Empty,
}

impl std::fmt::Display for BuildOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildOrigin::Memory => write!(f, "memory"),
            BuildOrigin::Cache => write!(f, "cache"),
            BuildOrigin::Rebuild => write!(f, "rebuild"),
            BuildOrigin::Empty => write!(f, "empty"),
        }
    }
}

/// Counters for one pass over the document source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildStats {
    pub files_found: usize,
    pub indexed: usize,
    pub failed: usize,
}

impl RebuildStats {
    fn record_indexed(&mut self) {
        self.indexed += 1;
    }

    fn record_failure(&mut self) {
        self.failed += 1;
    }

    fn processed(&self) -> usize {
        self.indexed + self.failed
    }
}

/// Result of a build, shared by every caller that joined it.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub origin: BuildOrigin,
    pub entries: Arc<Vec<DocumentRecord>>,
    /// Present when the document source was walked
    pub stats: Option<RebuildStats>,
    pub elapsed_ms: u64,
}

impl BuildOutcome {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type SharedBuild = Shared<BoxFuture<'static, BuildOutcome>>;

struct BuilderInner {
    store: Arc<IndexStore>,
    source: Arc<dyn DocumentSource>,
    cache: Option<Arc<dyn SnapshotCache>>,
    in_flight: Mutex<Option<SharedBuild>>,
}

/// Produces a ready [`IndexStore`], running at most one build at a time.
#[derive(Clone)]
pub struct IndexBuilder {
    inner: Arc<BuilderInner>,
}

impl IndexBuilder {
    /// Builder without a snapshot cache; every effective build walks the source.
    pub fn new(store: Arc<IndexStore>, source: Arc<dyn DocumentSource>) -> Self {
        Self::from_parts(store, source, None)
    }

    /// Builder that tries `cache` before walking the source and saves rebuilds to it.
    pub fn with_cache(
        store: Arc<IndexStore>,
        source: Arc<dyn DocumentSource>,
        cache: Arc<dyn SnapshotCache>,
    ) -> Self {
        Self::from_parts(store, source, Some(cache))
    }

    fn from_parts(
        store: Arc<IndexStore>,
        source: Arc<dyn DocumentSource>,
        cache: Option<Arc<dyn SnapshotCache>>,
    ) -> Self {
        Self {
            inner: Arc::new(BuilderInner {
                store,
                source,
                cache,
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn store(&self) -> &Arc<IndexStore> {
        &self.inner.store
    }

    /// Whether a build is currently in flight.
    pub fn is_building(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Ensure the store is populated, joining an in-flight build if there is one.
    ///
    /// Never fails: when neither the cache nor the source yields entries the
    /// outcome has origin [`BuildOrigin::Empty`] and the store stays not ready.
    pub async fn build(&self) -> BuildOutcome {
        if let Some(outcome) = self.inner.current() {
            debug!(entries = outcome.len(), "Using existing in-memory index");
            return outcome;
        }

        let build = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(build) => {
                    debug!("Joining in-flight index build");
                    build.clone()
                }
                None => {
                    let build = spawn_build(&self.inner);
                    *slot = Some(build.clone());
                    build
                }
            }
        };

        build.await
    }
}

/// Start `inner.run()` on the runtime and wrap its handle for sharing.
///
/// The shared future owns only the join handle and a weak reference, so an
/// abandoned slot never keeps the builder alive.
fn spawn_build(inner: &Arc<BuilderInner>) -> SharedBuild {
    let handle = tokio::spawn(Arc::clone(inner).run());
    let weak: Weak<BuilderInner> = Arc::downgrade(inner);
    handle
        .map(move |joined| match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Index build task failed");
                match weak.upgrade() {
                    Some(inner) => {
                        inner
                            .in_flight
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .take();
                        BuildOutcome {
                            origin: BuildOrigin::Empty,
                            entries: inner.store.get(),
                            stats: None,
                            elapsed_ms: 0,
                        }
                    }
                    None => BuildOutcome {
                        origin: BuildOrigin::Empty,
                        entries: Arc::new(Vec::new()),
                        stats: None,
                        elapsed_ms: 0,
                    },
                }
            }
        })
        .boxed()
        .shared()
}

impl BuilderInner {
    fn current(&self) -> Option<BuildOutcome> {
        let (entries, ready) = self.store.snapshot();
        if ready && !entries.is_empty() {
            Some(BuildOutcome {
                origin: BuildOrigin::Memory,
                entries,
                stats: None,
                elapsed_ms: 0,
            })
        } else {
            None
        }
    }

    async fn run(self: Arc<Self>) -> BuildOutcome {
        let started = Instant::now();
        let mut outcome = self.produce().await;
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        info!(
            origin = %outcome.origin,
            entries = outcome.len(),
            elapsed_ms = outcome.elapsed_ms,
            "Index build finished"
        );
        outcome
    }

    async fn produce(&self) -> BuildOutcome {
        // A build may have completed between the caller's check and ours.
        if let Some(outcome) = self.current() {
            return outcome;
        }

        if let Some(cache) = &self.cache {
            debug!("Attempting to load index from disk cache");
            let cache = Arc::clone(cache);
            match tokio::task::spawn_blocking(move || cache.load()).await {
                Ok(entries) if !entries.is_empty() => {
                    let entries = Arc::new(entries);
                    self.store.replace(Arc::clone(&entries));
                    return BuildOutcome {
                        origin: BuildOrigin::Cache,
                        entries,
                        stats: None,
                        elapsed_ms: 0,
                    };
                }
                Ok(_) => info!("No cached index found, building from source"),
                Err(e) => warn!(error = %e, "Cache load task failed, building from source"),
            }
        }

        let source = Arc::clone(&self.source);
        let (entries, stats) =
            match tokio::task::spawn_blocking(move || collect_documents(source.as_ref())).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Document collection task failed");
                    (Vec::new(), RebuildStats::default())
                }
            };

        if entries.is_empty() {
            warn!(
                files = stats.files_found,
                failed = stats.failed,
                "No documents indexed, index remains not ready"
            );
            return BuildOutcome {
                origin: BuildOrigin::Empty,
                entries: self.store.get(),
                stats: Some(stats),
                elapsed_ms: 0,
            };
        }

        let entries = Arc::new(entries);
        self.store.replace(Arc::clone(&entries));

        if let Some(cache) = &self.cache {
            let cache = Arc::clone(cache);
            let snapshot = Arc::clone(&entries);
            if let Err(e) = tokio::task::spawn_blocking(move || cache.save(&snapshot)).await {
                warn!(error = %e, "Cache save task failed");
            }
        }

        BuildOutcome {
            origin: BuildOrigin::Rebuild,
            entries,
            stats: Some(stats),
            elapsed_ms: 0,
        }
    }
}

/// Parse every listed document, skipping the ones that fail.
///
/// Output order follows the source's listing order.
pub fn collect_documents(source: &dyn DocumentSource) -> (Vec<DocumentRecord>, RebuildStats) {
    let files = source.list_documents();
    let mut stats = RebuildStats {
        files_found: files.len(),
        ..Default::default()
    };
    info!(files = files.len(), "Building search index from source");

    let mut entries = Vec::with_capacity(files.len());
    for path in &files {
        match source.parse_document(path) {
            Ok(entry) => {
                entries.push(entry);
                stats.record_indexed();
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to parse document, skipping");
                stats.record_failure();
            }
        }
        if stats.processed() % PROGRESS_INTERVAL == 0 {
            debug!(
                processed = stats.processed(),
                total = stats.files_found,
                failed = stats.failed,
                "Rebuild progress"
            );
        }
    }

    (entries, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::cache::DiskCache;
    use crate::error::SourceError;

    /// In-memory source counting how often it is walked.
    struct StubSource {
        docs: Vec<DocumentRecord>,
        failing: Vec<String>,
        delay: Duration,
        list_calls: AtomicUsize,
        parse_calls: AtomicUsize,
    }

    impl StubSource {
        fn new(paths: &[&str]) -> Self {
            Self {
                docs: paths
                    .iter()
                    .map(|p| DocumentRecord::new(format!("Doc {}", p), *p).with_content("body text"))
                    .collect(),
                failing: Vec::new(),
                delay: Duration::ZERO,
                list_calls: AtomicUsize::new(0),
                parse_calls: AtomicUsize::new(0),
            }
        }

        fn failing(mut self, paths: &[&str]) -> Self {
            self.failing = paths.iter().map(|p| p.to_string()).collect();
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn walks(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    impl DocumentSource for StubSource {
        fn list_documents(&self) -> Vec<PathBuf> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.docs.iter().map(|d| PathBuf::from(&d.path)).collect()
        }

        fn parse_document(&self, path: &Path) -> Result<DocumentRecord, SourceError> {
            self.parse_calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            let path = path.to_string_lossy().to_string();
            if self.failing.contains(&path) {
                return Err(SourceError::Frontmatter {
                    path,
                    message: "broken".to_string(),
                });
            }
            self.docs
                .iter()
                .find(|d| d.path == path)
                .cloned()
                .ok_or(SourceError::OutsideRoot(path))
        }
    }

    /// Snapshot cache held in memory.
    #[derive(Default)]
    struct MemoryCache {
        entries: Mutex<Vec<DocumentRecord>>,
        saves: AtomicUsize,
    }

    impl SnapshotCache for MemoryCache {
        fn load(&self) -> Vec<DocumentRecord> {
            self.entries.lock().unwrap().clone()
        }

        fn save(&self, entries: &[DocumentRecord]) {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.entries.lock().unwrap() = entries.to_vec();
        }

        fn is_valid(&self) -> bool {
            !self.entries.lock().unwrap().is_empty()
        }
    }

    #[tokio::test]
    async fn test_rebuild_from_source() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1", "/a/2", "/b/1"]));
        let builder = IndexBuilder::new(store.clone(), source.clone());

        let outcome = builder.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Rebuild);
        assert_eq!(outcome.len(), 3);
        assert_eq!(
            outcome.stats,
            Some(RebuildStats {
                files_found: 3,
                indexed: 3,
                failed: 0
            })
        );
        assert!(store.is_ready());
        assert_eq!(store.get()[1].path, "/a/2");
        assert!(!builder.is_building());
    }

    #[tokio::test]
    async fn test_second_build_is_noop() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1"]));
        let builder = IndexBuilder::new(store, source.clone());

        builder.build().await;
        let outcome = builder.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Memory);
        assert_eq!(source.walks(), 1);
    }

    #[tokio::test]
    async fn test_parse_failures_are_skipped() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1", "/a/2", "/a/3"]).failing(&["/a/2"]));
        let builder = IndexBuilder::new(store.clone(), source);

        let outcome = builder.build().await;
        assert_eq!(outcome.len(), 2);
        assert_eq!(outcome.stats.unwrap().failed, 1);
        let paths: Vec<String> = store.get().iter().map(|d| d.path.clone()).collect();
        assert_eq!(paths, vec!["/a/1", "/a/3"]);
    }

    #[tokio::test]
    async fn test_empty_source_leaves_store_not_ready() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1"]).failing(&["/a/1"]));
        let builder = IndexBuilder::new(store.clone(), source);

        let outcome = builder.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Empty);
        assert!(outcome.is_empty());
        assert!(!store.is_ready());
        assert_eq!(store.size(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_builds_share_one_pass() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(
            StubSource::new(&["/a/1", "/a/2", "/b/1"]).slow(Duration::from_millis(20)),
        );
        let builder = IndexBuilder::new(store.clone(), source.clone());

        let (first, second) = tokio::join!(builder.build(), builder.build());

        assert_eq!(source.walks(), 1);
        assert_eq!(source.parse_calls.load(Ordering::SeqCst), 3);
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        assert_eq!(first.origin, BuildOrigin::Rebuild);
        assert_eq!(second.origin, BuildOrigin::Rebuild);
        assert_eq!(store.size(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_builds_across_tasks() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(
            StubSource::new(&["/a/1", "/a/2"]).slow(Duration::from_millis(25)),
        );
        let builder = IndexBuilder::new(store.clone(), source.clone());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let builder = builder.clone();
                tokio::spawn(async move { builder.build().await.len() })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 2);
        }
        assert_eq!(source.walks(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_source() {
        let cache = Arc::new(MemoryCache::default());
        cache.save(&[DocumentRecord::new("Cached", "/cached/doc")]);

        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1"]));
        let builder = IndexBuilder::with_cache(store.clone(), source.clone(), cache);

        let outcome = builder.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Cache);
        assert_eq!(source.walks(), 0);
        assert_eq!(store.get()[0].path, "/cached/doc");
    }

    #[tokio::test]
    async fn test_rebuild_saves_to_cache() {
        let cache = Arc::new(MemoryCache::default());
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1", "/a/2"]));
        let builder = IndexBuilder::with_cache(store, source, cache.clone());

        let outcome = builder.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Rebuild);
        assert_eq!(cache.saves.load(Ordering::SeqCst), 1);
        assert_eq!(cache.load().len(), 2);
    }

    #[tokio::test]
    async fn test_disk_cache_warm_start() {
        let temp = tempfile::TempDir::new().unwrap();
        let source = Arc::new(StubSource::new(&["/a/1", "/b/1"]));

        let cold = IndexBuilder::with_cache(
            Arc::new(IndexStore::new()),
            source.clone(),
            Arc::new(DiskCache::new(temp.path(), 60_000, "1.0.0")),
        );
        assert_eq!(cold.build().await.origin, BuildOrigin::Rebuild);

        let warm = IndexBuilder::with_cache(
            Arc::new(IndexStore::new()),
            source.clone(),
            Arc::new(DiskCache::new(temp.path(), 60_000, "1.0.0")),
        );
        let outcome = warm.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Cache);
        assert_eq!(outcome.len(), 2);
        assert_eq!(source.walks(), 1);
    }

    #[tokio::test]
    async fn test_clear_then_rebuild() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1"]));
        let builder = IndexBuilder::new(store.clone(), source.clone());

        builder.build().await;
        store.clear();
        assert!(!store.is_ready());

        let outcome = builder.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Rebuild);
        assert_eq!(source.walks(), 2);
        assert!(store.is_ready());
    }

    /// Cache whose directory sits under a regular file, so every write fails.
    fn unwritable_cache(temp: &tempfile::TempDir) -> Arc<DiskCache> {
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        Arc::new(DiskCache::new(blocker.join("cache"), 60_000, "1.0.0"))
    }

    #[tokio::test]
    async fn test_failed_cache_save_still_publishes() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(StubSource::new(&["/a/1", "/a/2"]));
        let builder = IndexBuilder::with_cache(store.clone(), source.clone(), unwritable_cache(&temp));

        let outcome = builder.build().await;
        assert_eq!(outcome.origin, BuildOrigin::Rebuild);
        assert_eq!(outcome.len(), 2);
        assert!(store.is_ready());
        assert_eq!(store.size(), 2);
        assert!(!temp.path().join("blocker").join("cache").exists());

        // Memory still serves later builds
        assert_eq!(builder.build().await.origin, BuildOrigin::Memory);
        assert_eq!(source.walks(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_build_completes_and_releases_builder() {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(
            StubSource::new(&["/a/1", "/a/2"]).slow(Duration::from_millis(50)),
        );
        let builder = IndexBuilder::new(store.clone(), source.clone());

        let waited = tokio::time::timeout(Duration::from_millis(10), builder.build()).await;
        assert!(waited.is_err());
        assert!(builder.is_building());

        let inner = Arc::downgrade(&builder.inner);
        drop(builder);

        for _ in 0..200 {
            if inner.upgrade().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(inner.upgrade().is_none());
        assert!(store.is_ready());
        assert_eq!(store.size(), 2);
        assert_eq!(source.walks(), 1);
    }

    #[test]
    fn test_collect_documents_preserves_order() {
        let source = StubSource::new(&["/z/1", "/a/1", "/m/1"]);
        let (entries, stats) = collect_documents(&source);
        let paths: Vec<&str> = entries.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["/z/1", "/a/1", "/m/1"]);
        assert_eq!(stats.indexed, 3);
    }
}
