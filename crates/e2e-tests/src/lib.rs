//! End-to-end test infrastructure for docsearch.
//!
//! Provides a shared TestHarness over a temporary documentation tree and
//! cache directory, plus a source wrapper that counts rebuild passes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docsearch_index::{
    DiskCache, DocumentSource, IndexBuilder, IndexStore, MdxDocumentSource, QueryEngine,
    SourceError, SCHEMA_VERSION,
};
use docsearch_types::{DocumentRecord, Settings};

/// Pages written by [`TestHarness::with_sample_docs`].
pub const SAMPLE_DOCS: &[(&str, &str)] = &[
    (
        "get-started/introduction.mdx",
        "---\ntitle: Introduction\ndescription: Build apps with one codebase\n---\n\nWelcome to the framework. Start with [creating a project](/get-started/create-a-project).\n",
    ),
    (
        "get-started/create-a-project.mdx",
        "---\ntitle: Create a project\n---\n\nRun the project generator.\n\n```sh\nnpx create-app my-app\n```\n",
    ),
    (
        "versions/v54.0.0/sdk/camera.mdx",
        "---\ntitle: Camera\ndescription: A React component that renders a camera preview\npackageName: expo-camera\n---\n\nimport APISection from '~/components/APISection';\n\nThe camera module needs permissions before use.\n\n<APISection packageName=\"expo-camera\" />\n",
    ),
    (
        "versions/v54.0.0/sdk/audio.mdx",
        "---\ntitle: Audio\n---\n\nPlay and record audio. Recording requires microphone permissions.\n",
    ),
    (
        "guides/permissions.mdx",
        "---\ntitle: Permissions\ndescription: Request camera and location access\n---\n\nAsk for permissions at runtime. The camera and the microphone each need a prompt.\n",
    ),
    (
        "guides/routing.mdx",
        "Routing with file-based routes. <!-- draft --> Each file becomes a route.\n",
    ),
];

/// Shared test harness for E2E tests.
///
/// Owns a docs root and a cache directory inside one temp dir.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub docs_path: PathBuf,
    pub cache_dir: PathBuf,
}

impl TestHarness {
    /// Empty docs tree.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let docs_path = temp_dir.path().join("docs");
        let cache_dir = temp_dir.path().join("cache");
        fs::create_dir_all(&docs_path).expect("Failed to create docs dir");

        Self {
            _temp_dir: temp_dir,
            docs_path,
            cache_dir,
        }
    }

    /// Docs tree populated with [`SAMPLE_DOCS`].
    pub fn with_sample_docs() -> Self {
        let harness = Self::new();
        for (relative, content) in SAMPLE_DOCS {
            harness.write_doc(relative, content);
        }
        harness
    }

    pub fn write_doc(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.docs_path.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create doc dir");
        }
        fs::write(&path, content).expect("Failed to write doc");
        path
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(docsearch_index::INDEX_FILE_NAME)
    }

    pub fn source(&self) -> Arc<CountingSource> {
        Arc::new(CountingSource::new(MdxDocumentSource::new(&self.docs_path)))
    }

    pub fn cache(&self, max_age_ms: u64) -> Arc<DiskCache> {
        Arc::new(DiskCache::new(&self.cache_dir, max_age_ms, SCHEMA_VERSION))
    }

    /// Fresh store, builder with a disk cache and query engine over the harness dirs.
    pub fn stack(&self, source: Arc<CountingSource>) -> Stack {
        self.stack_with_cache(source, self.cache(docsearch_types::DEFAULT_CACHE_MAX_AGE_MS))
    }

    pub fn stack_with_cache(&self, source: Arc<CountingSource>, cache: Arc<DiskCache>) -> Stack {
        let store = Arc::new(IndexStore::new());
        let builder = IndexBuilder::with_cache(Arc::clone(&store), source, cache);
        Stack {
            queries: QueryEngine::new(Arc::clone(&store)),
            store,
            builder,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            docs_path: self.docs_path.to_string_lossy().to_string(),
            cache_dir: self.cache_dir.to_string_lossy().to_string(),
            ..Settings::default()
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Store, builder and query engine sharing one index.
pub struct Stack {
    pub store: Arc<IndexStore>,
    pub builder: IndexBuilder,
    pub queries: QueryEngine,
}

/// Document source that counts how often the tree is walked.
pub struct CountingSource {
    inner: MdxDocumentSource,
    walks: AtomicUsize,
}

impl CountingSource {
    pub fn new(inner: MdxDocumentSource) -> Self {
        Self {
            inner,
            walks: AtomicUsize::new(0),
        }
    }

    pub fn walks(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }

    pub fn root(&self) -> &Path {
        self.inner.root()
    }
}

impl DocumentSource for CountingSource {
    fn list_documents(&self) -> Vec<PathBuf> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        self.inner.list_documents()
    }

    fn parse_document(&self, path: &Path) -> Result<DocumentRecord, SourceError> {
        self.inner.parse_document(path)
    }
}
