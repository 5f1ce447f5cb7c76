//! Error path E2E tests for docsearch.
//!
//! Broken caches, unreadable pages and empty trees degrade to a rebuild or
//! a not-ready index. Nothing here may panic.

use std::fs;

use pretty_assertions::assert_eq;

use docsearch_cli::{Commands, DocsApp, NOT_READY_MESSAGE};
use docsearch_index::{BuildOrigin, IndexError, SnapshotCache};
use e2e_tests::{TestHarness, SAMPLE_DOCS};

/// A corrupt snapshot file is treated as a miss and rewritten.
#[tokio::test]
async fn test_corrupt_cache_falls_back_to_rebuild() {
    let harness = TestHarness::with_sample_docs();
    fs::create_dir_all(&harness.cache_dir).unwrap();
    fs::write(harness.cache_file(), "{ not json").unwrap();

    let source = harness.source();
    let stack = harness.stack(source.clone());
    let outcome = stack.builder.build().await;

    assert_eq!(outcome.origin, BuildOrigin::Rebuild);
    assert_eq!(source.walks(), 1);
    assert!(harness.cache(60_000).is_valid());
}

/// A page that cannot be read is skipped; the rest are indexed.
#[tokio::test]
async fn test_unreadable_page_is_skipped() {
    let harness = TestHarness::with_sample_docs();
    let broken = harness.docs_path.join("guides/broken.mdx");
    fs::write(&broken, [0xff, 0xfe, 0x00, 0x80]).unwrap();

    let stack = harness.stack(harness.source());
    let outcome = stack.builder.build().await;

    assert_eq!(outcome.len(), SAMPLE_DOCS.len());
    let stats = outcome.stats.unwrap();
    assert_eq!(stats.files_found, SAMPLE_DOCS.len() + 1);
    assert_eq!(stats.failed, 1);
    assert!(stack.queries.get_by_path("/guides/broken").unwrap().is_none());
}

/// An empty tree leaves the index not ready and writes no snapshot.
#[tokio::test]
async fn test_empty_tree_is_not_ready() {
    let harness = TestHarness::new();
    let stack = harness.stack(harness.source());
    let outcome = stack.builder.build().await;

    assert_eq!(outcome.origin, BuildOrigin::Empty);
    assert!(!stack.store.is_ready());
    assert!(matches!(
        stack.queries.search("camera", 10),
        Err(IndexError::NotReady)
    ));
    assert!(!harness.cache_file().exists());
}

/// A missing docs root behaves like an empty tree.
#[tokio::test]
async fn test_missing_docs_root() {
    let harness = TestHarness::new();
    fs::remove_dir_all(&harness.docs_path).unwrap();

    let source = harness.source();
    assert!(!source.root().exists());
    let stack = harness.stack(source.clone());

    assert_eq!(stack.builder.build().await.origin, BuildOrigin::Empty);
    assert_eq!(source.walks(), 1);
}

/// Commands against an empty tree answer with the not-ready error.
#[tokio::test]
async fn test_commands_report_not_ready() {
    let harness = TestHarness::new();
    let app = DocsApp::new(harness.settings());

    let response = app.dispatch(Commands::Sections { section: None }).await.unwrap();
    assert!(response.is_error);
    assert_eq!(response.body["error"], NOT_READY_MESSAGE);

    let response = app.dispatch(Commands::Build).await.unwrap();
    assert!(response.is_error);
    assert_eq!(response.body["build"]["origin"], "empty");

    // Empty queries short-circuit before the index is consulted
    let response = app
        .dispatch(Commands::Search {
            query: "  ".to_string(),
            section: None,
            max_results: None,
        })
        .await
        .unwrap();
    assert!(!response.is_error);
    assert_eq!(response.body, serde_json::json!({ "results": [] }));
}
