//! Command implementations for the docsearch binary.
//!
//! Every query command first makes sure the index is built (memory, cache
//! or a fresh walk of the docs tree) and then answers from the in-memory
//! index. Handlers return a [`Response`] whose body is printed as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docsearch_index::{
    BuildOutcome, DiskCache, IndexBuilder, IndexError, IndexStore, MdxDocumentSource,
    QueryEngine, SnapshotCache, SCHEMA_VERSION,
};
use docsearch_types::{DocumentRecord, Settings};

use crate::cli::{Cli, Commands};

/// SDK version used by `api-reference` when none is given.
pub const DEFAULT_SDK_VERSION: &str = "v54.0.0";

/// Characters of content shown per search result.
pub const EXCERPT_CHARS: usize = 250;

/// Results requested when suggesting modules for a missing reference page.
const SUGGESTION_SEARCH_SIZE: usize = 5;
const MAX_SUGGESTIONS: usize = 3;

pub const NOT_READY_MESSAGE: &str = "Search index is not ready yet. Please wait.";

/// JSON body plus whether it describes a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub body: Value,
    pub is_error: bool,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self {
            body,
            is_error: false,
        }
    }

    pub fn error(body: Value) -> Self {
        Self {
            body,
            is_error: true,
        }
    }

    fn not_ready() -> Self {
        Self::error(json!({ "error": NOT_READY_MESSAGE }))
    }

    fn index_error(err: IndexError) -> Self {
        match err {
            IndexError::NotReady => Self::not_ready(),
            other => Self::error(json!({ "error": other.to_string() })),
        }
    }
}

/// Load settings and apply the global CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(docs_path) = &cli.docs_path {
        settings.docs_path = docs_path.clone();
    }
    if let Some(cache_dir) = &cli.cache_dir {
        settings.cache_dir = cache_dir.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global tracing subscriber. Logs go to stderr; stdout carries JSON.
pub fn init_tracing(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Wiring of store, builder, cache and query engine for one process.
pub struct DocsApp {
    settings: Settings,
    cache: Arc<DiskCache>,
    builder: IndexBuilder,
    queries: QueryEngine,
}

impl DocsApp {
    pub fn new(settings: Settings) -> Self {
        let store = Arc::new(IndexStore::new());
        let source = Arc::new(MdxDocumentSource::new(settings.expanded_docs_path()));
        let cache = Arc::new(DiskCache::with_schema_version(
            settings.expanded_cache_dir(),
            settings.cache_max_age_ms,
        ));
        let builder = IndexBuilder::with_cache(
            Arc::clone(&store),
            source,
            Arc::clone(&cache) as Arc<dyn SnapshotCache>,
        );
        let queries = QueryEngine::new(store);

        Self {
            settings,
            cache,
            builder,
            queries,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn ensure_index(&self) -> BuildOutcome {
        self.builder.build().await
    }

    /// Run one command to completion.
    pub async fn dispatch(&self, command: Commands) -> Result<Response> {
        let response = match command {
            Commands::Build => {
                let outcome = self.ensure_index().await;
                let cache = Arc::clone(&self.cache);
                let cache_valid = tokio::task::spawn_blocking(move || cache.is_valid())
                    .await
                    .context("Cache validation task failed")?;
                build_report(&outcome, cache_valid)
            }
            Commands::CacheStatus => {
                let cache = Arc::clone(&self.cache);
                let status = tokio::task::spawn_blocking(move || cache.inspect())
                    .await
                    .context("Cache inspection task failed")?;
                Response::ok(
                    serde_json::to_value(&status).context("Failed to serialize cache status")?,
                )
            }
            Commands::Search {
                query,
                section,
                max_results,
            } => {
                if query.trim().is_empty() {
                    return Ok(empty_search());
                }
                self.ensure_index().await;
                let max = max_results.unwrap_or(self.settings.max_results);
                handle_search(&self.queries, &query, section.as_deref(), max)
            }
            Commands::Get { path } => {
                self.ensure_index().await;
                handle_get(&self.queries, &path)
            }
            Commands::Sections { section } => {
                self.ensure_index().await;
                handle_sections(&self.queries, section.as_deref())
            }
            Commands::ApiReference { module, version } => {
                self.ensure_index().await;
                handle_api_reference(&self.queries, &module, &version)
            }
            Commands::QuickStart { topic } => {
                self.ensure_index().await;
                handle_quick_start(&self.queries, topic.as_deref())
            }
        };
        Ok(response)
    }
}

fn empty_search() -> Response {
    Response::ok(json!({ "results": [] }))
}

fn summary(doc: &DocumentRecord) -> Value {
    json!({
        "title": doc.title,
        "path": doc.path,
        "description": doc.description,
    })
}

fn search_hit(doc: &DocumentRecord) -> Value {
    json!({
        "title": doc.title,
        "path": doc.path,
        "description": doc.description,
        "excerpt": doc.excerpt(EXCERPT_CHARS),
        "score": doc.score,
    })
}

/// Ranked search, optionally narrowed to one section after truncation.
pub fn handle_search(
    engine: &QueryEngine,
    query: &str,
    section: Option<&str>,
    max_results: usize,
) -> Response {
    let query = query.trim();
    if query.is_empty() {
        return empty_search();
    }

    let results = match section {
        Some(section) => engine.search_in_section(query, section, max_results),
        None => engine.search(query, max_results),
    };
    match results {
        Ok(results) => {
            let hits: Vec<Value> = results.iter().map(search_hit).collect();
            Response::ok(json!({
                "query": query,
                "total": hits.len(),
                "results": hits,
            }))
        }
        Err(IndexError::NotReady) => {
            Response::error(json!({ "error": NOT_READY_MESSAGE, "results": [] }))
        }
        Err(e) => Response::index_error(e),
    }
}

pub fn handle_get(engine: &QueryEngine, path: &str) -> Response {
    if path.trim().is_empty() {
        return Response::error(json!({ "error": "path is required" }));
    }

    match engine.get_by_path(path) {
        Ok(Some(doc)) => Response::ok(json!({
            "title": doc.title,
            "description": doc.description,
            "content": doc.content,
            "path": doc.path,
            "metadata": doc.metadata,
        })),
        Ok(None) => Response::error(json!({
            "error": format!("Document not found at path: {}", path),
            "suggestion": "Try `docsearch search` to find the right path",
        })),
        Err(e) => Response::index_error(e),
    }
}

pub fn handle_sections(engine: &QueryEngine, section: Option<&str>) -> Response {
    match section {
        Some(section) => match engine.list_by_section(section) {
            Ok(docs) => {
                let documents: Vec<Value> = docs.iter().map(summary).collect();
                Response::ok(json!({
                    "section": section,
                    "total": documents.len(),
                    "documents": documents,
                }))
            }
            Err(e) => Response::index_error(e),
        },
        None => match engine.list_sections() {
            Ok(sections) => Response::ok(json!({
                "total": sections.len(),
                "sections": sections,
            })),
            Err(e) => Response::index_error(e),
        },
    }
}

/// Path of a module's SDK reference page for `version`.
pub fn api_reference_path(module: &str, version: &str) -> String {
    let module = module.strip_prefix("expo-").unwrap_or(module);
    format!("/versions/{}/sdk/{}", version, module)
}

pub fn handle_api_reference(engine: &QueryEngine, module: &str, version: &str) -> Response {
    if module.trim().is_empty() {
        return Response::error(json!({ "error": "module is required" }));
    }

    let module_name = module.strip_prefix("expo-").unwrap_or(module);
    let api_path = api_reference_path(module, version);

    match engine.get_by_path(&api_path) {
        Ok(Some(doc)) => Response::ok(json!({
            "module": module_name,
            "title": doc.title,
            "description": doc.description,
            "content": doc.content,
            "path": doc.path,
            "metadata": doc.metadata,
        })),
        Ok(None) => {
            let candidates = match engine.search(module, SUGGESTION_SEARCH_SIZE) {
                Ok(results) => results,
                Err(e) => return Response::index_error(e),
            };
            let sdk_results: Vec<&DocumentRecord> = candidates
                .iter()
                .filter(|doc| doc.path.contains("/sdk/"))
                .collect();

            let suggestion = if sdk_results.is_empty() {
                "Try `docsearch search` to find the module".to_string()
            } else {
                let lines: Vec<String> = sdk_results
                    .iter()
                    .map(|doc| format!("- {} ({})", doc.title, doc.path))
                    .collect();
                format!("Did you mean one of these?\n{}", lines.join("\n"))
            };
            let search_results: Vec<Value> = sdk_results
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(|doc| search_hit(doc))
                .collect();

            Response::error(json!({
                "error": format!("API reference not found at: {}", api_path),
                "suggestion": suggestion,
                "searchResults": search_results,
            }))
        }
        Err(e) => Response::index_error(e),
    }
}

pub fn handle_quick_start(engine: &QueryEngine, topic: Option<&str>) -> Response {
    let topic = topic.unwrap_or("introduction");
    let path = format!("/get-started/{}", topic);

    match engine.get_by_path(&path) {
        Ok(Some(doc)) => Response::ok(json!({
            "title": doc.title,
            "description": doc.description,
            "content": doc.content,
            "path": doc.path,
        })),
        Ok(None) => {
            let available = match engine.list_by_section("get-started") {
                Ok(docs) => docs.iter().map(summary).collect::<Vec<_>>(),
                Err(e) => return Response::index_error(e),
            };
            Response::error(json!({
                "error": format!("Quick start topic not found: {}", topic),
                "availableTopics": available,
            }))
        }
        Err(e) => Response::index_error(e),
    }
}

/// Summary of a build for the `build` command.
pub fn build_report(outcome: &BuildOutcome, cache_valid: bool) -> Response {
    info!(
        origin = %outcome.origin,
        entries = outcome.len(),
        "Index available"
    );
    let body = json!({
        "origin": outcome.origin,
        "entries": outcome.len(),
        "elapsedMs": outcome.elapsed_ms,
        "stats": outcome.stats,
        "cacheValid": cache_valid,
        "schemaVersion": SCHEMA_VERSION,
    });
    if outcome.is_empty() {
        Response::error(json!({
            "error": "No documents were indexed",
            "build": body,
        }))
    } else {
        Response::ok(body)
    }
}
