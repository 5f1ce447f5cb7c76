//! Configuration loading for docsearch.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config dir>/docsearch/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::DocsError;

/// Default number of ranked results returned by a search.
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Default maximum age of the on-disk index snapshot (24 hours).
pub const DEFAULT_CACHE_MAX_AGE_MS: u64 = 86_400_000;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory of the documentation tree to index
    #[serde(default = "default_docs_path")]
    pub docs_path: String,

    /// Directory holding the index snapshot file
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Default truncation for ranked searches
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Maximum snapshot age in milliseconds before it is rebuilt
    #[serde(default = "default_cache_max_age_ms")]
    pub cache_max_age_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_docs_path() -> String {
    "./docs".to_string()
}

fn default_cache_dir() -> String {
    ProjectDirs::from("", "", "docsearch")
        .map(|p| p.cache_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./.docsearch-cache"))
        .to_string_lossy()
        .to_string()
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_cache_max_age_ms() -> u64 {
    DEFAULT_CACHE_MAX_AGE_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            docs_path: default_docs_path(),
            cache_dir: default_cache_dir(),
            max_results: default_max_results(),
            cache_max_age_ms: default_cache_max_age_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/docsearch/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (DOCSEARCH_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, DocsError> {
        let config_dir = ProjectDirs::from("", "", "docsearch")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("docs_path", default_docs_path())
            .map_err(|e| DocsError::Config(e.to_string()))?
            .set_default("cache_dir", default_cache_dir())
            .map_err(|e| DocsError::Config(e.to_string()))?
            .set_default("max_results", default_max_results() as i64)
            .map_err(|e| DocsError::Config(e.to_string()))?
            .set_default("cache_max_age_ms", default_cache_max_age_ms() as i64)
            .map_err(|e| DocsError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| DocsError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // DOCSEARCH_DOCS_PATH, DOCSEARCH_CACHE_DIR, DOCSEARCH_MAX_RESULTS, ...
        builder = builder.add_source(Environment::with_prefix("DOCSEARCH").try_parsing(true));

        let config = builder
            .build()
            .map_err(|e| DocsError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| DocsError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), DocsError> {
        if self.docs_path.trim().is_empty() {
            return Err(DocsError::InvalidInput(
                "docs_path must not be empty".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(DocsError::InvalidInput(
                "max_results must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Docs root with a leading `~/` expanded.
    pub fn expanded_docs_path(&self) -> PathBuf {
        expand_home(&self.docs_path)
    }

    /// Cache directory with a leading `~/` expanded.
    pub fn expanded_cache_dir(&self) -> PathBuf {
        expand_home(&self.cache_dir)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
