//! CLI argument parsing for the docsearch binary.
//!
//! Global flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Documentation search
///
/// Indexes a tree of `.mdx` documentation pages and answers keyword queries
/// with JSON on stdout.
#[derive(Parser, Debug)]
#[command(name = "docsearch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/docsearch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override documentation root
    #[arg(long, global = true)]
    pub docs_path: Option<String>,

    /// Override index cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Keyword search across all documents
    Search {
        /// Search query
        query: String,

        /// Only keep results under this top-level section
        #[arg(short, long)]
        section: Option<String>,

        /// Maximum results (default from config)
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
    },

    /// Fetch one document by URL path
    Get {
        /// Document path, e.g. /sdk/camera
        path: String,
    },

    /// List sections, or the documents of one section
    Sections {
        /// Section name
        section: Option<String>,
    },

    /// Fetch the SDK reference page of a module
    ApiReference {
        /// Module name, with or without the `expo-` prefix
        module: String,

        /// SDK version directory
        #[arg(long, default_value = crate::commands::DEFAULT_SDK_VERSION)]
        version: String,
    },

    /// Fetch a getting-started page
    QuickStart {
        /// Topic under /get-started (default: introduction)
        topic: Option<String>,
    },

    /// Build the index, reusing a valid cache
    Build,

    /// Show snapshot cache state
    CacheStatus,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
