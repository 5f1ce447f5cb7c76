//! docsearch
//!
//! Keyword search over a local tree of `.mdx` documentation pages.
//!
//! # Usage
//!
//! ```bash
//! docsearch search "camera permissions" [--section sdk] [-n 10]
//! docsearch get /sdk/camera
//! docsearch sections [section]
//! docsearch api-reference expo-camera [--version v54.0.0]
//! docsearch quick-start [topic]
//! docsearch build
//! docsearch cache-status
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/docsearch/config.toml)
//! 3. Environment variables (DOCSEARCH_*)
//! 4. CLI flags

use anyhow::{Context, Result};

use docsearch_cli::{init_tracing, load_settings, Cli, DocsApp};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let settings = load_settings(&cli)?;
    init_tracing(&settings.log_level)?;

    let app = DocsApp::new(settings);
    let response = app.dispatch(cli.command).await?;

    let output =
        serde_json::to_string_pretty(&response.body).context("Failed to serialize response")?;
    println!("{}", output);

    if response.is_error {
        std::process::exit(1);
    }
    Ok(())
}
