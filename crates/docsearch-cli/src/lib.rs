//! docsearch library exports.
//!
//! This crate provides the `docsearch` binary.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Settings and tracing setup, index wiring and JSON handlers

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{
    api_reference_path, build_report, handle_api_reference, handle_get, handle_quick_start,
    handle_search, handle_sections, init_tracing, load_settings, DocsApp, Response,
    DEFAULT_SDK_VERSION, EXCERPT_CHARS, NOT_READY_MESSAGE,
};
