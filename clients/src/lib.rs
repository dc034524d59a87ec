//! Setup shared by the motif client binaries.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::Path;

use anyhow::{Context, Result};
use motif_site::ProjectConfig;
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins; otherwise `info`, or
/// `debug` when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

/// Project configuration discovered from the current directory, with
/// defaults when no config file exists.
///
/// # Errors
///
/// Returns an error if the working directory is unavailable or a config file
/// exists but cannot be parsed.
pub fn project() -> Result<ProjectConfig> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    project_from(&cwd)
}

/// Like [`project`], starting from `start`.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be parsed.
pub fn project_from(start: &Path) -> Result<ProjectConfig> {
    ProjectConfig::discover_or_default(start)
        .with_context(|| format!("Failed to load project config from {}", start.display()))
}
