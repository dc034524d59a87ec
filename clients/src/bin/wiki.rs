//! `motif-wiki`: Generates the static wiki described by `wiki.yaml`.
//!
//! **Outputs:**
//! - `<output>/<page>.html`: one file per configured page
//! - `<output>/<slug>/index.html`: per-item detail pages
//! - `<output>/<type>/index.html` and `<output>/<type>/<slug>/index.html`: type indexes
//! - `<output>/search_index.json`: client-side search index
//!
//! **Usage:**
//! ```
//! motif-wiki [--config <path>] [--output <path>]
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use motif_ontology::RdfManager;
use motif_site::{Renderer, RendererOptions};
use motif_wiki::{WikiConfig, WikiGenerator};

/// Generate the motif wiki.
#[derive(Parser)]
#[command(name = "motif-wiki", about = "Generate documentation pages from the ontology")]
struct Args {
    /// Wiki configuration file.
    #[arg(long, default_value = "config/wiki.yaml")]
    config: PathBuf,

    /// Output directory.
    #[arg(long, default_value = "tmp/wiki")]
    output: PathBuf,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    motif_clients::init_tracing(args.verbose);

    if !args.config.is_file() {
        bail!("Config file not found: {}", args.config.display());
    }
    let config_dir = args
        .config
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let start = if config_dir.as_os_str().is_empty() {
        std::env::current_dir().context("Failed to read the working directory")?
    } else {
        config_dir
    };
    let project = motif_clients::project_from(&start)?;
    let config = WikiConfig::load(&args.config)?;

    let rdf = RdfManager::new(project.ttl_dir())
        .with_context(|| format!("Failed to load {}", project.ttl_dir().display()))?;
    let renderer = Renderer::new(RendererOptions::with_dir(project.templates_dir()));
    let mut wiki = WikiGenerator::new(&rdf, config, &project.root, &args.output, renderer)?;
    let summary = wiki.generate_all()?;

    println!(
        "Documentation generated to {} ({} pages, {} detail pages, {} type pages)",
        args.output.display(),
        summary.pages.len(),
        summary.detail_pages,
        summary.type_pages
    );
    Ok(())
}
