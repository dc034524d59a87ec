//! `motif-charts`: Renders Vega-Lite charts from YAML chart configs.
//!
//! **Outputs** (per config, by format):
//! - `<output-dir>/<name>.json`: Vega-Lite spec
//! - `<output-dir>/<name>.html`: standalone chart page
//! - `<output-dir>/<name>.data.json`: raw and transformed rows
//! - `<output-dir>/<name>.png`: via `vl-convert`, when installed
//! - `<output-dir>/index.html` and `<charts-dir>/index.html`: index pages
//!
//! **Usage:**
//! ```
//! motif-charts [--config <file|dir>] [--output-dir <path>] [--output-formats <fmt>...]
//!              [--ttl-dir <path>] [--sparql-dir <path>]
//! ```
//!
//! Unset paths and formats come from the project config.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use motif_charts::{discover_configs, ChartGenerator};
use motif_ontology::RdfManager;
use motif_site::{Renderer, RendererOptions};

/// Generate Vega-Lite charts from SPARQL and YAML configs.
#[derive(Parser)]
#[command(name = "motif-charts", about = "Generate Vega-Lite charts from SPARQL + YAML configs")]
struct Args {
    /// Config file or directory of `*.yaml` configs.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for chart artifacts.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Formats to write: json, html, data, png.
    #[arg(long, num_args = 1..)]
    output_formats: Option<Vec<String>>,

    /// Directory of Turtle files.
    #[arg(long)]
    ttl_dir: Option<PathBuf>,

    /// Directory of SPARQL queries.
    #[arg(long)]
    sparql_dir: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    motif_clients::init_tracing(args.verbose);
    let project = motif_clients::project()?;

    let config = args.config.unwrap_or_else(|| project.charts_config_dir());
    let output_dir = args.output_dir.unwrap_or_else(|| project.figures_dir());
    let formats = args
        .output_formats
        .unwrap_or_else(|| project.charting.output_formats.clone());
    let ttl_dir = args.ttl_dir.unwrap_or_else(|| project.ttl_dir());
    let sparql_dir = args.sparql_dir.unwrap_or_else(|| project.sparql_dir());

    let rdf = RdfManager::new(&ttl_dir)
        .with_context(|| format!("Failed to load {}", ttl_dir.display()))?;
    let renderer = Renderer::new(RendererOptions::with_dir(project.templates_dir()));
    let generator = ChartGenerator::new(&rdf, sparql_dir, renderer);

    let configs = discover_configs(&config);
    let spec_index_dir = if config.is_dir() {
        config.clone()
    } else {
        config.parent().map(PathBuf::from).unwrap_or_default()
    };
    let summary = generator.run(&configs, &output_dir, &formats, &spec_index_dir);

    println!(
        "Wrote {} chart(s) to {}",
        summary.charts.len(),
        output_dir.display()
    );
    for (path, error) in &summary.failed {
        eprintln!("FAILED {}: {error}", path.display());
    }
    if summary.failure_count() > 0 {
        anyhow::bail!("{} chart config(s) failed", summary.failure_count());
    }
    Ok(())
}
