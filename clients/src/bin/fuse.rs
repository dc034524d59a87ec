//! `motif-fuse`: Writes one `.fuse` snippet per motif plus a categories summary.
//!
//! **Usage:**
//! ```
//! motif-fuse [--ttl-dir <path>] [--sparql-dir <path>] [--output-dir <path>]
//!            [--template <file>] [--summary] [-v]
//! ```
//!
//! Exits 1 when no snippet was generated.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use motif_fuse::FuseGenerator;
use motif_ontology::RdfManager;

/// Generate .fuse snippets from the motif ontology.
#[derive(Parser)]
#[command(name = "motif-fuse", about = "Generate .fuse snippets from the motif ontology")]
struct Args {
    /// Directory of Turtle files.
    #[arg(long)]
    ttl_dir: Option<PathBuf>,

    /// Directory searched for `list_all_motifs.sparql`.
    #[arg(long)]
    sparql_dir: Option<PathBuf>,

    /// Output directory for snippets.
    #[arg(long, default_value = "tmp/fuse")]
    output_dir: PathBuf,

    /// Snippet template; defaults to `templates/fuse-motifs.jinja` when present.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Write the categories summary again after the run and report its path.
    #[arg(long)]
    summary: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    motif_clients::init_tracing(args.verbose);
    let project = motif_clients::project()?;

    let ttl_dir = args.ttl_dir.unwrap_or_else(|| project.ttl_dir());
    let sparql_dir = args.sparql_dir.unwrap_or_else(|| project.sparql_dir());
    let template = args.template.or_else(|| {
        let default = project.templates_dir().join("fuse-motifs.jinja");
        default.is_file().then_some(default)
    });

    let rdf = RdfManager::new(&ttl_dir)
        .with_context(|| format!("Failed to load {}", ttl_dir.display()))?;
    let generator = FuseGenerator::new(&rdf, sparql_dir, &args.output_dir, template.as_deref())?;
    let count = generator.generate_all_motifs()?;

    if args.summary {
        let path = generator.generate_categories_summary()?;
        println!("Categories summary: {}", path.display());
    }

    if count == 0 {
        eprintln!("No snippets generated");
        process::exit(1);
    }
    println!("Generated {count} .fuse snippets in {}", args.output_dir.display());
    Ok(())
}
