//! `motif-shacl`: Validates the Turtle knowledge base against the motif shapes.
//!
//! **Exit codes:**
//! - `2`: a Turtle file failed the strict parse
//! - `1`: the graph does not conform, or a literal constraint was found
//! - `0`: everything passed
//!
//! **Usage:**
//! ```
//! motif-shacl [--skip-opset] [--root <path>] [--shapes <file>]
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use motif_conformance::{run_shacl, ShaclPaths};

/// Run SHACL validation over the Turtle files.
#[derive(Parser)]
#[command(name = "motif-shacl", about = "Run SHACL validation over TTL files")]
struct Args {
    /// Skip files under ttl/opset/.
    #[arg(long)]
    skip_opset: bool,

    /// Project root holding `ttl/` (default: discovered from the current directory).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Shapes file (default: `ttl/shacl/motif_shapes.ttl`).
    #[arg(long)]
    shapes: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    motif_clients::init_tracing(args.verbose);

    let root = match args.root {
        Some(root) => root,
        None => motif_clients::project()?.root,
    };
    let mut paths = ShaclPaths::for_root(&root, args.skip_opset);
    if let Some(shapes) = args.shapes {
        paths.shapes = shapes;
    }

    let run = run_shacl(&paths)?;

    println!("Motif SHACL Report");
    println!("==================");
    println!();
    for result in &run.report.results {
        println!("[{}] {}: {}", result.severity, result.validator, result.message);
        for detail in &result.details {
            println!("       {detail}");
        }
    }
    println!();
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        run.report.pass_count(),
        run.report.warning_count(),
        run.report.failure_count()
    );

    if run.parse_failed {
        eprintln!("SHACL validation aborted due to parse errors");
    } else if run.report.all_passed() {
        println!("SHACL validation passed");
    } else {
        eprintln!("SHACL validation failed");
    }
    process::exit(run.exit_code());
}
