//! `motif-opset-ttl`: Writes the ONNX operator registry as Turtle.
//!
//! **Outputs** (under `--root`):
//! - `ttl/opset/onnx.ttl`: all operators in one file
//! - `ttl/onnx/operators/<domain>/<Op>.ttl`: one file per operator
//! - `ttl/onnx/opset.ttl`: canonical copy of the combined file
//!
//! **Usage:**
//! ```
//! motif-opset-ttl <schemas.json> [--root <path>]
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use motif_onnx::{write_opset, Registry};

/// Convert an operator schema dump to Turtle.
#[derive(Parser)]
#[command(name = "motif-opset-ttl", about = "Convert the ONNX operator registry to Turtle")]
struct Args {
    /// Schema dump (JSON).
    registry: PathBuf,

    /// Project root the files are written under.
    #[arg(long)]
    root: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    motif_clients::init_tracing(false);

    let root = match args.root {
        Some(root) => root,
        None => motif_clients::project()?.root,
    };
    let registry = Registry::load(&args.registry)?;
    let report = write_opset(&registry, &root)?;

    println!("Wrote operands TTL to {}", report.combined.display());
    println!("  {} per-operator files", report.operators.len());
    if let Some(canonical) = &report.canonical {
        println!("Also wrote canonical opset to {}", canonical.display());
    }
    Ok(())
}
