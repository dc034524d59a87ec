//! `motif-model-ttl`: Exports an ONNX model graph to Turtle.
//!
//! The model is read in its JSON form. Without an output path the file lands
//! at `<root>/ttl/models/<model-stem>.ttl`.
//!
//! **Usage:**
//! ```
//! motif-model-ttl <model.json> [out.ttl] [--root <path>]
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
use motif_onnx::export_model;

/// Export an ONNX model graph as Turtle.
#[derive(Parser)]
#[command(name = "motif-model-ttl", about = "Export an ONNX model graph as Turtle")]
struct Args {
    /// Model file (ONNX JSON form).
    model: PathBuf,

    /// Output Turtle file.
    out: Option<PathBuf>,

    /// Project root for the default output location.
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
    let path = export_model(&args.model, args.out.as_deref(), &root)?;

    println!("Wrote TTL to {}", path.display());
    Ok(())
}
