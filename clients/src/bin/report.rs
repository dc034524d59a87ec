//! `motif-report`: Assembles generated chart specs into one HTML report.
//!
//! Sections and the output file name come from the `reporting:` block of
//! the project config; figures are read from the figures directory.
//!
//! **Usage:**
//! ```
//! motif-report [--figures-dir <path>] [--output-dir <path>] [--title <text>]
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
use motif_charts::ReportGenerator;

/// Build the motif analysis report.
#[derive(Parser)]
#[command(name = "motif-report", about = "Assemble chart specs into an HTML report")]
struct Args {
    /// Directory holding generated `*.json` specs.
    #[arg(long)]
    figures_dir: Option<PathBuf>,

    /// Directory the report is written to.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Report title, overriding the configured one.
    #[arg(long)]
    title: Option<String>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    motif_clients::init_tracing(args.verbose);
    let project = motif_clients::project()?;

    let mut reporting = project.reporting.clone();
    if let Some(title) = args.title {
        reporting.title = title;
    }
    let generator = ReportGenerator::new(
        args.figures_dir.unwrap_or_else(|| project.figures_dir()),
        args.output_dir.unwrap_or_else(|| project.reports_dir()),
    );
    let path = generator.write_report(&reporting)?;

    println!("Report written to {}", path.display());
    Ok(())
}
