//! Vega-Lite charts and HTML reports from SPARQL over the motif ontology.
//!
//! A chart is a YAML file naming a SPARQL query, optional row transforms and
//! Vega-Lite keys. [`ChartGenerator`] runs it against an
//! [`RdfManager`](motif_ontology::RdfManager) and writes the spec, a chart
//! page, a data dump and optionally a PNG. [`ReportGenerator`] stitches
//! generated specs into a single report.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod generator;
pub mod report;
pub mod transform;

pub use config::{discover_configs, ChartConfig, QuerySource, Transform};
pub use generator::{ChartGenerator, ChartResult, IndexEntry, ResolvedQuery, RunSummary};
pub use report::ReportGenerator;
