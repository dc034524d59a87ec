//! `.fuse` snippet generation for the motif ontology.
//!
//! Each motif returned by `list_all_motifs.sparql` becomes one snippet,
//! rendered from a template when one is supplied and from the built-in
//! layout otherwise, annotated with the matching ONNX operator spec.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod generator;
pub mod snippet;

pub use generator::{categories_summary, group_by_category, FuseGenerator, MOTIFS_QUERY, SUMMARY_FILE};
pub use snippet::{create_snippet_content, SnippetContext};
