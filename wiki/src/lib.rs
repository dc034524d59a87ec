//! Static wiki generation for the motif ontology.
//!
//! A `wiki.yaml` file names pages built from predicate aggregates and SPARQL
//! results, optional per-item detail pages, and type indexes over classes.
//! [`WikiGenerator`] renders them through the shared
//! [`Renderer`](motif_site::Renderer) and writes a `search_index.json`.
//!
//! # Entry Point
//!
//! ```no_run
//! use std::path::Path;
//! use motif_ontology::RdfManager;
//! use motif_site::{Renderer, RendererOptions};
//! use motif_wiki::{WikiConfig, WikiGenerator};
//!
//! let rdf = RdfManager::new("ttl").expect("load failed");
//! let config = WikiConfig::load(Path::new("config/wiki.yaml")).expect("bad config");
//! let renderer = Renderer::new(RendererOptions::with_dir("templates"));
//! let mut wiki = WikiGenerator::new(&rdf, config, ".", "wiki", renderer).expect("init failed");
//! wiki.generate_all().expect("generation failed");
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod generator;

pub use config::{ContextShape, DetailSpec, PageSpec, SectionSpec, TypeSpec, WikiConfig};
pub use generator::{resource_uri, Aggregate, Item, PageData, WikiGenerator, WikiSummary, SEARCH_INDEX_FILE, URI_KEYS};
