//! Motif ontology knowledge base.
//!
//! Loads every Turtle file under a directory into one in-memory graph,
//! answers SPARQL over it, and resolves structured ONNX operator specs.
//! Every generator in the workspace starts from an [`RdfManager`].
//!
//! # Entry Point
//!
//! ```no_run
//! use motif_ontology::RdfManager;
//!
//! let rdf = RdfManager::new("ttl").expect("load failed");
//! let rows = rdf
//!     .select("SELECT ?m WHERE { ?m a <https://ns.onnx.cloud/motif#Motif> }")
//!     .expect("query failed");
//! let add = rdf.get_operator_spec("Add").expect("lookup failed");
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod error;
pub mod loader;
pub mod operator;
pub mod store;
pub mod term;
pub mod vocab;

pub use error::{Error, Result};
pub use loader::LoadReport;
pub use operator::{AttributeDescriptor, AttributeValue, IoDescriptor, OperatorSpec, SinceVersion};
pub use store::{sparql_string, GraphStats, LabelledResource, RdfManager, ResourceInfo};
pub use term::{QueryResult, Row, TermValue};
