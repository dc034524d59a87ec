//! Turtle export for ONNX graphs and operator-schema registries.
//!
//! [`model_to_ttl`] walks a model graph and [`opset_to_ttl`] walks a schema
//! registry; both emit Turtle by string formatting with the `onnx:`,
//! `motif:` and `xsd:` prefixes the ontology uses.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod model;
pub mod opset;
pub mod turtle;

pub use model::{export_model, model_to_ttl, Model};
pub use opset::{opset_to_ttl, write_opset, OperatorSchema, OpsetReport, OpsetTtl, Registry};

/// Today's date (UTC) as `YYYY-MM-DD`.
pub(crate) fn today() -> String {
    jiff::Timestamp::now()
        .to_zoned(jiff::tz::TimeZone::UTC)
        .date()
        .to_string()
}
