//! Conformance validators, one module per check.

pub mod literal;
pub mod parse;
pub mod shapes;
