//! Failure kinds shared by every motif tool.

use std::path::PathBuf;

/// Result alias used across the motif crates.
pub type Result<T> = std::result::Result<T, Error>;

/// A classified failure.
///
/// Bulk operations (graph loading, page generation) log these and continue;
/// single-item operations return them to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A query file, template, config or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A Turtle or YAML document could not be parsed.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File or logical source that failed.
        path: String,
        /// Parser diagnostic.
        message: String,
    },

    /// SPARQL text was rejected or evaluation failed.
    #[error("SPARQL query failed: {0}")]
    Query(String),

    /// A template failed to render.
    #[error("render failed: {0}")]
    Render(String),

    /// A configuration document is missing required fields or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The triple store rejected an operation.
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a parse error for `path`.
    pub fn parse(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Returns true for the `NotFound` kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
