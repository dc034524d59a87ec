//! Shared site plumbing for the motif generators.
//!
//! Provides the explicit [`ProjectConfig`], the template [`Renderer`] with
//! its built-in templates, output writing, slugs and the search index.
//!
//! # Entry Point
//!
//! ```no_run
//! use std::path::Path;
//! use motif_site::{ProjectConfig, Renderer, RendererOptions};
//!
//! let config = ProjectConfig::discover_or_default(Path::new(".")).expect("bad config");
//! let renderer = Renderer::new(RendererOptions::with_dir(config.templates_dir()));
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod html;
pub mod query;
pub mod renderer;
pub mod search;
pub mod slug;
pub mod writer;

pub use config::{ChartingConfig, ProjectConfig, ReportSection, ReportingConfig};
pub use html::{escape_html, markdown_to_html};
pub use query::is_inline_sparql;
pub use renderer::{Renderer, RendererOptions};
pub use search::{SearchEntry, SearchIndex};
pub use slug::slugify;

/// Current UTC time as an RFC 3339 string, for `generated_at` stamps.
pub fn generated_at() -> String {
    jiff::Timestamp::now().to_string()
}

/// Today's date (UTC) as `YYYY-MM-DD`.
pub fn today() -> String {
    jiff::Timestamp::now()
        .to_zoned(jiff::tz::TimeZone::UTC)
        .date()
        .to_string()
}
