//! Client-side search index.

use std::path::Path;

use motif_ontology::Result;
use serde::Serialize;

use crate::writer;

/// An entry in the JSON search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    /// Display title.
    pub title: String,
    /// Searchable text.
    pub text: String,
    /// Page or type the entry belongs to.
    pub category: String,
    /// URL relative to the site root.
    pub url: String,
}

/// Append-only list of entries, serialized once per run.
#[derive(Debug, Default)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
}

impl SearchIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(
        &mut self,
        title: impl Into<String>,
        text: impl Into<String>,
        category: impl Into<String>,
        url: impl Into<String>,
    ) {
        self.entries.push(SearchEntry {
            title: title.into(),
            text: text.into(),
            category: category.into(),
            url: url.into(),
        });
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the index as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        writer::write_json(path, &self.entries)
    }
}
