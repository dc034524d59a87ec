//! Writes generated output files.

use std::fs;
use std::path::Path;

use motif_ontology::{Error, Result};

/// Writes content to a file, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`Error::Io`] if directories cannot be created or the file cannot be written.
pub fn write(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    fs::write(path, content).map_err(|e| Error::io(path, e))
}

/// Serializes `value` as pretty JSON and writes it.
///
/// # Errors
///
/// Returns [`Error::Render`] if serialization fails and [`Error::Io`] if the
/// write fails.
pub fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Render(format!("cannot serialize {}: {e}", path.display())))?;
    write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        write(&path, "hello").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello");
    }
}
