//! Turtle discovery and tolerant loading.
//!
//! Generated opset files sometimes carry multi-line `onnx:attributes` or
//! `onnx:default` literals that strict parsers reject. Each file is first
//! parsed in sanitized form (when sanitizing changes it), then as written;
//! a file that fails both is logged and skipped.

use std::fs;
use std::path::{Path, PathBuf};

use oxigraph::io::RdfFormat;
use oxigraph::store::Store;
use regex::{Captures, Regex};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Outcome of loading a directory of Turtle files.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Files that contributed triples to the graph.
    pub loaded: Vec<PathBuf>,
    /// Subset of `loaded` that only parsed after sanitizing.
    pub sanitized: Vec<PathBuf>,
    /// Files skipped, with the parser diagnostic.
    pub failed: Vec<(PathBuf, String)>,
}

/// Collapses multi-line attribute summaries into single-line literals.
#[derive(Debug)]
pub struct Sanitizer {
    attributes: Regex,
    default: Regex,
    whitespace: Regex,
}

impl Sanitizer {
    /// Compiles the sanitizer patterns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a pattern fails to compile.
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Config(format!("bad pattern {pattern}: {e}")))
        };
        Ok(Self {
            attributes: compile(r#"(?i)onnx:attributes\s*"((?:[^"\\]|\\[\s\S])*)"\s*;"#)?,
            default: compile(r#"(?i)onnx:default\s*"((?:[^"\\]|\\[\s\S])*)"\s*;"#)?,
            whitespace: compile(r"\s+")?,
        })
    }

    /// Returns the sanitized text, or `None` when nothing needed collapsing.
    ///
    /// Only literals that actually span lines are rewritten; single-line and
    /// typed literals are left alone.
    pub fn sanitize(&self, text: &str) -> Option<String> {
        let collapse = |predicate: &'static str| {
            move |caps: &Captures| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let inner = caps.get(1).map_or("", |m| m.as_str());
                if !inner.contains(['\n', '\r']) {
                    return whole.to_string();
                }
                let safe = self.whitespace.replace_all(inner.trim(), " ");
                format!("{predicate} \"{safe}\" ;")
            }
        };
        let step = self.attributes.replace_all(text, collapse("onnx:attributes"));
        let out = self.default.replace_all(&step, collapse("onnx:default"));
        (out != text).then(|| out.into_owned())
    }
}

/// Recursively lists `*.ttl` files under `root`, sorted by path.
pub fn discover_ttl_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "ttl"))
        .collect();
    files.sort();
    files
}

/// Parses one Turtle document into `store`. The load is atomic: a parse
/// error leaves the store unchanged.
///
/// # Errors
///
/// Returns [`Error::Parse`] with the parser diagnostic.
pub fn load_turtle(store: &Store, source: &str, text: &str) -> Result<()> {
    store
        .load_from_reader(RdfFormat::Turtle, text.as_bytes())
        .map_err(|e| Error::parse(source, e))
}

/// Loads every Turtle file under `root` into `store`, tolerating bad files.
///
/// # Errors
///
/// Returns an error only if the sanitizer patterns fail to compile.
pub fn load_directory(store: &Store, root: &Path) -> Result<LoadReport> {
    let sanitizer = Sanitizer::new()?;
    let mut report = LoadReport::default();

    let files = discover_ttl_files(root);
    if files.is_empty() {
        tracing::warn!("No TTL files found in {}", root.display());
        return Ok(report);
    }

    for path in files {
        let name = path.display().to_string();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to load {name}: {e}");
                report.failed.push((path, e.to_string()));
                continue;
            }
        };

        if let Some(cleaned) = sanitizer.sanitize(&text) {
            match load_turtle(store, &name, &cleaned) {
                Ok(()) => {
                    tracing::debug!("Loaded (sanitized) {name}");
                    report.sanitized.push(path.clone());
                    report.loaded.push(path);
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Sanitized parse failed for {name}: {e}; retrying original text")
                }
            }
        }

        match load_turtle(store, &name, &text) {
            Ok(()) => {
                tracing::debug!("Loaded {name}");
                report.loaded.push(path);
            }
            Err(e) => {
                tracing::error!("Failed to load {name}: {e}");
                report.failed.push((path, e.to_string()));
            }
        }
    }

    Ok(report)
}

/// Parses each file as written, with no sanitizing, recording every failure.
pub fn load_files_strict(store: &Store, files: Vec<PathBuf>) -> LoadReport {
    let mut report = LoadReport::default();
    for path in files {
        let name = path.display().to_string();
        let outcome = fs::read_to_string(&path)
            .map_err(|e| Error::io(&path, e))
            .and_then(|text| load_turtle(store, &name, &text));
        match outcome {
            Ok(()) => report.loaded.push(path),
            Err(e) => {
                tracing::debug!("Strict parse failed for {name}: {e}");
                report.failed.push((path, e.to_string()));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizer_collapses_multiline_attributes() {
        let sanitizer = Sanitizer::new().unwrap();
        let text = "onnx:Foo onnx:attributes \"alpha: f: 1.0\n  beta: i: 2\" ;\n  rdfs:label \"Foo\" .";
        let out = sanitizer.sanitize(text).unwrap();
        assert!(out.contains("onnx:attributes \"alpha: f: 1.0 beta: i: 2\" ;"));
    }

    #[test]
    fn sanitizer_leaves_typed_and_single_line_literals() {
        let sanitizer = Sanitizer::new().unwrap();
        let text = "onnx:hasAttribute [ onnx:default \"1.67\"^^xsd:double ; ] ;\n\
                    onnx:hasAttribute [ onnx:name \"gamma\" ; onnx:default \"f:  2\" ; ] .";
        assert!(sanitizer.sanitize(text).is_none());
    }

    #[test]
    fn bad_file_is_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("good.ttl"),
            "@prefix ex: <https://example.org/> .\nex:a ex:b ex:c .\n",
        )
        .unwrap();
        fs::write(dir.path().join("bad.ttl"), "ex:a ex:b .\n").unwrap();

        let store = Store::new().unwrap();
        let report = load_directory(&store, dir.path()).unwrap();
        assert_eq!(report.loaded.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn strict_load_does_not_sanitize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.ttl");
        fs::write(
            &path,
            "@prefix onnx: <https://ns.onnx.cloud/onnx#> .\nonnx:A onnx:attributes \"a\n b\" ;\n  onnx:x 1 .\n",
        )
        .unwrap();

        let store = Store::new().unwrap();
        let report = load_files_strict(&store, vec![path.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, path);

        let store = Store::new().unwrap();
        let report = load_directory(&store, dir.path()).unwrap();
        assert_eq!(report.sanitized, [path]);
    }

    #[test]
    fn empty_directory_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new().unwrap();
        let report = load_directory(&store, dir.path()).unwrap();
        assert!(report.loaded.is_empty());
        assert_eq!(store.len().unwrap(), 0);
    }
}
