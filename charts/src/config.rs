//! Chart configuration files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::{Error, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use walkdir::WalkDir;

/// Where a chart's SPARQL comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuerySource {
    /// Inline SPARQL, a path starting with `.` or `/`, or a file name inside
    /// the query directory.
    Text(String),
    /// `{file: name}`: a file inside the query directory.
    File {
        /// File name relative to the query directory.
        file: String,
    },
}

/// Declarative row transforms, applied as rename, keep, compute.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transform {
    /// Old field name to new field name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    /// Fields to keep; absent means keep all.
    #[serde(default)]
    pub keep: Option<Vec<String>>,
    /// New field name and a format string with `${field}` placeholders, in
    /// file order, so later fields can use earlier ones.
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub compute: Vec<(String, String)>,
}

fn ordered_pairs<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_yaml::Mapping::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| match (key, value) {
            (serde_yaml::Value::String(k), serde_yaml::Value::String(v)) => Ok((k, v)),
            (k, _) => Err(D::Error::custom(format!(
                "compute entry {k:?} must map a field name to a format string"
            ))),
        })
        .collect()
}

/// One chart definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    /// Chart title; also names the output files.
    pub title: String,
    /// Chart description.
    #[serde(default)]
    pub description: String,
    /// SPARQL source.
    pub query: QuerySource,
    /// Optional row transforms.
    #[serde(default)]
    pub transform: Option<Transform>,
    /// Vega-Lite keys merged over the generated spec.
    pub vega: Map<String, Value>,
}

impl ChartConfig {
    /// Parses chart YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the YAML is malformed or `title`,
    /// `query` or `vega` is missing.
    pub fn from_yaml(source: &str, text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Config(format!("{source}: {e}")))
    }

    /// Reads a chart YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file is missing, [`Error::Io`] if it
    /// cannot be read and [`Error::Config`] if it is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("chart config not found: {}", path.display())));
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_yaml(&path.display().to_string(), &text)?;
        tracing::info!(
            "Loaded config: {}",
            path.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned())
        );
        Ok(config)
    }

    /// Output file base name: the title lower-cased with spaces as `_`.
    pub fn base_name(&self) -> String {
        base_name(&self.title)
    }
}

/// Lower-cases a title and replaces spaces with `_`.
pub fn base_name(title: &str) -> String {
    title.to_lowercase().replace(' ', "_")
}

/// A directory yields its `*.yaml` files (sorted, not recursive); a file
/// yields itself.
pub fn discover_configs(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_are_enforced() {
        let err = ChartConfig::from_yaml("c.yaml", "query: x.sparql\nvega: {}\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = ChartConfig::from_yaml("c.yaml", "title: T\nquery: x.sparql\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn query_forms() {
        let c = ChartConfig::from_yaml("c", "title: A B\nquery: {file: q.sparql}\nvega: {mark: bar}\n").unwrap();
        assert_eq!(c.query, QuerySource::File { file: "q.sparql".into() });
        assert_eq!(c.base_name(), "a_b");
        assert_eq!(c.vega["mark"], "bar");
    }

    #[test]
    fn compute_keeps_file_order() {
        let transform: Transform =
            serde_yaml::from_str("compute:\n  zeta: '${a}'\n  alpha: '${zeta}!'\n").unwrap();
        let names: Vec<&str> = transform.compute.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert!(serde_yaml::from_str::<Transform>("compute: {x: [1]}\n").is_err());
    }

    #[test]
    fn discovers_fixture_configs() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/charts");
        let names: Vec<String> = discover_configs(&dir)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["motif_signatures.yaml", "motifs_by_category.yaml"]);
    }
}
