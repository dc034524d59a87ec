//! Project configuration.
//!
//! The project root is the nearest ancestor directory holding `ttl/` or
//! `.github/`. Its configuration is read from the first existing file of
//! `config/motif-models.yaml`, `config/motifs-matter.yaml`,
//! `config/motifs-matter.yml`. The result is built once and passed by
//! reference to every generator.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::{Error, Result};
use serde::Deserialize;

/// Config file names tried under `<root>/config/`, in order.
pub const CONFIG_CANDIDATES: &[&str] = &["motif-models.yaml", "motifs-matter.yaml", "motifs-matter.yml"];

/// `charting:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartingConfig {
    /// Formats written per chart (`json`, `html`, `data`, `png`).
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
}

impl Default for ChartingConfig {
    fn default() -> Self {
        Self {
            output_formats: default_output_formats(),
        }
    }
}

fn default_output_formats() -> Vec<String> {
    vec!["json".to_string(), "html".to_string()]
}

/// One section of the analysis report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSection {
    /// Section heading.
    pub title: String,
    /// Paragraph under the heading.
    #[serde(default)]
    pub description: String,
    /// Figure names (JSON spec file stems) to embed.
    #[serde(default)]
    pub figures: Vec<String>,
}

/// `reporting:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Report title.
    #[serde(default = "default_report_title")]
    pub title: String,
    /// Sections in display order.
    #[serde(default)]
    pub sections: Vec<ReportSection>,
    /// Output file name inside the reports directory.
    #[serde(default = "default_report_filename")]
    pub report_filename: String,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            title: default_report_title(),
            sections: Vec::new(),
            report_filename: default_report_filename(),
        }
    }
}

fn default_report_title() -> String {
    "Motif Ontology Analysis".to_string()
}

fn default_report_filename() -> String {
    "motif_analysis_report.html".to_string()
}

#[derive(Debug, Default, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    paths: BTreeMap<String, PathBuf>,
    #[serde(default)]
    charting: ChartingConfig,
    #[serde(default)]
    reporting: ReportingConfig,
}

/// Resolved project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Project root directory.
    pub root: PathBuf,
    /// Config file the values came from, if any.
    pub source: Option<PathBuf>,
    /// Chart generation settings.
    pub charting: ChartingConfig,
    /// Report generation settings.
    pub reporting: ReportingConfig,
    paths: BTreeMap<String, PathBuf>,
}

impl ProjectConfig {
    /// Walks up from `start` to the first directory containing `ttl/` or
    /// `.github/`; falls back to `start` itself.
    pub fn find_root(start: &Path) -> PathBuf {
        start
            .ancestors()
            .find(|dir| dir.join("ttl").exists() || dir.join(".github").exists())
            .unwrap_or(start)
            .to_path_buf()
    }

    /// Finds the root from `start` and loads its config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no candidate config file exists, and
    /// [`Error::Parse`] if the file is not valid YAML.
    pub fn discover(start: &Path) -> Result<Self> {
        Self::load(&Self::find_root(start))
    }

    /// Like [`ProjectConfig::discover`], but a missing config file yields defaults
    /// rooted at the discovered root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if a config file exists but is not valid YAML.
    pub fn discover_or_default(start: &Path) -> Result<Self> {
        let root = Self::find_root(start);
        match Self::load(&root) {
            Err(e) if e.is_not_found() => {
                tracing::warn!("{e}; using default paths under {}", root.display());
                Ok(Self::defaults(root))
            }
            other => other,
        }
    }

    /// Loads the first candidate config file under `<root>/config/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if none exists, [`Error::Io`] if it cannot
    /// be read, and [`Error::Parse`] if it is not valid YAML.
    pub fn load(root: &Path) -> Result<Self> {
        let path = CONFIG_CANDIDATES
            .iter()
            .map(|name| root.join("config").join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "configuration file not found in {}: tried {}",
                    root.join("config").display(),
                    CONFIG_CANDIDATES.join(", ")
                ))
            })?;
        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let mut config = Self::from_yaml(root, &text).map_err(|e| match e {
            Error::Parse { message, .. } => Error::parse(path.display().to_string(), message),
            other => other,
        })?;
        config.source = Some(path);
        Ok(config)
    }

    /// Parses config YAML for a given root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the text is not valid YAML for this schema.
    pub fn from_yaml(root: &Path, text: &str) -> Result<Self> {
        let file: ProjectFile = if text.trim().is_empty() {
            ProjectFile::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| Error::parse("project config", e))?
        };
        Ok(Self {
            root: root.to_path_buf(),
            source: None,
            charting: file.charting,
            reporting: file.reporting,
            paths: file.paths,
        })
    }

    /// Defaults rooted at `root`.
    pub fn defaults(root: PathBuf) -> Self {
        Self {
            root,
            source: None,
            charting: ChartingConfig::default(),
            reporting: ReportingConfig::default(),
            paths: BTreeMap::new(),
        }
    }

    /// Path configured under `paths.<key>`, joined onto the root, or `default`.
    pub fn path(&self, key: &str, default: &str) -> PathBuf {
        match self.paths.get(key) {
            Some(p) => self.root.join(p),
            None => self.root.join(default),
        }
    }

    /// Turtle knowledge base directory.
    pub fn ttl_dir(&self) -> PathBuf {
        self.path("ttl", "ttl")
    }

    /// SPARQL query directory.
    pub fn sparql_dir(&self) -> PathBuf {
        self.path("sparql", "sparql")
    }

    /// Chart YAML directory.
    pub fn charts_config_dir(&self) -> PathBuf {
        self.path("charts_config", "charts")
    }

    /// Generated figures directory.
    pub fn figures_dir(&self) -> PathBuf {
        self.path("figures", "papers/figures")
    }

    /// Reports directory.
    pub fn reports_dir(&self) -> PathBuf {
        self.path("reports", "papers")
    }

    /// Template override directory.
    pub fn templates_dir(&self) -> PathBuf {
        self.path("templates", "templates")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures")
    }

    #[test]
    fn discovers_fixture_project() {
        let config = ProjectConfig::discover(&fixtures().join("sparql/docs")).unwrap();
        assert_eq!(config.root, fixtures().join("sparql/docs").ancestors().nth(2).unwrap());
        assert_eq!(config.ttl_dir(), config.root.join("ttl"));
        assert_eq!(config.figures_dir(), config.root.join("papers/figures"));
        assert_eq!(config.charting.output_formats, ["json", "html"]);
        assert_eq!(config.reporting.sections.len(), 2);
        assert!(config.source.unwrap().ends_with("config/motif-models.yaml"));
    }

    #[test]
    fn missing_config_is_not_found_unless_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("ttl")).unwrap();
        assert!(ProjectConfig::discover(dir.path()).unwrap_err().is_not_found());
        let config = ProjectConfig::discover_or_default(dir.path()).unwrap();
        assert_eq!(config.sparql_dir(), dir.path().join("sparql"));
        assert_eq!(config.reporting.report_filename, "motif_analysis_report.html");
    }

    #[test]
    fn later_candidates_are_tried() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(
            dir.path().join("config/motifs-matter.yml"),
            "paths:\n  ttl: ontology\n",
        )
        .unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.ttl_dir(), dir.path().join("ontology"));
    }
}
