//! `wiki.yaml` configuration.
//!
//! Pages may be given as a mapping from name to page, or as a list of pages
//! carrying `name` or `id`. Each page section declares the shape of data it
//! feeds into the template context; the shape is checked when the file is
//! loaded.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use motif_ontology::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sections of a page, in hydration order.
pub const SECTIONS: [&str; 3] = ["left", "body", "right"];

/// How a section's rows enter the template context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextShape {
    /// `{label, count, slug, uri}` records under `categories`.
    Categories,
    /// Plain strings under `fingerprints`.
    Fingerprints,
    /// Normalized `{title, description, url, meta, category, notes}` records under `items`.
    Items,
    /// Rows as returned under `runtimes`.
    Runtimes,
    /// Rows as returned under `rows`.
    Raw,
}

impl ContextShape {
    /// Context key the shape fills.
    pub fn key(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Fingerprints => "fingerprints",
            Self::Items => "items",
            Self::Runtimes => "runtimes",
            Self::Raw => "rows",
        }
    }
}

/// One of a page's `left`, `body` or `right` sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Predicate whose objects are aggregated with counts.
    #[serde(default)]
    pub predicate: Option<String>,
    /// SPARQL file reference or inline SPARQL.
    #[serde(default)]
    pub query: Option<String>,
    /// Template used when the page names none.
    #[serde(default)]
    pub template: Option<String>,
    /// Declared data shape; `categories` for predicates and `items` for
    /// queries when absent.
    #[serde(default)]
    pub context: Option<ContextShape>,
}

impl SectionSpec {
    /// Shape used for predicate aggregates.
    pub fn predicate_shape(&self) -> ContextShape {
        self.context.unwrap_or(ContextShape::Categories)
    }

    /// Shape used for query rows.
    pub fn query_shape(&self) -> ContextShape {
        self.context.unwrap_or(ContextShape::Items)
    }
}

/// Per-item detail pages for a page's items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSpec {
    /// Detail query; the item IRI is bound to `var`.
    pub query: String,
    /// Detail template.
    #[serde(default = "default_detail_template")]
    pub template: String,
    /// Variable bound with `VALUES`.
    #[serde(default = "default_detail_var")]
    pub var: String,
}

fn default_detail_template() -> String {
    "wiki/detail/motif.html".to_string()
}

fn default_detail_var() -> String {
    "targetMotif".to_string()
}

/// One page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSpec {
    /// Page name, required in list form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Alternative to `name` in list form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Markdown description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Page template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Left column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<SectionSpec>,
    /// Main column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<SectionSpec>,
    /// Right column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<SectionSpec>,
    /// Detail pages for the page's items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<DetailSpec>,
    /// Any other keys, passed through to templates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageSpec {
    /// Section by name (`left`, `body` or `right`).
    pub fn section(&self, name: &str) -> Option<&SectionSpec> {
        match name {
            "left" => self.left.as_ref(),
            "body" => self.body.as_ref(),
            "right" => self.right.as_ref(),
            _ => None,
        }
    }

    /// The page template, else the first of the body, left and right
    /// section templates.
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref().or_else(|| {
            ["body", "left", "right"]
                .iter()
                .filter_map(|s| self.section(s))
                .find_map(|s| s.template.as_deref())
        })
    }
}

/// A type index: one page listing resources, one page per resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpec {
    /// Type id; also the default output directory.
    pub id: String,
    /// Class restricting members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Index title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Query listing members instead of the class scan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_query: Option<String>,
    /// Query run per member with the member IRI bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_query: Option<String>,
    /// Variable the detail query binds.
    #[serde(default = "default_detail_var")]
    pub detail_var: String,
    /// Index template.
    #[serde(default = "default_type_index_template")]
    pub index_template: String,
    /// Member template.
    #[serde(default = "default_type_detail_template")]
    pub detail_template: String,
    /// Output directory below the wiki root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Row field slugged for member directories when `list_query` is used.
    #[serde(default = "default_slug_field")]
    pub slug_field: String,
    /// Free navigation data for templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<Value>,
}

fn default_type_index_template() -> String {
    "wiki/type_index.html".to_string()
}

fn default_type_detail_template() -> String {
    "wiki/type_detail.html".to_string()
}

fn default_slug_field() -> String {
    "label".to_string()
}

impl TypeSpec {
    /// Output directory name.
    pub fn dir_name(&self) -> &str {
        self.output_dir.as_deref().unwrap_or(&self.id)
    }

    /// Index title, defaulting to the id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPages {
    List(Vec<PageSpec>),
    Map(serde_yaml::Mapping),
}

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    site: Map<String, Value>,
    #[serde(default)]
    paths: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pages: Option<RawPages>,
    #[serde(default)]
    types: Vec<TypeSpec>,
}

/// A validated wiki configuration.
#[derive(Debug, Clone, Default)]
pub struct WikiConfig {
    /// Free site data for templates.
    pub site: Map<String, Value>,
    /// Configured directories (`sparql`).
    pub paths: BTreeMap<String, PathBuf>,
    /// Pages in file order.
    pub pages: Vec<(String, PageSpec)>,
    /// Type indexes.
    pub types: Vec<TypeSpec>,
}

impl WikiConfig {
    /// Reads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file is missing, [`Error::Io`] if
    /// unreadable and [`Error::Config`] if invalid.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("config file not found: {}", path.display())));
        }
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&path.display().to_string(), &text)
    }

    /// Parses and validates config YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed YAML, unknown context shapes,
    /// unnamed list pages and sections with neither `predicate` nor `query`.
    pub fn from_yaml(source: &str, text: &str) -> Result<Self> {
        let raw: RawConfig = if text.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| Error::Config(format!("{source}: {e}")))?
        };

        let pages = match raw.pages {
            None => Vec::new(),
            Some(RawPages::List(list)) => list
                .into_iter()
                .map(|page| {
                    let name = page.name.clone().or_else(|| page.id.clone()).ok_or_else(|| {
                        Error::Config(format!("{source}: a page in the list has neither name nor id"))
                    })?;
                    Ok((name, page))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(RawPages::Map(mapping)) => mapping
                .into_iter()
                .map(|(key, value)| {
                    let name = key
                        .as_str()
                        .ok_or_else(|| Error::Config(format!("{source}: page names must be strings")))?
                        .to_string();
                    let page: PageSpec = serde_yaml::from_value(value)
                        .map_err(|e| Error::Config(format!("{source}: page {name}: {e}")))?;
                    Ok((name, page))
                })
                .collect::<Result<Vec<_>>>()?,
        };

        let config = Self {
            site: raw.site,
            paths: raw.paths,
            pages,
            types: raw.types,
        };
        config.validate(source)?;
        Ok(config)
    }

    fn validate(&self, source: &str) -> Result<()> {
        for (name, page) in &self.pages {
            for section in SECTIONS {
                if let Some(spec) = page.section(section) {
                    if spec.predicate.is_none() && spec.query.is_none() {
                        return Err(Error::Config(format!(
                            "{source}: page {name} section {section} needs a predicate or a query"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Looks a page up by name.
    pub fn page(&self, name: &str) -> Option<&PageSpec> {
        self.pages.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    /// Configured query directory name, relative to the project root.
    pub fn sparql_path(&self) -> PathBuf {
        self.paths
            .get("sparql")
            .cloned()
            .unwrap_or_else(|| PathBuf::from("sparql"))
    }
}
